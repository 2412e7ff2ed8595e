mod config;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use layout_prompter::dataset::Manifest;
use layout_prompter::models::{GeneratedLayout, Label};
use layout_prompter::processing::batch::{
    process_layout_split, process_query_split, process_train_split, record_rng,
};
use layout_prompter::processing::{ContentAwareProcessor, LayoutProcessor};
use layout_prompter::selection::{ContentAwareSelector, SelectorConfig};
use layout_prompter::settings::TaskSettings;

use crate::config::Config;

const TRAIN_SPLIT: &str = "train";
const SELECTION_STREAM: u64 = 0x5E1E_C7ED;

#[derive(Serialize)]
struct ExemplarLine {
    pool_index: usize,
    idx: Option<usize>,
    score: f64,
}

#[derive(Serialize)]
struct QueryLine<'a> {
    split: &'a str,
    query: Option<usize>,
    labels: &'a [Label],
    exemplars: Vec<ExemplarLine>,
}

#[derive(Serialize)]
struct RecordLine<'a> {
    split: &'a str,
    idx: Option<usize>,
    layout: GeneratedLayout,
}

fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting layout-prompter v{}", env!("CARGO_PKG_VERSION"));

    let settings = TaskSettings::resolve(&config.settings)
        .with_context(|| format!("Failed to load task settings '{}'", config.settings))?;
    info!(
        "Task settings: {} ({}), canvas {}x{}, {} labels",
        settings.name,
        settings.domain,
        settings.canvas_size.width,
        settings.canvas_size.height,
        settings.labels.len()
    );

    let manifest = Manifest::from_path(&config.manifest_path).with_context(|| {
        format!(
            "Failed to load dataset manifest {}",
            config.manifest_path.display()
        )
    })?;

    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    info!("Task: {}, seed: {seed}", config.task);

    if config.task.is_content_aware() {
        run_content_aware(&config, &settings, &manifest, seed)
    } else {
        run_layout_task(&config, &settings, &manifest, seed)
    }
}

/// Builds the label pool and exemplar pool from the train split, then selects
/// exemplars for every record of the remaining splits.
fn run_content_aware(
    config: &Config,
    settings: &TaskSettings,
    manifest: &Manifest,
    seed: u64,
) -> Result<()> {
    let processor = ContentAwareProcessor::new(
        settings,
        config.filter_threshold,
        config.max_element_numbers,
    )?;

    let train = manifest.load_split(TRAIN_SPLIT, settings.canvas_size);
    let (train_output, pool) = process_train_split(TRAIN_SPLIT, &processor, train.records);

    let selector_config = SelectorConfig {
        num_prompt: config.num_prompt,
        candidate_size: config.candidate_size,
        is_shuffle: config.is_shuffle,
    };
    let selector = ContentAwareSelector::new(
        train_output.records,
        settings.canvas_size,
        selector_config,
        &mut StdRng::seed_from_u64(seed),
    )?;
    info!("Exemplar pool: {} records", selector.examples().len());

    for split in manifest.split_names() {
        if split == TRAIN_SPLIT {
            continue;
        }
        let loaded = manifest.load_split(split, settings.canvas_size);
        let output = process_query_split(split, &processor, loaded.records, &pool, seed)
            .with_context(|| format!("Failed to process split '{split}'"))?;

        for query in &output.records {
            let idx = query.layout().idx().unwrap_or_default();
            // Distinct stream from the one that processed the query.
            let mut rng = record_rng(seed ^ SELECTION_STREAM, idx);
            let selection = match selector.select(query, &mut rng) {
                Ok(selection) => selection,
                Err(e) => {
                    warn!(split, idx, error = %e, "selection failed");
                    continue;
                }
            };
            let line = QueryLine {
                split,
                query: query.layout().idx(),
                labels: query.labels(),
                exemplars: selection
                    .selected
                    .iter()
                    .map(|s| ExemplarLine {
                        pool_index: s.pool_index,
                        idx: s.example.layout().idx(),
                        score: s.score,
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string(&line)?);
        }
    }
    Ok(())
}

/// Content-agnostic tasks: every split is processed and printed as serialized layouts.
fn run_layout_task(
    config: &Config,
    settings: &TaskSettings,
    manifest: &Manifest,
    seed: u64,
) -> Result<()> {
    let processor = LayoutProcessor::new(config.task, settings)?;
    for split in manifest.split_names() {
        let loaded = manifest.load_split(split, settings.canvas_size);
        let output = process_layout_split(split, &processor, loaded.records, seed);
        for record in &output.records {
            let line = RecordLine {
                split,
                idx: record.layout().idx(),
                layout: record.to_serialized(),
            };
            println!("{}", serde_json::to_string(&line)?);
        }
    }
    Ok(())
}
