use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use layout_prompter::transforms::TaskKind;

/// Run configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub manifest_path: PathBuf,
    pub settings: String,
    pub task: TaskKind,
    pub num_prompt: usize,
    pub candidate_size: Option<usize>,
    pub is_shuffle: bool,
    pub filter_threshold: u8,
    pub max_element_numbers: usize,
    pub seed: Option<u64>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            manifest_path: PathBuf::from(require_env("LAYOUT_MANIFEST")?),
            settings: std::env::var("LAYOUT_SETTINGS")
                .unwrap_or_else(|_| "poster-layout".to_string()),
            task: parse_env("LAYOUT_TASK", "content")?,
            num_prompt: parse_env("NUM_PROMPT", "10")?,
            candidate_size: optional_env("CANDIDATE_SIZE")?,
            is_shuffle: parse_env("IS_SHUFFLE", "true")?,
            filter_threshold: parse_env("FILTER_THRESHOLD", "100")?,
            max_element_numbers: parse_env("MAX_ELEMENT_NUMBERS", "10")?,
            seed: optional_env("SEED")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .with_context(|| format!("{key} has an invalid value"))
}

fn optional_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{key} has an invalid value")),
        _ => Ok(None),
    }
}
