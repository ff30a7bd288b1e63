//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file at all) is a valid
//! configuration. See `config/convkit.example.toml` for a full example.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::embedding::SUPPORTED_MODELS;

/// Path tried when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/convkit.toml";

/// Where a fine-tuned model export is looked for unless configured otherwise.
pub const DEFAULT_FINE_TUNED_PATH: &str = "./models/fine-tuned";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"local"` (fine-tuned model with pretrained fallback) or `"keyword"`
    /// (offline bag-of-words, no model download).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Directory holding a fine-tuned sentence-transformer export. A
    /// missing directory is not an error; the pretrained model is used.
    #[serde(default = "default_fine_tuned_path")]
    pub fine_tuned_path: Option<PathBuf>,
    /// Generic pretrained model used when the fine-tuned one cannot be loaded.
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            fine_tuned_path: default_fine_tuned_path(),
            fallback_model: default_fallback_model(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_fine_tuned_path() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_FINE_TUNED_PATH))
}
fn default_fallback_model() -> String {
    "all-minilm-l6-v2".to_string()
}
fn default_batch_size() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> f32 {
    convkit_core::selector::DEFAULT_THRESHOLD
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "convkit=info,convkit_core=info".to_string()
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Resolve the effective config.
///
/// An explicit path must exist. Without one, [`DEFAULT_CONFIG_PATH`] is used
/// if present and the built-in defaults otherwise.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => load_config(path),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_config(default_path)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn validate(config: &Config) -> Result<()> {
    let t = config.chat.threshold;
    if !(-1.0..=1.0).contains(&t) {
        anyhow::bail!("chat.threshold must be in [-1.0, 1.0], got {}", t);
    }

    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    match config.embedding.provider.as_str() {
        "local" | "keyword" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be local or keyword.",
            other
        ),
    }

    if !SUPPORTED_MODELS
        .iter()
        .any(|(name, _)| *name == config.embedding.fallback_model)
    {
        anyhow::bail!(
            "Unknown embedding.fallback_model '{}'. Supported models: {}",
            config.embedding.fallback_model,
            SUPPORTED_MODELS
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(())
}
