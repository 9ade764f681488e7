use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub graphsight: GraphSightConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
}

/// GraphSight-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GraphSightConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Traversal bounds. `max_depth_ceiling` is the hard cap every query's
/// requested depth is clamped to, bounding worst-case fan-out cost.
#[derive(Debug, Clone, Deserialize)]
pub struct TraversalConfig {
    #[serde(default = "default_max_depth_ceiling")]
    pub max_depth_ceiling: usize,
    #[serde(default = "default_max_depth")]
    pub default_max_depth: usize,
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth_ceiling: default_max_depth_ceiling(),
            default_max_depth: default_max_depth(),
            default_top_k: default_top_k(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_depth_ceiling() -> usize {
    20
}

fn default_max_depth() -> usize {
    5
}

fn default_top_k() -> usize {
    5
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in GRAPHSIGHT_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("GRAPHSIGHT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        // The db file itself may not exist yet, but its parent directory must
        if let Some(parent) = self.graphsight.db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                anyhow::bail!(
                    "db_path parent directory does not exist: {}",
                    parent.display()
                );
            }
        }

        if self.traversal.max_depth_ceiling == 0 {
            anyhow::bail!("traversal.max_depth_ceiling must be greater than 0");
        }

        if self.traversal.default_max_depth == 0
            || self.traversal.default_max_depth > self.traversal.max_depth_ceiling
        {
            anyhow::bail!(
                "traversal.default_max_depth must be between 1 and max_depth_ceiling ({})",
                self.traversal.max_depth_ceiling
            );
        }

        if self.traversal.default_top_k == 0 {
            anyhow::bail!("traversal.default_top_k must be greater than 0");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.graphsight.db_path
    }
}
