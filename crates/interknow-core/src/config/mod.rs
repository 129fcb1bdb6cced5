//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::graph::QualityThresholds;

/// Environment variables consulted for the API key, in order
const API_KEY_VARS: &[&str] = &["INTERKNOW_API_KEY", "VOLC_ARK_API_KEY"];

/// Environment variable overriding the configured model
const MODEL_VAR: &str = "VOLC_ARK_MODEL";

/// InterKnow configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub quality: QualityThresholds,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    pub default_model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

/// Size caps and time bounds for graph synthesis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub max_nodes: usize,
    pub max_links: usize,
    pub call_timeout_secs: u64,
}

/// Sizing of the concept membership filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub expected_elements: usize,
    pub false_positive_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file; defaults to the config directory
    pub database_path: Option<PathBuf>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: "doubao-seed-1-6-250615".to_string(),
            base_url: "https://ark.cn-beijing.volces.com/api/v3".to_string(),
            temperature: 0.7,
            max_tokens: 8192,
            timeout_secs: 120,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_nodes: 30,
            max_links: 60,
            call_timeout_secs: 180,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            expected_elements: 10_000,
            false_positive_rate: 0.01,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
        }
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(API_KEY_VARS
            .iter()
            .find_map(|var| env::var(var).ok().filter(|v| !v.trim().is_empty())))
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| {
            opt.map(|key| {
                if key.len() <= 4 {
                    "***".to_string()
                } else {
                    let suffix = &key[key.len() - 4..];
                    format!("***{}", suffix)
                }
            })
        })
    }

    /// Model to use, honouring the environment override
    pub fn resolved_model(&self) -> String {
        env::var(MODEL_VAR)
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.default_model.clone())
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "LLM API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("INTERKNOW_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("interknow")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from an explicit file path
    pub fn load_from(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            // Return default config without creating file
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit file path
    pub fn save_to(&self, path: &std::path::Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.llm.enforce_env_only()?;

        if self.generation.max_nodes == 0 || self.generation.max_links == 0 {
            return Err(anyhow!("generation.max_nodes and generation.max_links must be positive"));
        }
        if self.generation.call_timeout_secs == 0 {
            return Err(anyhow!("generation.call_timeout_secs must be positive"));
        }

        let q = &self.quality;
        if q.min_relation_len > q.max_relation_len {
            return Err(anyhow!(
                "quality.min_relation_len ({}) exceeds quality.max_relation_len ({})",
                q.min_relation_len,
                q.max_relation_len
            ));
        }
        for (key, ratio) in [
            ("quality.max_generic_relation_ratio", q.max_generic_relation_ratio),
            ("quality.min_cross_discipline_edge_ratio", q.min_cross_discipline_edge_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(anyhow!("{} must be between 0.0 and 1.0", key));
            }
        }

        if self.filter.expected_elements == 0 {
            return Err(anyhow!("filter.expected_elements must be positive"));
        }
        let p = self.filter.false_positive_rate;
        if !(p > 0.0 && p < 1.0) {
            return Err(anyhow!("filter.false_positive_rate must be strictly between 0 and 1"));
        }

        Ok(())
    }

    /// Database path, falling back to the config directory
    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("interknow.db")),
        }
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            // LLM settings
            "llm.default_model" => Ok(self.llm.default_model.clone()),
            "llm.base_url" => Ok(self.llm.base_url.clone()),
            "llm.temperature" => Ok(self.llm.temperature.to_string()),
            "llm.max_tokens" => Ok(self.llm.max_tokens.to_string()),
            "llm.timeout_secs" => Ok(self.llm.timeout_secs.to_string()),

            // Generation settings
            "generation.max_nodes" => Ok(self.generation.max_nodes.to_string()),
            "generation.max_links" => Ok(self.generation.max_links.to_string()),
            "generation.call_timeout_secs" => Ok(self.generation.call_timeout_secs.to_string()),

            // Quality thresholds
            "quality.min_disciplines" => Ok(self.quality.min_disciplines.to_string()),
            "quality.min_valid_links" => Ok(self.quality.min_valid_links.to_string()),
            "quality.min_relation_len" => Ok(self.quality.min_relation_len.to_string()),
            "quality.max_relation_len" => Ok(self.quality.max_relation_len.to_string()),
            "quality.max_generic_relation_ratio" => {
                Ok(self.quality.max_generic_relation_ratio.to_string())
            }
            "quality.min_cross_discipline_edge_ratio" => {
                Ok(self.quality.min_cross_discipline_edge_ratio.to_string())
            }

            // Filter settings
            "filter.expected_elements" => Ok(self.filter.expected_elements.to_string()),
            "filter.false_positive_rate" => Ok(self.filter.false_positive_rate.to_string()),

            // Storage settings
            "storage.database_path" => Ok(self.database_path()?.display().to_string()),

            // API key (special handling - show redacted)
            "llm.api_key" | "api_key" => match self.llm.redacted_api_key()? {
                Some(redacted) => Ok(redacted),
                None => Ok("(not set - use INTERKNOW_API_KEY or VOLC_ARK_API_KEY env var)".to_string()),
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `interknow config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            // LLM settings
            "llm.default_model" => {
                self.llm.default_model = value.to_string();
            }
            "llm.base_url" => {
                self.llm.base_url = value.trim_end_matches('/').to_string();
            }
            "llm.temperature" => {
                let temp: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid temperature value: {}", value))?;
                if !(0.0..=2.0).contains(&temp) {
                    return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
                }
                self.llm.temperature = temp;
            }
            "llm.max_tokens" => {
                self.llm.max_tokens = parse_value(key, value)?;
            }
            "llm.timeout_secs" => {
                self.llm.timeout_secs = parse_value(key, value)?;
            }

            // Generation settings
            "generation.max_nodes" => self.generation.max_nodes = parse_value(key, value)?,
            "generation.max_links" => self.generation.max_links = parse_value(key, value)?,
            "generation.call_timeout_secs" => {
                self.generation.call_timeout_secs = parse_value(key, value)?
            }

            // Quality thresholds
            "quality.min_disciplines" => self.quality.min_disciplines = parse_value(key, value)?,
            "quality.min_valid_links" => self.quality.min_valid_links = parse_value(key, value)?,
            "quality.min_relation_len" => self.quality.min_relation_len = parse_value(key, value)?,
            "quality.max_relation_len" => self.quality.max_relation_len = parse_value(key, value)?,
            "quality.max_generic_relation_ratio" => {
                self.quality.max_generic_relation_ratio = parse_ratio(key, value)?
            }
            "quality.min_cross_discipline_edge_ratio" => {
                self.quality.min_cross_discipline_edge_ratio = parse_ratio(key, value)?
            }

            // Filter settings
            "filter.expected_elements" => {
                let n: usize = parse_value(key, value)?;
                if n == 0 {
                    return Err(anyhow!("filter.expected_elements must be positive"));
                }
                self.filter.expected_elements = n;
            }
            "filter.false_positive_rate" => {
                let p: f64 = parse_value(key, value)?;
                if !(p > 0.0 && p < 1.0) {
                    return Err(anyhow!("False positive rate must be strictly between 0 and 1"));
                }
                self.filter.false_positive_rate = p;
            }

            // Storage settings
            "storage.database_path" => {
                self.storage.database_path = Some(PathBuf::from(value));
            }

            // API key cannot be set via config
            "llm.api_key" | "api_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set the INTERKNOW_API_KEY or VOLC_ARK_API_KEY environment variable instead."
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `interknow config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = vec![
            "llm.default_model",
            "llm.base_url",
            "llm.temperature",
            "llm.max_tokens",
            "llm.timeout_secs",
            "llm.api_key",
            "generation.max_nodes",
            "generation.max_links",
            "generation.call_timeout_secs",
            "quality.min_disciplines",
            "quality.min_valid_links",
            "quality.min_relation_len",
            "quality.max_relation_len",
            "quality.max_generic_relation_ratio",
            "quality.min_cross_discipline_edge_ratio",
            "filter.expected_elements",
            "filter.false_positive_rate",
            "storage.database_path",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid {} value: {}", key, value))
}

fn parse_ratio(key: &str, value: &str) -> anyhow::Result<f64> {
    let ratio: f64 = parse_value(key, value)?;
    if !(0.0..=1.0).contains(&ratio) {
        return Err(anyhow!("{} must be between 0.0 and 1.0", key));
    }
    Ok(ratio)
}
