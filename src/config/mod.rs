//! Configuration management for semrank
//!
//! Handles loading, validation, and profile/env overrides for the index
//! build, expansion, ranking, and evaluation parameters.

use crate::error::{Result, SemrankError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub corpus: CorpusConfig,
    pub model: ModelConfig,
    pub expansion: ExpansionConfig,
    pub ranking: RankingConfig,
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Index store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite index file
    pub db_path: PathBuf,
}

/// Corpus ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Directory holding pre-tokenized documents (one `.txt` per document)
    pub docs_dir: PathBuf,
    /// Vocabulary surface forms at or above this length are discarded
    pub max_term_text_len: usize,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to word vectors in word2vec text format
    pub vectors_path: PathBuf,
}

/// Semantic expansion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionConfig {
    /// How many nearest neighbors to request per term
    pub max_neighbors: usize,
    /// Neighbors at or below this cosine similarity are discarded
    pub min_similarity: f64,
    /// Discount applied to neighbor (non-self) term-frequency contributions
    pub lambda: f64,
}

/// Ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// BM25 saturation parameter
    pub k: f64,
    /// BM25 length-normalization parameter
    pub b: f64,
    /// Ranked lists are truncated to this many documents
    pub top_k: usize,
    /// Use the canonical saturating BM25 term instead of the legacy one
    #[serde(default)]
    pub corrected_bm25: bool,
}

/// Evaluation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// JSON file with queries and graded relevance judgments
    pub judgments_file: PathBuf,
    /// Metrics are computed over the top-`cutoff` prefix of each ranking
    pub cutoff: usize,
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_neighbors: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lambda: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_bm25: Option<bool>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SemrankError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| SemrankError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        // Validate configuration
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| SemrankError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        if let Some(overrides) = self.profiles.get(profile) {
            if let Some(max_neighbors) = overrides.max_neighbors {
                self.expansion.max_neighbors = max_neighbors;
            }
            if let Some(min_similarity) = overrides.min_similarity {
                self.expansion.min_similarity = min_similarity;
            }
            if let Some(lambda) = overrides.lambda {
                self.expansion.lambda = lambda;
            }
            if let Some(corrected) = overrides.corrected_bm25 {
                self.ranking.corrected_bm25 = corrected;
            }
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: SEMRANK_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("SEMRANK_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        fn parse<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
            value.parse().map_err(|_| SemrankError::InvalidConfigValue {
                path: path.to_string(),
                message: format!("Cannot parse '{}'", value),
            })
        }

        match path {
            "EXPANSION__MAX_NEIGHBORS" => {
                self.expansion.max_neighbors = parse(path, value)?;
            }
            "EXPANSION__MIN_SIMILARITY" => {
                self.expansion.min_similarity = parse(path, value)?;
            }
            "EXPANSION__LAMBDA" => {
                self.expansion.lambda = parse(path, value)?;
            }
            "RANKING__K" => {
                self.ranking.k = parse(path, value)?;
            }
            "RANKING__B" => {
                self.ranking.b = parse(path, value)?;
            }
            "RANKING__TOP_K" => {
                self.ranking.top_k = parse(path, value)?;
            }
            "RANKING__CORRECTED_BM25" => {
                self.ranking.corrected_bm25 = parse(path, value)?;
            }
            "EVALUATION__CUTOFF" => {
                self.evaluation.cutoff = parse(path, value)?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SemrankError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("semrank").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| SemrankError::Config("Cannot determine home directory".to_string()))?;

        Ok(home_dir.join(".semrank"))
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("~/.semrank");

        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                db_path: data_dir.join("index.sqlite"),
            },
            corpus: CorpusConfig {
                docs_dir: data_dir.join("corpus"),
                max_term_text_len: 30,
            },
            model: ModelConfig {
                vectors_path: data_dir.join("vectors.txt"),
            },
            expansion: ExpansionConfig {
                max_neighbors: 100,
                min_similarity: 0.6,
                lambda: 0.8,
            },
            ranking: RankingConfig {
                k: 1.7,
                b: 0.75,
                top_k: 10_000,
                corrected_bm25: false,
            },
            evaluation: EvaluationConfig {
                judgments_file: data_dir.join("queries.json"),
                cutoff: 10,
            },
            profiles: HashMap::new(),
        }
    }
}
