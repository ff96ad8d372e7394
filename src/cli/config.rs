//! Configuration management for askbuddy
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.askbuddy/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::errors::{PipelineError, Result};

/// Complete configuration for askbuddy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ollama: OllamaConfig,
    pub retrieval: RetrievalConfig,
    pub grounded: GroundedConfig,
    pub escalation: EscalationConfig,
    pub wikipedia: WikipediaConfig,
    pub web_search: WebSearchConfig,
    pub corpus: CorpusConfig,
    pub pacing: PacingConfig,
    pub pipeline: PipelineConfig,
}

/// Ollama connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
    pub router_temperature: f32,
    pub answer_temperature: f32,
}

/// Evidence retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks requested per query variant
    pub top_k: usize,
    /// Maximum evidence characters handed to the grounded answerer
    pub context_budget_chars: usize,
    /// Upper bound on generated query variants
    pub max_query_variants: usize,
}

/// Grounded answerer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundedConfig {
    /// Responses shorter than this count as "not found"
    pub min_answer_chars: usize,
}

/// Open-domain escalation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    pub min_passage_chars: usize,
    pub relevance_excerpt_chars: usize,
    pub min_answer_chars: usize,
    pub wikipedia_enabled: bool,
    pub web_search_enabled: bool,
    /// Per-source lookup timeout in seconds (0 = only the question deadline)
    pub lookup_timeout_secs: u64,
}

/// Wikipedia lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WikipediaConfig {
    pub language: String,
    pub top_k_results: usize,
    pub doc_content_chars_max: usize,
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    /// Environment variable holding the Tavily API key
    pub api_key_env: String,
    pub max_results: usize,
}

/// Document corpus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub qdrant_url: String,
    pub collection: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

/// Generation call pacing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Minimum delay between generation calls (0 disables)
    pub min_call_interval_ms: u64,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
}

/// Per-question pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Deadline for answering one question (0 disables)
    pub question_deadline_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 11434,
            model: "qwen2.5:7b-instruct".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            request_timeout_secs: 60,
            router_temperature: 0.1,
            answer_temperature: 0.3,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 8,
            context_budget_chars: 20_000,
            max_query_variants: 5,
        }
    }
}

impl Default for GroundedConfig {
    fn default() -> Self {
        Self {
            min_answer_chars: 15,
        }
    }
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            min_passage_chars: 50,
            relevance_excerpt_chars: 1000,
            min_answer_chars: 15,
            wikipedia_enabled: true,
            web_search_enabled: true,
            lookup_timeout_secs: 20,
        }
    }
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            top_k_results: 2,
            doc_content_chars_max: 4000,
        }
    }
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: "TAVILY_API_KEY".to_string(),
            max_results: 5,
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "documents".to_string(),
            chunk_size: 750,
            chunk_overlap: 150,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_call_interval_ms: 500,
            retry_attempts: 2,
            retry_base_delay_ms: 500,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            question_deadline_secs: 120,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| PipelineError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".askbuddy").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(PipelineError::Configuration(
                "retrieval.top_k must be greater than 0".to_string(),
            ));
        }

        if self.retrieval.context_budget_chars == 0 {
            return Err(PipelineError::Configuration(
                "retrieval.context_budget_chars must be greater than 0".to_string(),
            ));
        }

        if self.retrieval.max_query_variants == 0 {
            return Err(PipelineError::Configuration(
                "retrieval.max_query_variants must be greater than 0".to_string(),
            ));
        }

        if self.corpus.chunk_size == 0 {
            return Err(PipelineError::Configuration(
                "corpus.chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.corpus.chunk_overlap >= self.corpus.chunk_size {
            return Err(PipelineError::Configuration(
                "corpus.chunk_overlap must be less than corpus.chunk_size".to_string(),
            ));
        }

        for (name, value) in [
            ("router_temperature", self.ollama.router_temperature),
            ("answer_temperature", self.ollama.answer_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(PipelineError::Configuration(format!(
                    "ollama.{} must be between 0.0 and 2.0",
                    name
                )));
            }
        }

        if self.wikipedia.language.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "wikipedia.language must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| {
            PipelineError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PipelineError::Configuration(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| PipelineError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            PipelineError::Configuration(format!("Failed to serialize config: {}", e))
        })
    }

    /// Get Ollama base URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }

    /// Web search API key from the configured environment variable
    pub fn web_search_api_key(&self) -> Option<String> {
        std::env::var(&self.web_search.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Per-source lookup timeout, `None` when disabled
    pub fn lookup_timeout(&self) -> Option<Duration> {
        match self.escalation.lookup_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Per-question deadline, `None` when disabled
    pub fn question_deadline(&self) -> Option<Duration> {
        match self.pipeline.question_deadline_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ollama.host, "127.0.0.1");
        assert_eq!(config.ollama.port, 11434);
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.context_budget_chars, 20_000);
        assert_eq!(config.grounded.min_answer_chars, 15);
        assert_eq!(config.escalation.min_passage_chars, 50);
    }

    #[test]
    fn test_config_validation_success() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_budget() {
        let mut config = Config::default();
        config.retrieval.context_budget_chars = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_overlap() {
        let mut config = Config::default();
        config.corpus.chunk_overlap = 750;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_temperature() {
        let mut config = Config::default();
        config.ollama.router_temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ollama_url() {
        let config = Config::default();
        assert_eq!(config.ollama_url(), "http://127.0.0.1:11434");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[retrieval]\ntop_k = 4\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.retrieval.context_budget_chars, 20_000);
        assert_eq!(config.ollama.port, 11434);
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.wikipedia.language = "tr".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(Some(path)).unwrap();
        assert_eq!(loaded.wikipedia.language, "tr");
    }

    #[test]
    fn test_invalid_file_is_configuration_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[retrieval]\ntop_k = 0\n").unwrap();

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_question_deadline_disabled() {
        let mut config = Config::default();
        config.pipeline.question_deadline_secs = 0;
        assert!(config.question_deadline().is_none());
    }
}
