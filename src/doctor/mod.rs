//! Doctor command for system diagnostics
//!
//! Checks every collaborator the question pipeline depends on: the Ollama
//! generation service and its models, the Qdrant corpus, and the
//! open-domain sources.

use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::Config;
use crate::corpus::{Embedder, QdrantCorpus};
use crate::llm::OllamaClient;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
        }
    }
}

/// Doctor diagnostics system
pub struct Doctor {
    config: Config,
}

impl Doctor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let mut checks = vec![self.check_config()];

        let client = OllamaClient::with_timeout(
            &self.config.ollama_url(),
            &self.config.ollama.model,
            Duration::from_secs(5),
        )
        .map(|c| c.with_embedding_model(self.config.ollama.embedding_model.clone()));

        match client {
            Ok(client) => {
                let reachable = self.check_ollama_api(&client).await;
                let up = reachable.status == HealthStatus::Pass;
                checks.push(reachable);

                if up {
                    match client.list_models().await {
                        Ok(models) => {
                            checks.push(check_model_installed("Model", &models, client.model()));
                            checks.push(check_model_installed(
                                "Embedding Model",
                                &models,
                                client.embedding_model(),
                            ));
                        }
                        Err(e) => checks.push(HealthCheck::new(
                            "Model",
                            HealthStatus::Fail(format!("Cannot list models: {}", e)),
                        )),
                    }
                }

                checks.push(self.check_corpus(Arc::new(client)).await);
            }
            Err(e) => checks.push(HealthCheck::new(
                "Ollama API",
                HealthStatus::Fail(format!("Cannot create client: {}", e)),
            )),
        }

        checks.push(check_wikipedia(&self.config));
        checks.push(check_web_search_key(&self.config));

        checks
    }

    fn check_config(&self) -> HealthCheck {
        match self.config.validate() {
            Ok(()) => HealthCheck::new("Configuration", HealthStatus::Pass),
            Err(e) => HealthCheck::new("Configuration", HealthStatus::Fail(e.to_string())),
        }
    }

    async fn check_ollama_api(&self, client: &OllamaClient) -> HealthCheck {
        match client.health_check().await {
            Ok(true) => HealthCheck::new("Ollama API", HealthStatus::Pass),
            Ok(false) => HealthCheck::new(
                "Ollama API",
                HealthStatus::Fail(format!(
                    "Ollama not reachable at {}. Start it with: ollama serve",
                    client.base_url()
                )),
            ),
            Err(e) => HealthCheck::new(
                "Ollama API",
                HealthStatus::Fail(format!("Error checking Ollama: {}", e)),
            ),
        }
    }

    async fn check_corpus(&self, embedder: Arc<dyn Embedder>) -> HealthCheck {
        let corpus = match QdrantCorpus::connect(
            &self.config.corpus.qdrant_url,
            &self.config.corpus.collection,
            embedder,
        ) {
            Ok(corpus) => corpus,
            Err(e) => return HealthCheck::new("Document Corpus", HealthStatus::Fail(e.to_string())),
        };

        if !corpus.health_check().await {
            return HealthCheck::new(
                "Document Corpus",
                HealthStatus::Fail(format!("Qdrant not reachable at {}", self.config.corpus.qdrant_url)),
            );
        }

        match corpus.point_count().await {
            Ok(0) => HealthCheck::new(
                "Document Corpus",
                HealthStatus::Warn(format!(
                    "Collection '{}' is empty. Run: askbuddy ingest <DIR>",
                    corpus.collection()
                )),
            ),
            Ok(_) => HealthCheck::new("Document Corpus", HealthStatus::Pass),
            Err(_) => HealthCheck::new(
                "Document Corpus",
                HealthStatus::Warn(format!(
                    "Collection '{}' not found. Run: askbuddy ingest <DIR>",
                    corpus.collection()
                )),
            ),
        }
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n{}\n", "askbuddy diagnostics".bold());
        println!("{:<20} Status", "Check");
        println!("{}", "=".repeat(50));

        for check in checks {
            let status = match &check.status {
                HealthStatus::Pass => "PASS".green().to_string(),
                HealthStatus::Warn(msg) => format!("WARN: {}", msg).yellow().to_string(),
                HealthStatus::Fail(msg) => format!("FAIL: {}", msg).red().to_string(),
            };
            println!("{:<20} {}", check.name, status);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

/// Ollama reports tags like `llama3:latest`; a bare name matches its `:latest` tag
fn check_model_installed(name: &str, installed: &[String], wanted: &str) -> HealthCheck {
    let found = installed
        .iter()
        .any(|m| m == wanted || m.strip_suffix(":latest") == Some(wanted));

    if found {
        HealthCheck::new(name, HealthStatus::Pass)
    } else {
        HealthCheck::new(
            name,
            HealthStatus::Fail(format!("'{}' not installed. Pull it with: ollama pull {}", wanted, wanted)),
        )
    }
}

fn check_wikipedia(config: &Config) -> HealthCheck {
    if config.escalation.wikipedia_enabled {
        HealthCheck::new("Wikipedia", HealthStatus::Pass)
    } else {
        HealthCheck::new("Wikipedia", HealthStatus::Warn("Disabled in configuration".to_string()))
    }
}

fn check_web_search_key(config: &Config) -> HealthCheck {
    if !config.escalation.web_search_enabled {
        return HealthCheck::new("Web Search", HealthStatus::Warn("Disabled in configuration".to_string()));
    }

    match config.web_search_api_key() {
        Some(_) => HealthCheck::new("Web Search", HealthStatus::Pass),
        None => HealthCheck::new(
            "Web Search",
            HealthStatus::Warn(format!(
                "{} is not set, web search will be skipped",
                config.web_search.api_key_env
            )),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_equality() {
        assert_eq!(HealthStatus::Pass, HealthStatus::Pass);
        assert_eq!(
            HealthStatus::Warn("test".to_string()),
            HealthStatus::Warn("test".to_string())
        );
        assert_ne!(HealthStatus::Pass, HealthStatus::Fail("test".to_string()));
    }

    #[test]
    fn test_overall_status_pass_with_warnings() {
        let checks = vec![
            HealthCheck::new("Test 1", HealthStatus::Pass),
            HealthCheck::new("Test 2", HealthStatus::Warn("warning".to_string())),
        ];
        assert!(Doctor::overall_status(&checks));
    }

    #[test]
    fn test_overall_status_fail() {
        let checks = vec![
            HealthCheck::new("Test 1", HealthStatus::Pass),
            HealthCheck::new("Test 2", HealthStatus::Fail("error".to_string())),
        ];
        assert!(!Doctor::overall_status(&checks));
    }

    #[test]
    fn test_model_installed_matches_latest_tag() {
        let installed = vec!["llama3:latest".to_string(), "nomic-embed-text:v1.5".to_string()];
        assert_eq!(check_model_installed("Model", &installed, "llama3").status, HealthStatus::Pass);
        assert_eq!(
            check_model_installed("Model", &installed, "llama3:latest").status,
            HealthStatus::Pass
        );
        assert!(matches!(
            check_model_installed("Model", &installed, "nomic-embed-text").status,
            HealthStatus::Fail(_)
        ));
    }

    #[test]
    fn test_missing_web_key_is_a_warning() {
        let mut config = Config::default();
        config.web_search.api_key_env = "ASKBUDDY_DOCTOR_UNSET_KEY".to_string();
        config.escalation.web_search_enabled = true;

        let check = check_web_search_key(&config);
        assert!(matches!(check.status, HealthStatus::Warn(ref m) if m.contains("ASKBUDDY_DOCTOR_UNSET_KEY")));
    }

    #[test]
    fn test_disabled_wikipedia_is_a_warning() {
        let mut config = Config::default();
        config.escalation.wikipedia_enabled = false;
        assert!(matches!(check_wikipedia(&config).status, HealthStatus::Warn(_)));
    }

    #[test]
    fn test_invalid_config_fails() {
        let mut config = Config::default();
        config.retrieval.top_k = 0;
        let doctor = Doctor::new(config);
        assert!(matches!(doctor.check_config().status, HealthStatus::Fail(_)));
    }
}
