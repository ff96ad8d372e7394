//! Ollama API client
//!
//! Provides blocking request/response generation and embeddings:
//! - Endpoint: POST /api/generate (stream: false)
//! - Endpoint: POST /api/embeddings
//! - Health: GET /api/version

use crate::errors::{is_overflow_message, PipelineError, Result};
use crate::llm::generator::{GenerationRequest, Generator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Default request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Sampling temperatures per kind of call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperatures {
    /// Classification and relevance checks
    pub classify: f32,
    /// Everything else
    pub answer: f32,
}

impl Default for Temperatures {
    fn default() -> Self {
        Self {
            classify: 0.1,
            answer: 0.3,
        }
    }
}

/// Ollama client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    embedding_model: String,
    temperatures: Temperatures,
}

impl OllamaClient {
    /// Create new Ollama client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, DEFAULT_MODEL)
    }

    /// Create Ollama client with custom configuration
    pub fn with_config(base_url: &str, model: &str) -> Result<Self> {
        Self::with_timeout(base_url, model, REQUEST_TIMEOUT)
    }

    /// Create Ollama client with a custom request timeout
    pub fn with_timeout(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PipelineError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            temperatures: Temperatures::default(),
        })
    }

    /// Use a different embedding model
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Use different sampling temperatures
    pub fn with_temperatures(mut self, temperatures: Temperatures) -> Self {
        self.temperatures = temperatures;
        self
    }

    /// Generate a complete response for one prompt
    pub async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: Some(GenerateOptions { temperature }),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Generation(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(generation_failure(
                format!("HTTP {}: {}", status, error_text),
                prompt,
            ));
        }

        let body: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Generation(format!("Malformed response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(generation_failure(error, prompt));
        }

        Ok(body.response)
    }

    /// Embed one text with the embedding model
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.embedding_model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| PipelineError::Generation(format!("Failed to send embedding request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::Generation(format!(
                "Embedding HTTP {}: {}",
                status, error_text
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Generation(format!("Malformed embedding response: {}", e)))?;

        if body.embedding.is_empty() {
            return Err(PipelineError::Generation(format!(
                "Model '{}' returned an empty embedding",
                self.embedding_model
            )));
        }

        Ok(body.embedding)
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/version", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// List available models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PipelineError::Generation(format!("Failed to list models: {}", e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::Generation(
                "Failed to retrieve model list".to_string(),
            ));
        }

        let models_response: ModelsResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Generation(format!("Failed to parse models: {}", e)))?;

        Ok(models_response
            .models
            .into_iter()
            .map(|m| m.name)
            .collect())
    }

    /// Get current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let temperature = if request.kind.is_classification() {
            self.temperatures.classify
        } else {
            self.temperatures.answer
        };
        self.complete(&request.prompt, temperature).await
    }
}

/// Oversized prompts become `BudgetExceeded`, everything else `Generation`
fn generation_failure(message: String, prompt: &str) -> PipelineError {
    if is_overflow_message(&message) {
        PipelineError::BudgetExceeded {
            chars: prompt.chars().count(),
            detail: message,
        }
    } else {
        PipelineError::Generation(message)
    }
}

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// Ollama generate response (non-streaming)
#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

/// Ollama models list response
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

/// Model information
#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new().unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert_eq!(client.base_url(), DEFAULT_OLLAMA_URL);
        assert_eq!(client.embedding_model(), DEFAULT_EMBEDDING_MODEL);
    }

    #[test]
    fn test_client_with_config_trims_slash() {
        let client = OllamaClient::with_config("http://localhost:11434/", "llama3.1:8b").unwrap();
        assert_eq!(client.model(), "llama3.1:8b");
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_generate_request_shape() {
        let request = OllamaGenerateRequest {
            model: "m".to_string(),
            prompt: "p".to_string(),
            stream: false,
            options: Some(GenerateOptions { temperature: 0.1 }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert!((json["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_generate_response_with_error() {
        let body: OllamaGenerateResponse =
            serde_json::from_str(r#"{"error":"model 'x' not found"}"#).unwrap();
        assert!(body.response.is_empty());
        assert_eq!(body.error.as_deref(), Some("model 'x' not found"));
    }

    #[test]
    fn test_overflow_message_is_budget_exceeded() {
        let err = generation_failure("HTTP 400: input exceeds the context length".to_string(), "abcd");
        assert!(matches!(err, PipelineError::BudgetExceeded { chars: 4, .. }));
        assert!(err.is_context_overflow());
        assert!(!err.is_retryable());

        let err = generation_failure("HTTP 500: model crashed".to_string(), "abcd");
        assert!(matches!(err, PipelineError::Generation(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_generation_error() {
        let client = OllamaClient::with_timeout("http://127.0.0.1:9", "m", Duration::from_millis(200)).unwrap();
        let err = client.complete("hello", 0.1).await.unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
        assert!(!client.health_check().await.unwrap());
    }
}
