//! Tavily web search

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{PipelineError, Result};
use crate::escalation::source::{WebResult, WebSearch};

const TAVILY_URL: &str = "https://api.tavily.com/search";
const SOURCE_NAME: &str = "Web Search";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tavily-backed web search
pub struct TavilyClient {
    client: Client,
    api_key: SecretString,
    endpoint: String,
    max_results: usize,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>, max_results: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PipelineError::Http)?;

        Ok(Self {
            client,
            api_key: SecretString::new(Box::from(api_key.into().as_str())),
            endpoint: TAVILY_URL.to_string(),
            max_results: max_results.max(1),
        })
    }

    /// Point at a different search endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }
}

impl std::fmt::Debug for TavilyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("max_results", &self.max_results)
            .finish()
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    title: Option<String>,
    content: Option<String>,
}

#[async_trait]
impl WebSearch for TavilyClient {
    async fn search(&self, query: &str) -> Result<Vec<WebResult>> {
        let request = SearchRequest {
            query,
            search_depth: "basic",
            max_results: self.max_results,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .json(&request)
            .send()
            .await
            .map_err(|e| lookup_error(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(lookup_error(format!("Tavily API error: {}", response.status())));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| lookup_error(format!("malformed response: {}", e)))?;

        Ok(into_web_results(body))
    }
}

fn into_web_results(body: SearchResponse) -> Vec<WebResult> {
    body.results
        .into_iter()
        .filter_map(|r| {
            let content = r.content.unwrap_or_default();
            if content.trim().is_empty() {
                return None;
            }
            Some(WebResult::new(r.title.unwrap_or_default(), content))
        })
        .collect()
}

fn lookup_error(reason: String) -> PipelineError {
    PipelineError::SourceLookup {
        source_name: SOURCE_NAME.to_string(),
        reason,
    }
}
