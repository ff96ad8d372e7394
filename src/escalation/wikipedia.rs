//! Wikipedia lookup over the MediaWiki action API
//!
//! - Search: list=search limited to `top_k_results` titles
//! - Content: prop=extracts (intro, plain text) per title
//! - Output: `Page: <title>\nSummary: <extract>` blocks, truncated

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::errors::{PipelineError, Result};
use crate::escalation::source::Encyclopedia;

/// Text returned when search finds no usable page
pub const NO_RESULT_TEXT: &str = "No good Wikipedia Search Result was found";

const SOURCE_NAME: &str = "Wikipedia";
const USER_AGENT: &str = concat!("askbuddy/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Wikipedia client
#[derive(Debug, Clone)]
pub struct WikipediaClient {
    client: Client,
    api_url: String,
    top_k_results: usize,
    doc_content_chars_max: usize,
}

impl WikipediaClient {
    /// Client for the Wikipedia of `language` (e.g. "en")
    pub fn new(language: &str, top_k_results: usize, doc_content_chars_max: usize) -> Result<Self> {
        Self::with_api_url(
            &format!("https://{}.wikipedia.org/w/api.php", language),
            top_k_results,
            doc_content_chars_max,
        )
    }

    /// Client for any MediaWiki endpoint
    pub fn with_api_url(api_url: &str, top_k_results: usize, doc_content_chars_max: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(PipelineError::Http)?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            top_k_results: top_k_results.max(1),
            doc_content_chars_max,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn search_titles(&self, query: &str) -> Result<Vec<String>> {
        let limit = self.top_k_results.to_string();
        let response: SearchResponse = self
            .get(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", &limit),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .await?;

        Ok(response
            .query
            .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
            .unwrap_or_default())
    }

    async fn page_summary(&self, title: &str) -> Result<Option<String>> {
        let response: ExtractResponse = self
            .get(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .await?;

        Ok(response
            .query
            .and_then(|q| q.pages.into_iter().next())
            .filter(|page| !page.missing)
            .and_then(|page| page.extract)
            .filter(|extract| !extract.trim().is_empty()))
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, params: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(&self.api_url)
            .query(params)
            .send()
            .await
            .map_err(|e| lookup_error(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(lookup_error(format!("HTTP {}", response.status())));
        }

        response
            .json()
            .await
            .map_err(|e| lookup_error(format!("malformed response: {}", e)))
    }
}

#[async_trait]
impl Encyclopedia for WikipediaClient {
    async fn lookup(&self, query: &str) -> Result<String> {
        let titles = self.search_titles(query).await?;
        debug!(?titles, "wikipedia search");

        let mut pages = Vec::new();
        for title in titles {
            if let Some(summary) = self.page_summary(&title).await? {
                pages.push(render_page(&title, &summary));
            }
        }

        if pages.is_empty() {
            return Ok(NO_RESULT_TEXT.to_string());
        }

        Ok(truncate_chars(&pages.join("\n\n"), self.doc_content_chars_max))
    }
}

fn lookup_error(reason: String) -> PipelineError {
    PipelineError::SourceLookup {
        source_name: SOURCE_NAME.to_string(),
        reason,
    }
}

/// `Page:`/`Summary:` block for one page
pub fn render_page(title: &str, summary: &str) -> String {
    format!("Page: {}\nSummary: {}", title, summary.trim())
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    #[serde(default)]
    missing: bool,
    extract: Option<String>,
}
