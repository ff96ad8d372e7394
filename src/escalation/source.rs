//! Knowledge source strategies
//!
//! A `KnowledgeSource` turns a question into a candidate passage or a
//! miss. The escalation chain owns an ordered list of them and applies
//! one shared gate, so adding a source is only a matter of adding it to
//! the list.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::Result;

/// One step of the escalation chain
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Name used in labels and the attempt trace
    fn name(&self) -> &str;

    /// How the extraction prompt refers to the passage
    fn passage_kind(&self) -> &str {
        "text"
    }

    /// Substrings that mark a raw result as a miss
    fn no_result_markers(&self) -> &[&'static str] {
        &[]
    }

    /// Strip source framing before the passage is judged
    fn clean(&self, raw: &str) -> String {
        raw.trim().to_string()
    }

    /// Raw candidate passage, `None` on a miss
    async fn lookup(&self, question: &str) -> Result<Option<String>>;
}

/// Structured reference lookup returning text, or a marker on a miss
#[async_trait]
pub trait Encyclopedia: Send + Sync {
    async fn lookup(&self, query: &str) -> Result<String>;
}

/// One ranked web result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub content: String,
}

impl WebResult {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Live web search
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<WebResult>>;
}

/// Markers the encyclopedic lookup uses for misses and ambiguous pages
pub const ENCYCLOPEDIA_MARKERS: &[&str] = &[
    "Did not find results",
    "No good Wikipedia Search Result",
    "may refer to",
    "Page id",
];

/// Encyclopedic source
pub struct EncyclopedicSource {
    name: String,
    encyclopedia: Arc<dyn Encyclopedia>,
}

impl EncyclopedicSource {
    pub fn new(encyclopedia: Arc<dyn Encyclopedia>) -> Self {
        Self {
            name: "Wikipedia".to_string(),
            encyclopedia,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl KnowledgeSource for EncyclopedicSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn passage_kind(&self) -> &str {
        "encyclopedia text"
    }

    fn no_result_markers(&self) -> &[&'static str] {
        ENCYCLOPEDIA_MARKERS
    }

    fn clean(&self, raw: &str) -> String {
        clean_encyclopedia_text(raw)
    }

    async fn lookup(&self, question: &str) -> Result<Option<String>> {
        let raw = self.encyclopedia.lookup(question).await?;
        Ok(Some(raw))
    }
}

/// Keep what follows the first `Summary:` and drop a leading `Page:` line
pub fn clean_encyclopedia_text(raw: &str) -> String {
    let body = match raw.split_once("Summary:") {
        Some((_, after)) => after.trim(),
        None => raw.trim(),
    };

    let body = match body.strip_prefix("Page:") {
        Some(rest) => rest.split_once('\n').map(|(_, tail)| tail).unwrap_or(""),
        None => body,
    };

    body.trim().to_string()
}

/// Live web search source
pub struct WebSearchSource {
    name: String,
    search: Arc<dyn WebSearch>,
    max_results: usize,
}

impl WebSearchSource {
    pub fn new(search: Arc<dyn WebSearch>, max_results: usize) -> Self {
        Self {
            name: "Web Search".to_string(),
            search,
            max_results: max_results.max(1),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl KnowledgeSource for WebSearchSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn passage_kind(&self) -> &str {
        "web search results"
    }

    async fn lookup(&self, question: &str) -> Result<Option<String>> {
        let results = self.search.search(question).await?;
        if results.is_empty() {
            return Ok(None);
        }
        Ok(Some(format_web_results(&results, self.max_results)))
    }
}

/// `Title:`/`Summary:` blocks for the first `max` results
pub fn format_web_results(results: &[WebResult], max: usize) -> String {
    results
        .iter()
        .take(max)
        .map(|r| format!("Title: {}\nSummary: {}", r.title.trim(), r.content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
