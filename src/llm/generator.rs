//! Generation service abstraction
//!
//! Every call the pipeline makes to the language model (classification,
//! query expansion, grounded answering, relevance checks, extraction) is
//! one `generate` call. The `PromptKind` tells adapters which sampling
//! settings to use and lets test doubles script replies per call site.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::errors::Result;

/// Which pipeline step issued a generation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Router taxonomy classification
    Classify,
    /// Paraphrased search queries for corpus retrieval
    ExpandQuery,
    /// Evidence-constrained answer
    GroundedAnswer,
    /// Binary relevance check of an open-domain passage
    Relevance,
    /// Answer extraction from an open-domain passage
    Extract,
}

impl PromptKind {
    /// Classification-style calls want near-deterministic sampling
    pub fn is_classification(&self) -> bool {
        matches!(self, PromptKind::Classify | PromptKind::Relevance)
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PromptKind::Classify => "classify",
            PromptKind::ExpandQuery => "expand_query",
            PromptKind::GroundedAnswer => "grounded_answer",
            PromptKind::Relevance => "relevance",
            PromptKind::Extract => "extract",
        };
        f.write_str(name)
    }
}

/// One request to the generation service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub kind: PromptKind,
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(kind: PromptKind, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
        }
    }
}

/// Opaque prompt-in, text-out generation service
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a complete (non-streamed) response
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for Arc<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        (**self).generate(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_kinds() {
        assert!(PromptKind::Classify.is_classification());
        assert!(PromptKind::Relevance.is_classification());
        assert!(!PromptKind::GroundedAnswer.is_classification());
        assert!(!PromptKind::Extract.is_classification());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(PromptKind::ExpandQuery.to_string(), "expand_query");
    }
}
