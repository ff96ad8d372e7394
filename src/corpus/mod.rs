//! Document corpus collaborator
//!
//! The pipeline only consumes `Corpus::search`. Ingestion, chunking and
//! the Qdrant adapter live here too, but nothing in the question path
//! depends on them.

pub mod chunker;
pub mod ingest;
pub mod qdrant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::errors::Result;
use crate::llm::OllamaClient;

pub use chunker::{chunk_text, TextChunk};
pub use ingest::{ingest_directory, IngestReport};
pub use qdrant::QdrantCorpus;

/// Where a chunk came from: document plus character offset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkOrigin {
    pub source_id: String,
    pub offset: usize,
}

impl ChunkOrigin {
    pub fn new(source_id: impl Into<String>, offset: usize) -> Self {
        Self {
            source_id: source_id.into(),
            offset,
        }
    }
}

impl fmt::Display for ChunkOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.source_id, self.offset)
    }
}

/// A span of source text returned by the corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceChunk {
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub origin: ChunkOrigin,
}

impl EvidenceChunk {
    pub fn new(text: impl Into<String>, origin: ChunkOrigin) -> Self {
        Self {
            text: text.into(),
            metadata: serde_json::Map::new(),
            origin,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Length in characters, the unit of the context budget
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Similarity search over indexed chunks
#[async_trait]
pub trait Corpus: Send + Sync {
    /// Up to `k` chunks most similar to `query`
    async fn search(&self, query: &str, k: usize) -> Result<Vec<EvidenceChunk>>;
}

#[async_trait]
impl<C: Corpus + ?Sized> Corpus for Arc<C> {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<EvidenceChunk>> {
        (**self).search(query, k).await
    }
}

/// Destination for ingested chunks
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Persist chunks, returning how many were stored
    async fn store(&self, chunks: Vec<EvidenceChunk>) -> Result<usize>;
}

/// Text to vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        OllamaClient::embed(self, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_origin_identity() {
        let a = ChunkOrigin::new("rules.md", 750);
        let b = ChunkOrigin::new("rules.md", 750);
        let c = ChunkOrigin::new("rules.md", 1350);

        let set: HashSet<_> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(a.to_string(), "rules.md@750");
    }

    #[test]
    fn test_char_len_counts_characters() {
        let chunk = EvidenceChunk::new("çağrı", ChunkOrigin::new("a", 0));
        assert_eq!(chunk.char_len(), 5);
        assert!(chunk.text.len() > 5);
    }

    #[test]
    fn test_metadata_builder() {
        let chunk = EvidenceChunk::new("x", ChunkOrigin::new("a", 0)).with_metadata("page", 3);
        assert_eq!(chunk.metadata["page"], 3);
    }
}
