//! Evidence retriever
//!
//! question -> query variants -> per-variant search -> dedup -> budget

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::corpus::{ChunkOrigin, Corpus, EvidenceChunk};
use crate::deadline::Deadline;
use crate::errors::{PipelineError, Result};
use crate::retrieval::budget::EvidenceSet;
use crate::retrieval::expansion::QueryExpander;
use crate::types::Question;

/// Default chunks requested per query variant
pub const DEFAULT_TOP_K: usize = 8;

/// Retrieval parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalParams {
    pub top_k: usize,
    pub budget_chars: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            budget_chars: crate::retrieval::budget::DEFAULT_CONTEXT_BUDGET,
        }
    }
}

/// Merge per-variant results, keeping the first chunk seen per origin
pub fn dedup_chunks(per_variant: Vec<Vec<EvidenceChunk>>) -> Vec<EvidenceChunk> {
    let mut seen: HashSet<ChunkOrigin> = HashSet::new();
    per_variant
        .into_iter()
        .flatten()
        .filter(|chunk| seen.insert(chunk.origin.clone()))
        .collect()
}

/// Retrieves budgeted evidence for a question
#[derive(Clone)]
pub struct EvidenceRetriever {
    expander: QueryExpander,
    corpus: Arc<dyn Corpus>,
    params: RetrievalParams,
}

impl EvidenceRetriever {
    pub fn new(expander: QueryExpander, corpus: Arc<dyn Corpus>, params: RetrievalParams) -> Self {
        Self {
            expander,
            corpus,
            params,
        }
    }

    /// Fails only when a corpus search fails; no hits is an empty set
    pub async fn retrieve(&self, question: &Question, deadline: &Deadline) -> Result<EvidenceSet> {
        let variants = self.expander.expand(question, deadline).await;

        let mut per_variant = Vec::with_capacity(variants.len());
        for variant in &variants {
            let hits = deadline
                .run(self.corpus.search(variant, self.params.top_k))
                .await
                .map_err(|e| match e {
                    PipelineError::Retrieval(_) => e,
                    other => PipelineError::Retrieval(other.to_string()),
                })?;
            debug!(query = %variant, hits = hits.len(), "corpus search");
            per_variant.push(hits);
        }

        let raw_hits: usize = per_variant.iter().map(Vec::len).sum();
        let unique = dedup_chunks(per_variant);
        let unique_count = unique.len();
        let set = EvidenceSet::assemble(unique, self.params.budget_chars);

        info!(
            variants = variants.len(),
            raw_hits,
            duplicates = raw_hits - unique_count,
            kept = set.len(),
            dropped = set.dropped(),
            chars = set.total_chars(),
            "evidence assembled"
        );

        Ok(set)
    }
}
