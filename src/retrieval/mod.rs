//! Evidence retrieval from the document corpus

pub mod budget;
pub mod engine;
pub mod expansion;

pub use budget::{EvidenceSet, DEFAULT_CONTEXT_BUDGET};
pub use engine::{dedup_chunks, EvidenceRetriever, RetrievalParams, DEFAULT_TOP_K};
pub use expansion::{parse_variants, QueryExpander};
