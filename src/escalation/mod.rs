//! Open-domain escalation
//!
//! Encyclopedic lookup first, live web search second, one shared gate.

pub mod chain;
pub mod gate;
pub mod source;
pub mod web;
pub mod wikipedia;

pub use chain::{ChainState, EscalationChain};
pub use gate::{GateConfig, RelevanceVerdict};
pub use source::{
    EncyclopedicSource, Encyclopedia, KnowledgeSource, WebResult, WebSearch, WebSearchSource,
};
pub use web::TavilyClient;
pub use wikipedia::WikipediaClient;
