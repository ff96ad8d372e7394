//! askbuddy - question answering over a document corpus, Wikipedia and the web
//!
//! Every question is classified into one of three tracks:
//!
//! - **Grounded**: expand the query, search the corpus, answer only from the
//!   retrieved evidence
//! - **Open domain**: escalate through Wikipedia, then web search, accepting
//!   the first source whose text is relevant and yields an answer
//! - **Fallback**: a templated refusal
//!
//! The pipeline never fails once built; every outcome is an `AnswerResult`
//! with a machine-checkable `SourceLabel`.

pub mod errors;
pub mod types;
pub mod deadline;

// Generation service and prompts
pub mod llm;
pub mod prompts;

// Tracks
pub mod router;
pub mod corpus;
pub mod retrieval;
pub mod grounded;
pub mod escalation;
pub mod fallback;
pub mod pipeline;

// Command-line surface
pub mod cli;
pub mod doctor;

pub mod testing;

// Re-export commonly used types
pub use errors::{PipelineError, Result};
pub use pipeline::{PipelineBuilder, QuestionPipeline};
pub use types::{AnswerResult, Question, RoutingDecision, SourceLabel, Track};
