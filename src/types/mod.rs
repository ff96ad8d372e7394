//! Type definitions module
//!
//! Values created and dropped within the processing of a single question.

pub mod question;
pub mod answer;

// Re-export commonly used types
pub use question::{Question, RoutingDecision, Track};
pub use answer::{AnswerResult, AttemptOutcome, RejectReason, SourceAttempt, SourceLabel};
