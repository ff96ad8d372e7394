//! Answer result types
//!
//! `AnswerResult` is the only value the pipeline hands back to its caller.
//! Its `label` is machine-checkable: callers can tell a grounded answer from
//! "no documents", "service unavailable", "evidence too large" and
//! "all sources exhausted" without parsing the answer text.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Track;

/// Provenance of an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceLabel {
    /// Answer generated from corpus evidence
    GroundedAnswer,
    /// Evidence was retrieved but did not contain the answer
    GroundedNotFound,
    /// Corpus search returned no chunks at all
    NoDocuments,
    /// Corpus search failed
    RetrievalFailed,
    /// Every retrieved chunk exceeded the context budget
    EvidenceTooLarge,
    /// The generation service could not be reached or failed
    GenerationUnavailable,
    /// Answer accepted from an open-domain source
    OpenDomain { source: String },
    /// Every open-domain source was tried without an accepted answer
    SourcesExhausted { attempted: Vec<String> },
    /// Templated refusal
    Fallback,
}

impl SourceLabel {
    /// Stable machine code for the label
    pub fn code(&self) -> &'static str {
        match self {
            SourceLabel::GroundedAnswer => "grounded_answer",
            SourceLabel::GroundedNotFound => "grounded_not_found",
            SourceLabel::NoDocuments => "no_documents",
            SourceLabel::RetrievalFailed => "retrieval_failed",
            SourceLabel::EvidenceTooLarge => "evidence_too_large",
            SourceLabel::GenerationUnavailable => "generation_unavailable",
            SourceLabel::OpenDomain { .. } => "open_domain",
            SourceLabel::SourcesExhausted { .. } => "sources_exhausted",
            SourceLabel::Fallback => "fallback",
        }
    }

    /// Whether the label carries a usable answer
    pub fn is_answer(&self) -> bool {
        matches!(
            self,
            SourceLabel::GroundedAnswer | SourceLabel::OpenDomain { .. }
        )
    }
}

impl fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLabel::GroundedAnswer => write!(f, "Document corpus"),
            SourceLabel::GroundedNotFound => write!(f, "Document corpus (answer not found)"),
            SourceLabel::NoDocuments => write!(f, "Document corpus (no documents found)"),
            SourceLabel::RetrievalFailed => write!(f, "Document corpus (retrieval failed)"),
            SourceLabel::EvidenceTooLarge => write!(f, "Document corpus (evidence too large)"),
            SourceLabel::GenerationUnavailable => write!(f, "Generation service unavailable"),
            SourceLabel::OpenDomain { source } => write!(f, "{}", source),
            SourceLabel::SourcesExhausted { attempted } => {
                if attempted.is_empty() {
                    write!(f, "Open-domain sources (nothing attempted)")
                } else {
                    write!(f, "Open-domain sources exhausted ({})", attempted.join(", "))
                }
            }
            SourceLabel::Fallback => write!(f, "Fallback"),
        }
    }
}

/// Why an open-domain source result was not accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// The lookup returned nothing
    EmptyResult,
    /// The raw passage is shorter than the minimum
    PassageTooShort { chars: usize },
    /// The passage contains a source-specific "no result" marker
    NoResultMarker { marker: String },
    /// The relevance check answered negatively
    Irrelevant,
    /// The relevance check answered neither yes nor no
    AmbiguousRelevance { response: String },
    /// The extracted answer contains a failure phrase
    NegativeAnswer { phrase: String },
    /// The extracted answer is shorter than the minimum
    AnswerTooShort { chars: usize },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::EmptyResult => write!(f, "empty result"),
            RejectReason::PassageTooShort { chars } => {
                write!(f, "passage too short ({} chars)", chars)
            }
            RejectReason::NoResultMarker { marker } => write!(f, "no-result marker '{}'", marker),
            RejectReason::Irrelevant => write!(f, "judged irrelevant"),
            RejectReason::AmbiguousRelevance { response } => {
                write!(f, "ambiguous relevance response '{}'", response)
            }
            RejectReason::NegativeAnswer { phrase } => {
                write!(f, "answer contains failure phrase '{}'", phrase)
            }
            RejectReason::AnswerTooShort { chars } => {
                write!(f, "answer too short ({} chars)", chars)
            }
        }
    }
}

/// Outcome of one open-domain source attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted,
    Rejected { reason: RejectReason },
    Errored { message: String },
}

/// Record of one open-domain source tried, in escalation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAttempt {
    pub source: String,
    pub outcome: AttemptOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl SourceAttempt {
    pub fn accepted(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            outcome: AttemptOutcome::Accepted,
            text: Some(text.into()),
        }
    }

    pub fn rejected(source: impl Into<String>, reason: RejectReason) -> Self {
        Self {
            source: source.into(),
            outcome: AttemptOutcome::Rejected { reason },
            text: None,
        }
    }

    pub fn errored(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            outcome: AttemptOutcome::Errored {
                message: message.into(),
            },
            text: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Accepted)
    }
}

/// The pipeline's sole externally visible output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub label: SourceLabel,
    pub track: Track,
    /// Open-domain source trace, empty for the other tracks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<SourceAttempt>,
}

impl AnswerResult {
    pub fn new(answer: impl Into<String>, label: SourceLabel, track: Track) -> Self {
        Self {
            answer: answer.into(),
            label,
            track,
            attempts: Vec::new(),
        }
    }

    /// Attach the open-domain attempt trace
    pub fn with_attempts(mut self, attempts: Vec<SourceAttempt>) -> Self {
        self.attempts = attempts;
        self
    }
}
