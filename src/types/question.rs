//! Question and routing types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable natural-language question, the unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Question(String);

impl Question {
    /// Create a question, trimming surrounding whitespace
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self(text.trim().to_string())
    }

    /// Question text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether there is anything to answer
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Question {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Question {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// The single upfront classification of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingDecision {
    /// Answer from the local document corpus
    Grounded,
    /// Answer from encyclopedic or live web sources
    OpenDomain,
    /// Unrelated question, answered by the fallback responder
    Unsupported,
}

impl RoutingDecision {
    /// The track that handles this decision
    pub fn track(&self) -> Track {
        match self {
            RoutingDecision::Grounded => Track::Grounded,
            RoutingDecision::OpenDomain => Track::OpenDomain,
            RoutingDecision::Unsupported => Track::Fallback,
        }
    }
}

/// Pipeline track that produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Grounded,
    OpenDomain,
    Fallback,
}

impl Track {
    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Grounded => "grounded",
            Track::OpenDomain => "open_domain",
            Track::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_trims() {
        let q = Question::new("  What is the capital of France?\n");
        assert_eq!(q.as_str(), "What is the capital of France?");
        assert!(!q.is_empty());
    }

    #[test]
    fn test_blank_question_is_empty() {
        assert!(Question::new(" \t\n").is_empty());
    }

    #[test]
    fn test_decision_to_track() {
        assert_eq!(RoutingDecision::Grounded.track(), Track::Grounded);
        assert_eq!(RoutingDecision::OpenDomain.track(), Track::OpenDomain);
        assert_eq!(RoutingDecision::Unsupported.track(), Track::Fallback);
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_string(&RoutingDecision::OpenDomain).unwrap();
        assert_eq!(json, "\"open_domain\"");
    }
}
