//! Error types for askbuddy
//!
//! Every component boundary of the question pipeline is a recovery boundary:
//! these errors are produced by collaborators and adapters, caught by the
//! component that called them, and turned into a labelled `AnswerResult`.
//! Only `Configuration` is allowed to surface to the caller, and only while
//! the pipeline is being built.

use thiserror::Error;

/// Main error type for the question pipeline and its adapters
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required collaborator is absent or a config value is invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The document corpus search failed
    #[error("Corpus retrieval failed: {0}")]
    Retrieval(String),

    /// Any call to the generation service failed
    #[error("Generation service error: {0}")]
    Generation(String),

    /// Evidence does not fit into the generation context
    #[error("Input of {chars} characters exceeds the generation context: {detail}")]
    BudgetExceeded { chars: usize, detail: String },

    /// An open-domain knowledge source failed
    #[error("Lookup in {source_name} failed: {reason}")]
    SourceLookup { source_name: String, reason: String },

    /// The per-question deadline elapsed
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

impl PipelineError {
    /// Whether retrying the same call could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Http(_) => true,
            PipelineError::Generation(_) => !self.is_context_overflow(),
            PipelineError::Retrieval(_) => true,
            PipelineError::SourceLookup { .. } => true,

            // The deadline is already spent, retrying only overruns it
            PipelineError::Timeout { .. } => false,
            PipelineError::Configuration(_) => false,
            PipelineError::BudgetExceeded { .. } => false,
            PipelineError::Serialization(_) => false,
            PipelineError::Io(_) => false,
            PipelineError::Generic(_) => false,
        }
    }

    /// Whether the generation service rejected the input as too large
    pub fn is_context_overflow(&self) -> bool {
        match self {
            PipelineError::BudgetExceeded { .. } => true,
            PipelineError::Generation(msg) => is_overflow_message(msg),
            _ => false,
        }
    }
}

/// Whether a generation service message reports an oversized input
pub fn is_overflow_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("payload size exceeds the limit")
        || message.contains("context length")
        || message.contains("context window")
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Convert anyhow errors to PipelineError
impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::BudgetExceeded {
            chars: 25000,
            detail: "context length exceeded".to_string(),
        };
        assert!(err.to_string().contains("25000"));
        assert!(err.to_string().contains("context length exceeded"));
    }

    #[test]
    fn test_source_lookup_display() {
        let err = PipelineError::SourceLookup {
            source_name: "Wikipedia".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("Wikipedia"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PipelineError::Generation("503".into()).is_retryable());
        assert!(!PipelineError::Timeout { duration_ms: 10 }.is_retryable());
        assert!(!PipelineError::Configuration("missing".into()).is_retryable());
        assert!(!PipelineError::Generation("context length exceeded".into()).is_retryable());
    }

    #[test]
    fn test_context_overflow_detection() {
        let err = PipelineError::Generation("input exceeds Context Length of model".into());
        assert!(err.is_context_overflow());

        let err = PipelineError::Generation("model not found".into());
        assert!(!err.is_context_overflow());

        let err = PipelineError::BudgetExceeded {
            chars: 2,
            detail: "too long".to_string(),
        };
        assert!(err.is_context_overflow());
    }
}
