//! Question router
//!
//! One classification call per question. The raw label is normalized and
//! matched against category tokens in a fixed order; anything the router
//! cannot understand, including a failed call, is `Unsupported`.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::deadline::Deadline;
use crate::llm::{GenerationRequest, Generator, PromptKind};
use crate::prompts;
use crate::types::{Question, RoutingDecision};

/// Normalized tokens that select the grounded track
const GROUNDED_TOKENS: &[&str] = &["documentcorpus", "corpus", "document"];

/// Normalized tokens that select the open-domain track
const OPEN_DOMAIN_TOKENS: &[&str] = &["generalknowledge", "general", "knowledge", "news"];

/// Case-fold and drop whitespace and punctuation
pub fn normalize_label(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Map a raw classifier label to a routing decision
pub fn match_label(raw: &str) -> RoutingDecision {
    let label = normalize_label(raw);
    if label.is_empty() {
        return RoutingDecision::Unsupported;
    }

    if GROUNDED_TOKENS.iter().any(|t| label.contains(t)) {
        RoutingDecision::Grounded
    } else if OPEN_DOMAIN_TOKENS.iter().any(|t| label.contains(t)) {
        RoutingDecision::OpenDomain
    } else {
        RoutingDecision::Unsupported
    }
}

/// Classifies questions into tracks
#[derive(Clone)]
pub struct Router {
    generator: Arc<dyn Generator>,
}

impl Router {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Classify one question. Never fails.
    pub async fn classify(&self, question: &Question, deadline: &Deadline) -> RoutingDecision {
        let request = GenerationRequest::new(
            PromptKind::Classify,
            prompts::classification(question.as_str()),
        );

        match deadline.run(self.generator.generate(&request)).await {
            Ok(raw) => {
                let decision = match_label(&raw);
                debug!(label = raw.trim(), "classifier output");
                if decision == RoutingDecision::Unsupported {
                    info!(label = raw.trim(), "label not recognised, routing to fallback");
                } else {
                    info!(?decision, "question routed");
                }
                decision
            }
            Err(e) => {
                warn!(error = %e, "classification failed, routing to fallback");
                RoutingDecision::Unsupported
            }
        }
    }
}
