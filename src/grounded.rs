//! Grounded answerer
//!
//! Answers strictly from an evidence set. "Found" and "not found" are both
//! successful outcomes with different labels; a failed generation call is
//! a labelled result too.

use std::sync::Arc;
use tracing::{info, warn};

use crate::deadline::Deadline;
use crate::llm::{GenerationRequest, Generator, PromptKind};
use crate::prompts;
use crate::retrieval::EvidenceSet;
use crate::types::{AnswerResult, Question, SourceLabel, Track};

/// Default minimum length of a plausible answer
pub const DEFAULT_MIN_ANSWER_CHARS: usize = 15;

/// Shown when the corpus returned nothing for any query variant
pub const NO_DOCUMENTS_MESSAGE: &str = "No document related to this question was found in the archive.";

/// Shown when the model answered with the sentinel or too briefly
pub const NOT_FOUND_MESSAGE: &str = "No specific information on this topic was found in the provided documents.";

/// Shown when every candidate chunk is larger than the context budget
pub const EVIDENCE_TOO_LARGE_MESSAGE: &str =
    "Sorry, the relevant documents found for this question are too long to process at once.";

/// Shown when the generation service failed
pub const GENERATION_UNAVAILABLE_MESSAGE: &str =
    "Sorry, a technical problem occurred while composing an answer from the documents.";

/// Leading words of the sentinel; models often reword the rest of it
const NOT_FOUND_CORE: &str = "no specific information";

/// Lowercased words joined by single spaces, punctuation dropped
fn normalize_words(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a raw answer is a "not found" signal
pub fn is_not_found(answer: &str, min_chars: usize) -> bool {
    let trimmed = answer.trim();
    if trimmed.chars().count() < min_chars {
        return true;
    }

    let words = normalize_words(trimmed);
    words.contains(&normalize_words(prompts::NOT_FOUND_SENTINEL)) || words.contains(NOT_FOUND_CORE)
}

/// Evidence-constrained answer generation
#[derive(Clone)]
pub struct GroundedAnswerer {
    generator: Arc<dyn Generator>,
    min_answer_chars: usize,
}

impl GroundedAnswerer {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            min_answer_chars: DEFAULT_MIN_ANSWER_CHARS,
        }
    }

    pub fn with_min_answer_chars(mut self, min_answer_chars: usize) -> Self {
        self.min_answer_chars = min_answer_chars;
        self
    }

    /// Answer from `evidence`. Never fails.
    pub async fn answer(&self, question: &Question, evidence: &EvidenceSet, deadline: &Deadline) -> AnswerResult {
        if evidence.exceeded_budget() {
            warn!(
                dropped = evidence.dropped(),
                budget = evidence.budget(),
                "every evidence chunk exceeds the context budget"
            );
            return result(EVIDENCE_TOO_LARGE_MESSAGE, SourceLabel::EvidenceTooLarge);
        }

        if evidence.is_empty() {
            info!("no documents retrieved");
            return result(NO_DOCUMENTS_MESSAGE, SourceLabel::NoDocuments);
        }

        let request = GenerationRequest::new(
            PromptKind::GroundedAnswer,
            prompts::grounded_answer(question.as_str(), &evidence.render()),
        );

        match deadline.run(self.generator.generate(&request)).await {
            Ok(answer) if is_not_found(&answer, self.min_answer_chars) => {
                info!(chars = answer.trim().chars().count(), "answer not found in evidence");
                result(NOT_FOUND_MESSAGE, SourceLabel::GroundedNotFound)
            }
            Ok(answer) => {
                info!(chars = answer.trim().chars().count(), excerpts = evidence.len(), "grounded answer");
                result(answer.trim(), SourceLabel::GroundedAnswer)
            }
            Err(e) if e.is_context_overflow() => {
                warn!(error = %e, "generation rejected the evidence as too large");
                result(EVIDENCE_TOO_LARGE_MESSAGE, SourceLabel::EvidenceTooLarge)
            }
            Err(e) => {
                warn!(error = %e, "grounded generation failed");
                result(GENERATION_UNAVAILABLE_MESSAGE, SourceLabel::GenerationUnavailable)
            }
        }
    }
}

fn result(answer: &str, label: SourceLabel) -> AnswerResult {
    AnswerResult::new(answer, label, Track::Grounded)
}
