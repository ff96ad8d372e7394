//! Escalation chain driver
//!
//! Sources are tried strictly in order. Each attempt either produces an
//! accepted answer, which ends the chain, or a rejected/errored record and
//! a transition to the next source. Nothing is called for sources after
//! the accepted one.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::deadline::Deadline;
use crate::escalation::gate::{self, GateConfig, RelevanceVerdict};
use crate::escalation::source::KnowledgeSource;
use crate::llm::{GenerationRequest, Generator, PromptKind};
use crate::prompts;
use crate::types::{AnswerResult, Question, RejectReason, SourceAttempt, SourceLabel, Track};

/// Position of the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainState {
    /// About to try the source at this index
    Trying(usize),
    /// Source `index` produced an accepted answer
    Accepted {
        index: usize,
        source: String,
        answer: String,
    },
    /// Every source was tried without acceptance
    Exhausted,
}

impl ChainState {
    /// Initial state for a chain of `len` sources
    pub fn start(len: usize) -> Self {
        if len == 0 {
            ChainState::Exhausted
        } else {
            ChainState::Trying(0)
        }
    }

    /// Transition after the attempt for the current source
    pub fn next(self, attempt: &SourceAttempt, len: usize) -> Self {
        match self {
            ChainState::Trying(index) => match (&attempt.outcome, &attempt.text) {
                (crate::types::AttemptOutcome::Accepted, Some(answer)) => ChainState::Accepted {
                    index,
                    source: attempt.source.clone(),
                    answer: answer.clone(),
                },
                _ if index + 1 < len => ChainState::Trying(index + 1),
                _ => ChainState::Exhausted,
            },
            terminal => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChainState::Trying(_))
    }
}

/// Ordered open-domain sources behind one acceptance gate
#[derive(Clone)]
pub struct EscalationChain {
    sources: Vec<Arc<dyn KnowledgeSource>>,
    generator: Arc<dyn Generator>,
    gate: GateConfig,
    lookup_timeout: Option<Duration>,
}

impl EscalationChain {
    pub fn new(generator: Arc<dyn Generator>, gate: GateConfig) -> Self {
        Self {
            sources: Vec::new(),
            generator,
            gate,
            lookup_timeout: None,
        }
    }

    /// Bound each source lookup on its own so a hung source still leaves
    /// time for the next one
    pub fn with_lookup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Append a source; order of calls is escalation order
    pub fn with_source(mut self, source: Arc<dyn KnowledgeSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Try sources in order until one is accepted. Never fails.
    pub async fn resolve(&self, question: &Question, deadline: &Deadline) -> AnswerResult {
        let mut attempts = Vec::new();
        let mut state = ChainState::start(self.sources.len());

        while let ChainState::Trying(index) = state {
            let source = &self.sources[index];
            let attempt = self.attempt(source.as_ref(), question, deadline).await;
            log_attempt(index, &attempt);
            state = state.next(&attempt, self.sources.len());
            attempts.push(attempt);
        }

        match state {
            ChainState::Accepted { source, answer, .. } => {
                AnswerResult::new(answer, SourceLabel::OpenDomain { source }, Track::OpenDomain)
                    .with_attempts(attempts)
            }
            _ => {
                let attempted: Vec<String> = attempts.iter().map(|a| a.source.clone()).collect();
                warn!(?attempted, "no source produced an accepted answer");
                AnswerResult::new(
                    exhausted_message(question, &attempted),
                    SourceLabel::SourcesExhausted { attempted },
                    Track::OpenDomain,
                )
                .with_attempts(attempts)
            }
        }
    }

    /// One source through lookup, screen, relevance and extraction
    async fn attempt(&self, source: &dyn KnowledgeSource, question: &Question, deadline: &Deadline) -> SourceAttempt {
        let name = source.name();

        let lookup_deadline = match self.lookup_timeout {
            Some(limit) => deadline.capped(limit),
            None => *deadline,
        };

        let raw = match lookup_deadline.run(source.lookup(question.as_str())).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return SourceAttempt::rejected(name, RejectReason::EmptyResult),
            Err(e) => return SourceAttempt::errored(name, e.to_string()),
        };

        if let Err(reason) = gate::screen_passage(&raw, source.no_result_markers(), self.gate.min_passage_chars) {
            return SourceAttempt::rejected(name, reason);
        }

        let passage = source.clean(&raw);
        if passage.is_empty() {
            return SourceAttempt::rejected(name, RejectReason::EmptyResult);
        }

        let relevance = GenerationRequest::new(
            PromptKind::Relevance,
            prompts::relevance(
                question.as_str(),
                gate::excerpt(&passage, self.gate.relevance_excerpt_chars),
            ),
        );
        let verdict = match deadline.run(self.generator.generate(&relevance)).await {
            Ok(response) => match gate::parse_relevance(&response) {
                RelevanceVerdict::Relevant => None,
                RelevanceVerdict::Irrelevant => Some(RejectReason::Irrelevant),
                RelevanceVerdict::Ambiguous => Some(RejectReason::AmbiguousRelevance {
                    response: response.trim().to_string(),
                }),
            },
            Err(e) => return SourceAttempt::errored(name, e.to_string()),
        };
        if let Some(reason) = verdict {
            return SourceAttempt::rejected(name, reason);
        }

        let extraction = GenerationRequest::new(
            PromptKind::Extract,
            prompts::extraction(question.as_str(), &passage, source.passage_kind()),
        );
        let answer = match deadline.run(self.generator.generate(&extraction)).await {
            Ok(answer) => answer,
            Err(e) => return SourceAttempt::errored(name, e.to_string()),
        };

        match gate::screen_answer(&answer, self.gate.min_answer_chars) {
            Ok(()) => SourceAttempt::accepted(name, answer.trim()),
            Err(reason) => SourceAttempt::rejected(name, reason),
        }
    }
}

fn log_attempt(index: usize, attempt: &SourceAttempt) {
    use crate::types::AttemptOutcome;
    match &attempt.outcome {
        AttemptOutcome::Accepted => info!(index, source = %attempt.source, "source accepted"),
        AttemptOutcome::Rejected { reason } => {
            info!(index, source = %attempt.source, %reason, "source rejected")
        }
        AttemptOutcome::Errored { message } => {
            warn!(index, source = %attempt.source, error = %message, "source errored")
        }
    }
}

/// Answer text when every source was exhausted
pub fn exhausted_message(question: &Question, attempted: &[String]) -> String {
    let sources = if attempted.is_empty() {
        "the available".to_string()
    } else {
        attempted.join(" and ")
    };
    format!(
        "Sorry, I could not find clear or sufficient information about '{}' in my searches of {} sources.",
        question, sources
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockEncyclopedia, MockGenerator, MockWebSearch};
    use crate::escalation::source::{EncyclopedicSource, WebResult, WebSearchSource};

    const PARIS: &str = "Page: Paris\nSummary: Paris is the capital and most populous city of France.";

    fn chain(generator: Arc<MockGenerator>, wiki: Arc<MockEncyclopedia>, web: Arc<MockWebSearch>) -> EscalationChain {
        EscalationChain::new(generator, GateConfig::default())
            .with_source(Arc::new(EncyclopedicSource::new(wiki)))
            .with_source(Arc::new(WebSearchSource::new(web, 5)))
    }

    #[test]
    fn test_state_transitions() {
        let rejected = SourceAttempt::rejected("a", RejectReason::Irrelevant);
        let accepted = SourceAttempt::accepted("b", "answer");

        assert_eq!(ChainState::start(0), ChainState::Exhausted);
        assert_eq!(ChainState::start(2), ChainState::Trying(0));
        assert_eq!(ChainState::Trying(0).next(&rejected, 2), ChainState::Trying(1));
        assert_eq!(ChainState::Trying(1).next(&rejected, 2), ChainState::Exhausted);
        assert_eq!(
            ChainState::Trying(1).next(&accepted, 2),
            ChainState::Accepted {
                index: 1,
                source: "b".to_string(),
                answer: "answer".to_string()
            }
        );
        assert_eq!(ChainState::Exhausted.next(&accepted, 2), ChainState::Exhausted);
        assert!(!ChainState::Trying(0).is_terminal());
    }

    #[tokio::test]
    async fn test_accepts_first_source_without_calling_web() {
        let generator = Arc::new(
            MockGenerator::new()
                .with_reply(PromptKind::Relevance, "YES")
                .with_reply(PromptKind::Extract, "Paris is the capital of France."),
        );
        let wiki = Arc::new(MockEncyclopedia::new(PARIS));
        let web = Arc::new(MockWebSearch::new());

        let result = chain(generator.clone(), wiki.clone(), web.clone())
            .resolve(&Question::new("What is the capital of France?"), &Deadline::none())
            .await;

        assert_eq!(result.label, SourceLabel::OpenDomain { source: "Wikipedia".into() });
        assert_eq!(result.answer, "Paris is the capital of France.");
        assert_eq!(result.attempts.len(), 1);
        assert_eq!(web.call_count(), 0);
        assert_eq!(generator.calls_of(PromptKind::Relevance).len(), 1);
        assert_eq!(generator.calls_of(PromptKind::Extract).len(), 1);
    }

    #[tokio::test]
    async fn test_relevance_sees_cleaned_excerpt() {
        let generator = Arc::new(
            MockGenerator::new()
                .with_reply(PromptKind::Relevance, "YES")
                .with_reply(PromptKind::Extract, "Paris is the capital of France."),
        );
        let wiki = Arc::new(MockEncyclopedia::new(PARIS));

        chain(generator.clone(), wiki, Arc::new(MockWebSearch::new()))
            .resolve(&Question::new("capital of France"), &Deadline::none())
            .await;

        let prompt = &generator.calls_of(PromptKind::Relevance)[0];
        assert!(prompt.contains("Paris is the capital"));
        assert!(!prompt.contains("Page: Paris"));
    }

    #[tokio::test]
    async fn test_escalates_to_web_on_empty_encyclopedia() {
        let generator = Arc::new(
            MockGenerator::new()
                .with_reply(PromptKind::Relevance, "Yes")
                .with_reply(PromptKind::Extract, "Inflation was 3.1% in May according to the statistics office."),
        );
        let wiki = Arc::new(MockEncyclopedia::new(""));
        let web = Arc::new(MockWebSearch::new().with_results(vec![WebResult::new(
            "May inflation",
            "Annual inflation was 3.1% in May, the statistics office said on Monday.",
        )]));

        let result = chain(generator.clone(), wiki, web.clone())
            .resolve(&Question::new("latest inflation rate"), &Deadline::none())
            .await;

        assert_eq!(result.label, SourceLabel::OpenDomain { source: "Web Search".into() });
        assert_eq!(result.attempts.len(), 2);
        assert_eq!(
            result.attempts[0],
            SourceAttempt::rejected("Wikipedia", RejectReason::EmptyResult)
        );
        assert_eq!(web.call_count(), 1);
        assert_eq!(generator.calls_of(PromptKind::Relevance).len(), 1);
    }

    #[tokio::test]
    async fn test_marker_rejects_without_generation() {
        let generator = Arc::new(MockGenerator::new());
        let wiki = Arc::new(MockEncyclopedia::new(crate::escalation::wikipedia::NO_RESULT_TEXT.repeat(3)));
        let web = Arc::new(MockWebSearch::new());

        let result = chain(generator.clone(), wiki, web)
            .resolve(&Question::new("q"), &Deadline::none())
            .await;

        assert!(matches!(
            result.attempts[0].outcome,
            crate::types::AttemptOutcome::Rejected { reason: RejectReason::NoResultMarker { .. } }
        ));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_names_attempted_sources() {
        let generator = Arc::new(MockGenerator::new().with_reply(PromptKind::Relevance, "NO"));
        let wiki = Arc::new(MockEncyclopedia::new(PARIS));
        let web = Arc::new(MockWebSearch::new().failing("quota exceeded"));

        let result = chain(generator, wiki, web)
            .resolve(&Question::new("q"), &Deadline::none())
            .await;

        assert_eq!(
            result.label,
            SourceLabel::SourcesExhausted {
                attempted: vec!["Wikipedia".into(), "Web Search".into()]
            }
        );
        assert!(result.answer.contains("Wikipedia and Web Search"));
        assert_eq!(
            result.attempts[0],
            SourceAttempt::rejected("Wikipedia", RejectReason::Irrelevant)
        );
        assert!(matches!(
            result.attempts[1].outcome,
            crate::types::AttemptOutcome::Errored { .. }
        ));
    }

    #[tokio::test]
    async fn test_ambiguous_relevance_is_rejected() {
        let generator = Arc::new(MockGenerator::new().with_reply(PromptKind::Relevance, "Partially."));
        let wiki = Arc::new(MockEncyclopedia::new(PARIS));

        let result = chain(generator.clone(), wiki, Arc::new(MockWebSearch::new()))
            .resolve(&Question::new("q"), &Deadline::none())
            .await;

        assert_eq!(
            result.attempts[0],
            SourceAttempt::rejected(
                "Wikipedia",
                RejectReason::AmbiguousRelevance {
                    response: "Partially.".into()
                }
            )
        );
        assert!(generator.calls_of(PromptKind::Extract).is_empty());
    }

    #[tokio::test]
    async fn test_negative_extraction_advances() {
        let generator = Arc::new(
            MockGenerator::new()
                .with_reply(PromptKind::Relevance, "YES")
                .with_reply(PromptKind::Extract, prompts::EXTRACTION_NOT_FOUND),
        );
        let wiki = Arc::new(MockEncyclopedia::new(PARIS));

        let result = chain(generator, wiki, Arc::new(MockWebSearch::new()))
            .resolve(&Question::new("q"), &Deadline::none())
            .await;

        assert!(matches!(
            result.attempts[0].outcome,
            crate::types::AttemptOutcome::Rejected { reason: RejectReason::NegativeAnswer { .. } }
        ));
        assert!(matches!(result.label, SourceLabel::SourcesExhausted { .. }));
    }
}
