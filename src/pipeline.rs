//! Question pipeline
//!
//! question -> router -> grounded | open-domain | fallback -> AnswerResult
//!
//! Collaborators are injected through `PipelineBuilder`. A missing
//! generator is the only construction error; a missing corpus or an empty
//! source list only makes the corresponding track answer via fallback.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Instrument};

use crate::cli::Config;
use crate::corpus::{Corpus, Embedder, QdrantCorpus};
use crate::deadline::Deadline;
use crate::errors::{PipelineError, Result};
use crate::escalation::{
    EncyclopedicSource, EscalationChain, GateConfig, KnowledgeSource, TavilyClient,
    WebSearchSource, WikipediaClient,
};
use crate::fallback;
use crate::grounded::{GroundedAnswerer, DEFAULT_MIN_ANSWER_CHARS};
use crate::llm::{Generator, OllamaClient, PacedGenerator, Pacer, RetryPolicy, Temperatures};
use crate::retrieval::{EvidenceRetriever, QueryExpander, RetrievalParams};
use crate::router::Router;
use crate::types::{AnswerResult, Question, RoutingDecision, SourceLabel, Track};

/// Shown when corpus search failed
pub const RETRIEVAL_FAILED_MESSAGE: &str =
    "Sorry, a technical problem occurred while searching the documents.";

/// Shown when the grounded track is selected without a corpus
pub const NO_CORPUS_MESSAGE: &str =
    "Sorry, this looks like a question about the document archive, but no document corpus is configured.";

/// Shown when the open-domain track is selected without any source
pub const NO_SOURCES_MESSAGE: &str =
    "Sorry, this looks like a general knowledge question, but no encyclopedia or web search source is enabled.";

/// Default number of query variants
pub const DEFAULT_MAX_QUERY_VARIANTS: usize = 5;

/// Assembles a `QuestionPipeline` from injected collaborators
pub struct PipelineBuilder {
    generator: Option<Arc<dyn Generator>>,
    corpus: Option<Arc<dyn Corpus>>,
    sources: Vec<Arc<dyn KnowledgeSource>>,
    retrieval: RetrievalParams,
    max_query_variants: usize,
    grounded_min_answer_chars: usize,
    gate: GateConfig,
    lookup_timeout: Option<Duration>,
    deadline: Option<Duration>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            generator: None,
            corpus: None,
            sources: Vec::new(),
            retrieval: RetrievalParams::default(),
            max_query_variants: DEFAULT_MAX_QUERY_VARIANTS,
            grounded_min_answer_chars: DEFAULT_MIN_ANSWER_CHARS,
            gate: GateConfig::default(),
            lookup_timeout: None,
            deadline: None,
        }
    }

    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn corpus(mut self, corpus: Arc<dyn Corpus>) -> Self {
        self.corpus = Some(corpus);
        self
    }

    /// Append an open-domain source; call order is escalation order
    pub fn source(mut self, source: Arc<dyn KnowledgeSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn retrieval(mut self, params: RetrievalParams) -> Self {
        self.retrieval = params;
        self
    }

    pub fn max_query_variants(mut self, max: usize) -> Self {
        self.max_query_variants = max;
        self
    }

    pub fn grounded_min_answer_chars(mut self, min: usize) -> Self {
        self.grounded_min_answer_chars = min;
        self
    }

    pub fn gate(mut self, gate: GateConfig) -> Self {
        self.gate = gate;
        self
    }

    /// Per-source lookup timeout, `None` for the question deadline only
    pub fn lookup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Per-question deadline, `None` for unbounded
    pub fn deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Wire the real adapters described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let ollama = OllamaClient::with_timeout(
            &config.ollama_url(),
            &config.ollama.model,
            Duration::from_secs(config.ollama.request_timeout_secs),
        )?
        .with_embedding_model(config.ollama.embedding_model.clone())
        .with_temperatures(Temperatures {
            classify: config.ollama.router_temperature,
            answer: config.ollama.answer_temperature,
        });

        let generator = PacedGenerator::new(
            ollama.clone(),
            Pacer::new(Duration::from_millis(config.pacing.min_call_interval_ms)),
            RetryPolicy::with_config(config.pacing.retry_attempts, config.pacing.retry_base_delay_ms),
        );

        let embedder: Arc<dyn Embedder> = Arc::new(ollama);
        let corpus = QdrantCorpus::connect(&config.corpus.qdrant_url, &config.corpus.collection, embedder)?;

        let mut builder = Self::new()
            .generator(Arc::new(generator))
            .corpus(Arc::new(corpus))
            .retrieval(RetrievalParams {
                top_k: config.retrieval.top_k,
                budget_chars: config.retrieval.context_budget_chars,
            })
            .max_query_variants(config.retrieval.max_query_variants)
            .grounded_min_answer_chars(config.grounded.min_answer_chars)
            .gate(GateConfig {
                min_passage_chars: config.escalation.min_passage_chars,
                relevance_excerpt_chars: config.escalation.relevance_excerpt_chars,
                min_answer_chars: config.escalation.min_answer_chars,
            })
            .lookup_timeout(config.lookup_timeout())
            .deadline(config.question_deadline());

        if config.escalation.wikipedia_enabled {
            let wikipedia = WikipediaClient::new(
                &config.wikipedia.language,
                config.wikipedia.top_k_results,
                config.wikipedia.doc_content_chars_max,
            )?;
            builder = builder.source(Arc::new(EncyclopedicSource::new(Arc::new(wikipedia))));
        }

        if config.escalation.web_search_enabled {
            match config.web_search_api_key() {
                Some(key) => {
                    let tavily = TavilyClient::new(key, config.web_search.max_results)?;
                    builder = builder.source(Arc::new(WebSearchSource::new(
                        Arc::new(tavily),
                        config.web_search.max_results,
                    )));
                }
                None => warn!(
                    env = %config.web_search.api_key_env,
                    "web search key not set, web search disabled"
                ),
            }
        }

        Ok(builder)
    }

    /// Fails only when no generator was supplied
    pub fn build(self) -> Result<QuestionPipeline> {
        let generator = self.generator.ok_or_else(|| {
            PipelineError::Configuration("a generation service is required".to_string())
        })?;

        let retriever = self.corpus.map(|corpus| {
            EvidenceRetriever::new(
                QueryExpander::new(generator.clone(), self.max_query_variants),
                corpus,
                self.retrieval,
            )
        });

        let chain = self
            .sources
            .into_iter()
            .fold(
                EscalationChain::new(generator.clone(), self.gate).with_lookup_timeout(self.lookup_timeout),
                |chain, source| chain.with_source(source),
            );

        Ok(QuestionPipeline {
            router: Router::new(generator.clone()),
            retriever,
            answerer: GroundedAnswerer::new(generator)
                .with_min_answer_chars(self.grounded_min_answer_chars),
            chain,
            deadline: self.deadline,
        })
    }
}

/// Routes and answers questions. Independent questions may be asked
/// concurrently; nothing is shared between them.
#[derive(Clone)]
pub struct QuestionPipeline {
    router: Router,
    retriever: Option<EvidenceRetriever>,
    answerer: GroundedAnswerer,
    chain: EscalationChain,
    deadline: Option<Duration>,
}

impl QuestionPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Names of the open-domain sources in escalation order
    pub fn source_names(&self) -> Vec<String> {
        self.chain.source_names()
    }

    pub fn has_corpus(&self) -> bool {
        self.retriever.is_some()
    }

    /// Answer one question. Never fails.
    pub async fn ask(&self, question: impl Into<Question>) -> AnswerResult {
        let question = question.into();
        let span = tracing::info_span!("ask", id = %uuid::Uuid::new_v4());
        self.answer(question).instrument(span).await
    }

    async fn answer(&self, question: Question) -> AnswerResult {
        if question.is_empty() {
            info!("empty question, answering with fallback");
            return fallback::respond(&question, None);
        }

        info!(question = %question, "question received");
        let deadline = Deadline::from_budget(self.deadline);
        let decision = self.router.classify(&question, &deadline).await;

        let result = match decision {
            RoutingDecision::Grounded => self.grounded(&question, &deadline).await,
            RoutingDecision::OpenDomain => self.open_domain(&question, &deadline).await,
            RoutingDecision::Unsupported => fallback::respond(&question, None),
        };

        info!(label = result.label.code(), track = %result.track, "question answered");
        result
    }

    async fn grounded(&self, question: &Question, deadline: &Deadline) -> AnswerResult {
        let Some(retriever) = &self.retriever else {
            warn!("grounded track selected but no corpus is configured");
            return fallback::respond(question, Some(NO_CORPUS_MESSAGE));
        };

        match retriever.retrieve(question, deadline).await {
            Ok(evidence) => self.answerer.answer(question, &evidence, deadline).await,
            Err(e) => {
                warn!(error = %e, "corpus retrieval failed");
                AnswerResult::new(RETRIEVAL_FAILED_MESSAGE, SourceLabel::RetrievalFailed, Track::Grounded)
            }
        }
    }

    async fn open_domain(&self, question: &Question, deadline: &Deadline) -> AnswerResult {
        if self.chain.is_empty() {
            warn!("open-domain track selected but no knowledge source is enabled");
            return fallback::respond(question, Some(NO_SOURCES_MESSAGE));
        }
        self.chain.resolve(question, deadline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::PromptKind;
    use crate::testing::MockGenerator;

    #[test]
    fn test_build_requires_generator() {
        let err = PipelineBuilder::new().build().err().unwrap();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_empty_question_makes_no_calls() {
        let generator = Arc::new(MockGenerator::new());
        let pipeline = PipelineBuilder::new().generator(generator.clone()).build().unwrap();

        let result = pipeline.ask("   ").await;
        assert_eq!(result.label, SourceLabel::Fallback);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_grounded_without_corpus_uses_custom_fallback() {
        let generator = Arc::new(MockGenerator::new().with_reply(PromptKind::Classify, "Document Corpus"));
        let pipeline = PipelineBuilder::new().generator(generator).build().unwrap();

        let result = pipeline.ask("What does article 4 say?").await;
        assert_eq!(result.label, SourceLabel::Fallback);
        assert_eq!(result.answer, NO_CORPUS_MESSAGE);
        assert!(!pipeline.has_corpus());
    }

    #[tokio::test]
    async fn test_open_domain_without_sources_uses_custom_fallback() {
        let generator = Arc::new(MockGenerator::new().with_reply(PromptKind::Classify, "General Knowledge"));
        let pipeline = PipelineBuilder::new().generator(generator).build().unwrap();

        let result = pipeline.ask("Who is Ada Lovelace?").await;
        assert_eq!(result.answer, NO_SOURCES_MESSAGE);
        assert!(pipeline.source_names().is_empty());
    }

    #[tokio::test]
    async fn test_from_config_orders_sources() {
        let mut config = Config::default();
        config.web_search.api_key_env = "ASKBUDDY_TEST_UNSET_KEY".to_string();
        let pipeline = PipelineBuilder::from_config(&config).unwrap().build().unwrap();

        assert_eq!(pipeline.source_names(), vec!["Wikipedia".to_string()]);
        assert!(pipeline.has_corpus());
    }
}
