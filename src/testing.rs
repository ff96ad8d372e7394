//! Testing utilities
//!
//! Deterministic collaborators for driving the pipeline without a model
//! server, a vector store or network access. Every mock records its calls
//! so tests can assert which collaborators were (not) used.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::corpus::{ChunkStore, Corpus, EvidenceChunk};
use crate::errors::{PipelineError, Result};
use crate::escalation::{Encyclopedia, WebResult, WebSearch};
use crate::llm::{GenerationRequest, Generator, PromptKind};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Fail(String),
}

/// Generator with scripted replies per prompt kind.
///
/// Replies for one kind are consumed in order; the last one repeats.
/// A kind with no script fails like an unavailable service.
#[derive(Default)]
pub struct MockGenerator {
    scripts: Mutex<HashMap<PromptKind, VecDeque<Scripted>>>,
    delays: HashMap<PromptKind, Duration>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `kind`
    pub fn with_reply(self, kind: PromptKind, reply: impl Into<String>) -> Self {
        self.push(kind, Scripted::Reply(reply.into()))
    }

    /// Queue a failure for `kind`
    pub fn with_failure(self, kind: PromptKind, message: impl Into<String>) -> Self {
        self.push(kind, Scripted::Fail(message.into()))
    }

    /// Sleep before answering calls of `kind`
    pub fn with_delay(mut self, kind: PromptKind, delay: Duration) -> Self {
        self.delays.insert(kind, delay);
        self
    }

    /// Make every kind fail
    pub fn failing_everything(self, message: &str) -> Self {
        [
            PromptKind::Classify,
            PromptKind::ExpandQuery,
            PromptKind::GroundedAnswer,
            PromptKind::Relevance,
            PromptKind::Extract,
        ]
        .into_iter()
        .fold(self, |mock, kind| mock.with_failure(kind, message))
    }

    fn push(self, kind: PromptKind, scripted: Scripted) -> Self {
        lock(&self.scripts).entry(kind).or_default().push_back(scripted);
        self
    }

    /// Every request received, in order
    pub fn calls(&self) -> Vec<GenerationRequest> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Prompts received for one kind
    pub fn calls_of(&self, kind: PromptKind) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.prompt.clone())
            .collect()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        lock(&self.calls).push(request.clone());

        if let Some(delay) = self.delays.get(&request.kind) {
            tokio::time::sleep(*delay).await;
        }

        let next = {
            let mut scripts = lock(&self.scripts);
            scripts.get_mut(&request.kind).and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
        };

        match next {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail(message)) => Err(PipelineError::Generation(message)),
            None => Err(PipelineError::Generation(format!(
                "no scripted reply for {}",
                request.kind
            ))),
        }
    }
}

/// In-memory corpus with per-query results
#[derive(Default)]
pub struct MockCorpus {
    results: HashMap<String, Vec<EvidenceChunk>>,
    default_results: Vec<EvidenceChunk>,
    failure: Option<String>,
    searches: Mutex<Vec<(String, usize)>>,
    stored: Mutex<Vec<EvidenceChunk>>,
}

impl MockCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results for one exact query
    pub fn with_results(mut self, query: impl Into<String>, chunks: Vec<EvidenceChunk>) -> Self {
        self.results.insert(query.into(), chunks);
        self
    }

    /// Results for every query without its own entry
    pub fn with_default_results(mut self, chunks: Vec<EvidenceChunk>) -> Self {
        self.default_results = chunks;
        self
    }

    /// Every search fails
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// `(query, k)` of every search, in order
    pub fn search_calls(&self) -> Vec<(String, usize)> {
        lock(&self.searches).clone()
    }

    /// Chunks received through `ChunkStore`
    pub fn stored(&self) -> Vec<EvidenceChunk> {
        lock(&self.stored).clone()
    }
}

#[async_trait]
impl Corpus for MockCorpus {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<EvidenceChunk>> {
        lock(&self.searches).push((query.to_string(), k));

        if let Some(message) = &self.failure {
            return Err(PipelineError::Retrieval(message.clone()));
        }

        let mut hits = self
            .results
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.default_results.clone());
        hits.truncate(k);
        Ok(hits)
    }
}

#[async_trait]
impl ChunkStore for MockCorpus {
    async fn store(&self, chunks: Vec<EvidenceChunk>) -> Result<usize> {
        let count = chunks.len();
        lock(&self.stored).extend(chunks);
        Ok(count)
    }
}

/// Encyclopedia returning a fixed text
pub struct MockEncyclopedia {
    response: std::result::Result<String, String>,
    delay: Option<Duration>,
    queries: Mutex<Vec<String>>,
}

impl MockEncyclopedia {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            delay: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            delay: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before every lookup
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.queries).len()
    }

    pub fn queries(&self) -> Vec<String> {
        lock(&self.queries).clone()
    }
}

#[async_trait]
impl Encyclopedia for MockEncyclopedia {
    async fn lookup(&self, query: &str) -> Result<String> {
        lock(&self.queries).push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone().map_err(|reason| PipelineError::SourceLookup {
            source_name: "Wikipedia".to_string(),
            reason,
        })
    }
}

/// Web search returning fixed results
#[derive(Default)]
pub struct MockWebSearch {
    results: Vec<WebResult>,
    failure: Option<String>,
    delay: Option<Duration>,
    queries: Mutex<Vec<String>>,
}

impl MockWebSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, results: Vec<WebResult>) -> Self {
        self.results = results;
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Sleep before every search
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.queries).len()
    }
}

#[async_trait]
impl WebSearch for MockWebSearch {
    async fn search(&self, query: &str) -> Result<Vec<WebResult>> {
        lock(&self.queries).push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(reason) => Err(PipelineError::SourceLookup {
                source_name: "Web Search".to_string(),
                reason: reason.clone(),
            }),
            None => Ok(self.results.clone()),
        }
    }
}
