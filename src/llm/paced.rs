//! Paced, retrying generation
//!
//! Consecutive calls to a local model server are spaced by a minimum
//! interval and transient failures are retried with backoff.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::Result;
use crate::llm::generator::{GenerationRequest, Generator};
use crate::llm::retry::RetryPolicy;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Minimum spacing between outbound calls
#[derive(Clone, Default)]
pub struct Pacer {
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl Pacer {
    /// One call per `interval`; a zero interval disables pacing
    pub fn new(interval: Duration) -> Self {
        Self {
            limiter: Quota::with_period(interval).map(|quota| Arc::new(RateLimiter::direct(quota))),
        }
    }

    pub fn disabled() -> Self {
        Self { limiter: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait until the next call is allowed
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Generator wrapper adding pacing and retry
#[derive(Debug, Clone)]
pub struct PacedGenerator<G> {
    inner: G,
    pacer: Pacer,
    retry: RetryPolicy,
}

impl<G: Generator> PacedGenerator<G> {
    pub fn new(inner: G, pacer: Pacer, retry: RetryPolicy) -> Self {
        Self {
            inner,
            pacer,
            retry,
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: Generator> Generator for PacedGenerator<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.retry
            .execute(|| async {
                self.pacer.wait().await;
                tracing::trace!(kind = %request.kind, prompt_chars = request.prompt.len(), "generation call");
                self.inner.generate(request).await
            })
            .await
    }
}
