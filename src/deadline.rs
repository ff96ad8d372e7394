//! Per-question deadline
//!
//! One deadline is created when a question enters the pipeline and every
//! external call (classification, expansion, corpus search, source lookup,
//! relevance check, extraction, generation) runs under whatever time is
//! left. Expiry surfaces as `PipelineError::Timeout`, which each step
//! handles through its ordinary error path.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::errors::{PipelineError, Result};

/// Absolute deadline shared by all steps of one question
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Option<Instant>,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Some(Instant::now() + budget),
            budget,
        }
    }

    /// No deadline
    pub fn none() -> Self {
        Self {
            expires_at: None,
            budget: Duration::ZERO,
        }
    }

    /// Deadline from an optional budget
    pub fn from_budget(budget: Option<Duration>) -> Self {
        budget.map(Self::after).unwrap_or_else(Self::none)
    }

    /// Time left, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// The earlier of this deadline and `limit` from now
    pub fn capped(&self, limit: Duration) -> Self {
        let cap = Instant::now() + limit;
        match self.expires_at {
            Some(at) if at <= cap => *self,
            _ => Self {
                expires_at: Some(cap),
                budget: limit,
            },
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.remaining(), Some(left) if left.is_zero())
    }

    fn timeout_error(&self) -> PipelineError {
        PipelineError::Timeout {
            duration_ms: self.budget.as_millis() as u64,
        }
    }

    /// Run an external call under the remaining time
    pub async fn run<F, T>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.remaining() {
            None => call.await,
            Some(left) if left.is_zero() => Err(self.timeout_error()),
            Some(left) => tokio::time::timeout(left, call)
                .await
                .map_err(|_| self.timeout_error())?,
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}
