#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use compose_core::{Capability, Hit, Retrieved, SourceError};

/// Test source returning fixed scores, optionally after a delay or with an error.
pub struct Scripted {
    pub name: String,
    pub scores: Vec<f32>,
    pub delay: Option<Duration>,
    pub fail: Option<String>,
    pub calls: AtomicUsize,
    pub dropped_in_flight: Arc<AtomicBool>,
    pub finished: Arc<AtomicBool>,
}

impl Scripted {
    pub fn scores(name: &str, scores: &[f32]) -> Self {
        Self {
            name: name.to_string(),
            scores: scores.to_vec(),
            delay: None,
            fail: None,
            calls: AtomicUsize::new(0),
            dropped_in_flight: Arc::new(AtomicBool::new(false)),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            fail: Some(message.to_string()),
            ..Self::scores(name, &[])
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn arc(self) -> Arc<dyn Capability> {
        Arc::new(self)
    }

    /// Keep a typed handle so tests can inspect the counters afterwards.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

struct InFlight {
    dropped: Arc<AtomicBool>,
    armed: bool,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.armed {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Capability for Scripted {
    async fn query(&self, query: &str, limit: usize) -> Result<Retrieved, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut guard = InFlight {
            dropped: self.dropped_in_flight.clone(),
            armed: true,
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        guard.armed = false;
        self.finished.store(true, Ordering::SeqCst);
        if let Some(message) = &self.fail {
            return Err(SourceError::msg(message.clone()));
        }
        Ok(self
            .scores
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, &score)| Hit::new(score, format!("{}:{i}:{query}", self.name)))
            .collect::<Vec<_>>()
            .into())
    }
}

pub fn payloads(results: &[compose_core::QueryResult]) -> Vec<String> {
    results.iter().map(|r| r.payload.clone()).collect()
}
