use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use serde::Serialize;

use crate::capability::{Capability, Hit, Retrieved};
use crate::error::{Error, SourceError};
use crate::registry::{Registry, RegistryEntry};

// ── Config ─────────────────────────────────────────────────────────────────

/// How a [`Router`] treats its sources.
#[derive(Debug, Clone, Default, bon::Builder)]
pub struct RouterConfig {
    /// Skip failing sources and report them in
    /// [`AggregateResponse::failures`] instead of failing the whole query.
    #[builder(default)]
    pub continue_on_source_error: bool,
    /// Per-source deadline. A source exceeding it counts as failed.
    pub source_timeout: Option<Duration>,
    /// Truncate the merged list to this many results.
    pub top_k: Option<usize>,
}

// ── Results ────────────────────────────────────────────────────────────────

/// One item of a merged aggregate result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub source_id: String,
    /// Registry ids from this router down to the leaf; `path[0] == source_id`.
    pub path: Vec<String>,
    pub score: f32,
    pub payload: String,
}

/// A source skipped under continue-on-error.
#[derive(Debug)]
pub struct SourceFailure {
    /// Registry ids from this router down to the failing source.
    pub path: Vec<String>,
    pub error: SourceError,
}

impl SourceFailure {
    pub fn source_id(&self) -> &str {
        self.path.first().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct AggregateResponse {
    pub results: Vec<QueryResult>,
    pub failures: Vec<SourceFailure>,
}

// ── Router ─────────────────────────────────────────────────────────────────

/// Fans a query out to every source in a [`Registry`] and merges the answers.
///
/// A router is itself a [`Capability`], so it can be registered inside
/// another router.
pub struct Router {
    registry: Arc<Registry>,
    config: RouterConfig,
}

impl Router {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_config(registry, RouterConfig::default())
    }

    pub fn with_config(registry: Arc<Registry>, config: RouterConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Run `query` against every registered source, each limited to
    /// `per_source_limit` hits.
    ///
    /// Sources are polled concurrently; the merged order depends only on
    /// scores and registration order. Dropping the returned future drops
    /// every in-flight source query.
    pub async fn query(
        &self,
        query: &str,
        per_source_limit: usize,
    ) -> Result<AggregateResponse, Error> {
        let mut response = self.fan_out(query, per_source_limit).await?;
        if let Some(k) = self.config.top_k {
            response.results.truncate(k);
        }
        Ok(response)
    }

    async fn fan_out(&self, query: &str, limit: usize) -> Result<AggregateResponse, Error> {
        let entries = self.registry.snapshot();
        tracing::debug!(sources = entries.len(), limit, "fanning out query");

        if !self.config.continue_on_source_error {
            let outcomes = try_join_all(entries.iter().map(|entry| async move {
                self.query_source(entry, query, limit)
                    .await
                    .map(|retrieved| (entry, retrieved))
                    .map_err(|cause| Error::SourceQuery {
                        source_id: entry.id.clone(),
                        cause,
                    })
            }))
            .await?;
            return Ok(merge(outcomes, limit));
        }

        let settled = join_all(entries.iter().map(|entry| async move {
            (entry, self.query_source(entry, query, limit).await)
        }))
        .await;
        let mut succeeded = Vec::with_capacity(settled.len());
        let mut failures = Vec::new();
        for (entry, outcome) in settled {
            match outcome {
                Ok(retrieved) => succeeded.push((entry, retrieved)),
                Err(error) => {
                    tracing::warn!(source = %entry.id, %error, "skipping failed source");
                    failures.push(SourceFailure {
                        path: vec![entry.id.clone()],
                        error,
                    });
                }
            }
        }
        let mut response = merge(succeeded, limit);
        failures.append(&mut response.failures);
        response.failures = failures;
        Ok(response)
    }

    async fn query_source(
        &self,
        entry: &RegistryEntry,
        query: &str,
        limit: usize,
    ) -> Result<Retrieved, SourceError> {
        let call = entry.capability.query(query, limit);
        match self.config.source_timeout {
            Some(deadline) => match tokio::time::timeout(deadline, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(source = %entry.id, ?deadline, "source timed out");
                    Err(SourceError::Timeout(deadline))
                }
            },
            None => call.await,
        }
    }
}

#[async_trait]
impl Capability for Router {
    async fn query(&self, query: &str, limit: usize) -> Result<Retrieved, SourceError> {
        let mut response = self.fan_out(query, limit).await?;
        response
            .results
            .truncate(self.config.top_k.map_or(limit, |k| k.min(limit)));
        Ok(Retrieved {
            hits: response
                .results
                .into_iter()
                .map(|r| Hit {
                    score: r.score,
                    payload: r.payload,
                    path: r.path,
                })
                .collect(),
            failures: response.failures,
        })
    }
}

// ── Merge ──────────────────────────────────────────────────────────────────

/// Concatenate per-source hits in registration order and stable-sort by score.
/// Each source contributes at most `limit` hits. Equal scores keep
/// registration order; NaN sorts last.
fn merge(outcomes: Vec<(&RegistryEntry, Retrieved)>, limit: usize) -> AggregateResponse {
    let mut response = AggregateResponse::default();
    for (entry, retrieved) in outcomes {
        if retrieved.hits.len() > limit {
            tracing::debug!(
                source = %entry.id,
                returned = retrieved.hits.len(),
                limit,
                "capping source hits"
            );
        }
        response
            .results
            .extend(retrieved.hits.into_iter().take(limit).map(|hit| QueryResult {
                source_id: entry.id.clone(),
                path: prefixed(&entry.id, hit.path),
                score: hit.score,
                payload: hit.payload,
            }));
        response
            .failures
            .extend(retrieved.failures.into_iter().map(|f| SourceFailure {
                path: prefixed(&entry.id, f.path),
                error: f.error,
            }));
    }
    response.results.sort_by(|a, b| by_score_desc(a.score, b.score));
    tracing::debug!(results = response.results.len(), "merged results");
    response
}

fn prefixed(id: &str, rest: Vec<String>) -> Vec<String> {
    let mut path = Vec::with_capacity(rest.len() + 1);
    path.push(id.to_string());
    path.extend(rest);
    path
}

fn by_score_desc(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_sorts_after_real_scores() {
        let mut scores = vec![f32::NAN, 0.1, 0.9, f32::NAN, -1.0];
        scores.sort_by(|a, b| by_score_desc(*a, *b));
        assert_eq!(&scores[..3], &[0.9f32, 0.1, -1.0]);
        assert!(scores[3].is_nan() && scores[4].is_nan());
    }

    #[test]
    fn builder_defaults_are_fail_fast_without_deadline() {
        let config = RouterConfig::builder().build();
        assert!(!config.continue_on_source_error);
        assert!(config.source_timeout.is_none());
        assert!(config.top_k.is_none());

        let config = RouterConfig::builder()
            .continue_on_source_error(true)
            .source_timeout(Duration::from_millis(250))
            .top_k(3)
            .build();
        assert!(config.continue_on_source_error);
        assert_eq!(config.source_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.top_k, Some(3));
    }

    #[test]
    fn prefixed_puts_id_first() {
        assert_eq!(prefixed("a", vec![]), vec!["a"]);
        assert_eq!(prefixed("a", vec!["b".into(), "c".into()]), vec!["a", "b", "c"]);
    }
}
