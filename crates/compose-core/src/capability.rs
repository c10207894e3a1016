use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::router::SourceFailure;

/// A single scored item returned by a capability.
///
/// `path` is the provenance trail below the capability that produced the hit:
/// empty for leaf sources, the chain of registry ids for nested routers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub score: f32,
    pub payload: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
}

impl Hit {
    pub fn new(score: f32, payload: impl Into<String>) -> Self {
        Self {
            score,
            payload: payload.into(),
            path: Vec::new(),
        }
    }
}

/// What a capability hands back for one query.
///
/// Leaf sources only fill `hits`. Nested routers running in
/// continue-on-error mode also report the sources they skipped, so the
/// degradation stays visible to the outermost caller.
#[derive(Debug, Default)]
pub struct Retrieved {
    pub hits: Vec<Hit>,
    pub failures: Vec<SourceFailure>,
}

impl From<Vec<Hit>> for Retrieved {
    fn from(hits: Vec<Hit>) -> Self {
        Self {
            hits,
            failures: Vec::new(),
        }
    }
}

/// Anything that can answer a query with scored results.
///
/// Retrievers, query engines and [`Router`](crate::Router)s all implement this,
/// which is what lets a router be registered inside another router.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Return at most `limit` hits for `query`.
    async fn query(&self, query: &str, limit: usize) -> Result<Retrieved, SourceError>;
}
