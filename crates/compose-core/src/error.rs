use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("source {0:?} is already registered")]
    DuplicateId(String),
    #[error("source {0:?} not found")]
    NotFound(String),
    #[error("cannot serialize registry: {0}")]
    Serialization(String),
    #[error("no capability supplied for source {0:?}")]
    MissingCapability(String),
    #[error("capabilities supplied for sources not in the snapshot: {0:?}")]
    UnexpectedCapabilities(Vec<String>),
    #[error("source {source_id:?} failed: {cause}")]
    SourceQuery {
        source_id: String,
        #[source]
        cause: SourceError,
    },
    #[error("synthesis failed: {0}")]
    Synthesis(#[source] SourceError),
    #[error("no data directory available")]
    NoDataDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure reported by a single capability.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
    #[error(transparent)]
    Nested(Box<Error>),
}

impl SourceError {
    /// Wrap any backend error.
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        SourceError::Backend(err.into())
    }

    /// Backend failure carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        SourceError::Backend(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SourceError::Timeout(_))
    }
}

impl From<Error> for SourceError {
    fn from(err: Error) -> Self {
        SourceError::Nested(Box::new(err))
    }
}
