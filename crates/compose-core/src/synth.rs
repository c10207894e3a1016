use async_trait::async_trait;

use crate::error::{Error, SourceError};
use crate::router::{QueryResult, Router, SourceFailure};

/// Turns retrieved passages into a natural-language answer, typically by
/// prompting an LLM backend.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// `passages` are ordered best first.
    async fn synthesize(&self, query: &str, passages: &[String]) -> Result<String, SourceError>;
}

#[derive(Debug)]
pub struct Answer {
    pub text: String,
    /// The merged results the answer was synthesized from.
    pub sources: Vec<QueryResult>,
    pub failures: Vec<SourceFailure>,
}

impl Router {
    /// Aggregate query followed by synthesis over the merged payloads.
    pub async fn answer(
        &self,
        query: &str,
        per_source_limit: usize,
        synthesizer: &dyn Synthesizer,
    ) -> Result<Answer, Error> {
        let response = self.query(query, per_source_limit).await?;
        let passages: Vec<String> = response.results.iter().map(|r| r.payload.clone()).collect();
        tracing::debug!(passages = passages.len(), "synthesizing answer");
        let text = synthesizer
            .synthesize(query, &passages)
            .await
            .map_err(Error::Synthesis)?;
        Ok(Answer {
            text,
            sources: response.results,
            failures: response.failures,
        })
    }
}
