use crate::domain::{errors::PipelineError, Document, GenerationEvent};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

/// Incrementally consumed event sequence from one generation call.
///
/// Finite per call; dropping it closes the underlying remote stream.
pub type GenerationStream =
    Pin<Box<dyn Stream<Item = Result<GenerationEvent, PipelineError>> + Send>>;

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Query-generation-only mode: expand an utterance into zero or more
    /// search queries. Zero means the turn needs no retrieval.
    async fn plan_queries(
        &self,
        utterance: &str,
        session_id: Uuid,
    ) -> Result<Vec<String>, PipelineError>;

    /// Grounded generation over the attached documents. Citation events
    /// reference documents by position in `documents`.
    async fn generate_grounded(
        &self,
        utterance: &str,
        documents: &[Document],
        session_id: Uuid,
    ) -> Result<GenerationStream, PipelineError>;

    /// Plain generation, no documents attached; the stream carries text
    /// events only.
    async fn generate_plain(
        &self,
        utterance: &str,
        session_id: Uuid,
    ) -> Result<GenerationStream, PipelineError>;
}
