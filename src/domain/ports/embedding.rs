use crate::domain::{errors::PipelineError, Embedding};
use async_trait::async_trait;

/// Which side of the retrieval asymmetry a text is embedded for.
///
/// Query and document embeddings are not interchangeable; callers must name
/// the mode explicitly on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingMode {
    Document,
    Query,
}

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed a batch of texts, order-preserving: the vector at position `i`
    /// corresponds to `texts[i]`.
    async fn embed(
        &self,
        texts: &[&str],
        mode: EmbeddingMode,
    ) -> Result<Vec<Embedding>, PipelineError>;

    fn dimension(&self) -> usize;
}
