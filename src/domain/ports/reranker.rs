use crate::domain::errors::PipelineError;
use async_trait::async_trait;

/// One reranked candidate: its position in the candidate list handed to
/// [`RerankService::rerank`] plus the cross-encoder relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankHit {
    pub original_index: usize,
    pub score: f32,
}

/// Second-stage scorer that reorders a candidate set against the full query
/// text.
#[async_trait]
pub trait RerankService: Send + Sync {
    /// Score `candidates` against `query` and return at most `top_n` hits
    /// ordered by descending score.
    async fn rerank(
        &self,
        query: &str,
        candidates: &[&str],
        top_n: usize,
    ) -> Result<Vec<RerankHit>, PipelineError>;
}
