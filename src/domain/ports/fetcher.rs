use crate::domain::{errors::PipelineError, SourcePassage};
use async_trait::async_trait;

/// Fetches one source and partitions it into chunk-sized passages.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch_and_chunk(&self, url: &str) -> Result<Vec<SourcePassage>, PipelineError>;
}
