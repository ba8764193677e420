mod chat;
mod embedding;
mod fetcher;
mod reranker;
mod vector_index;

pub use chat::{ChatService, GenerationStream};
pub use embedding::{EmbeddingMode, EmbeddingService};
pub use fetcher::SourceFetcher;
pub use reranker::{RerankHit, RerankService};
pub use vector_index::{AnnMatch, VectorIndex};
