//! Retrieval-augmented conversational pipeline.
//!
//! A corpus is fetched, chunked, embedded and indexed once; each
//! conversation turn then plans retrieval, searches and reranks the index,
//! and streams back a grounded, cited answer.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod pipeline;

pub use application::{ConversationOrchestrator, IngestReport, IngestService, Retriever};
pub use domain::{
    Citation, ConversationSession, Corpus, DocId, Document, PipelineError, RetrievedDocument,
    SourceSpec, TurnEvent, TurnOutcome,
};
pub use infrastructure::{CohereClient, Config, HnswVectorIndex, HttpSourceFetcher};
pub use pipeline::{KnowledgeBase, RagPipeline};
