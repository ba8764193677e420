pub mod ingest;
pub mod orchestrator;
pub mod retriever;

pub use ingest::{IngestReport, IngestService, SourceFailure};
pub use orchestrator::ConversationOrchestrator;
pub use retriever::Retriever;
