mod conversation;
mod document;
mod embedding;
mod event;

pub use conversation::{ConversationSession, ConversationTurn, Role};
pub use document::{chunk_passages, Corpus, DocId, Document, RetrievedDocument, SourcePassage, SourceSpec};
pub use embedding::Embedding;
pub use event::{Citation, CitationSpan, GenerationEvent, TurnEvent, TurnOutcome};
