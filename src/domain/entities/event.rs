use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::entities::document::DocId;
use crate::domain::errors::PipelineError;

/// One event from a generation stream, as the chat service emits it.
///
/// Citation payloads reference documents by position in the list attached to
/// that call, not by durable handle; the orchestrator resolves positions
/// against the list it sent.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    Text(String),
    Citation(CitationSpan),
}

/// The raw, position-keyed citation payload of a [`GenerationEvent`].
#[derive(Debug, Clone, PartialEq)]
pub struct CitationSpan {
    pub start: usize,
    pub end: usize,
    pub quoted_text: String,
    pub document_indices: Vec<usize>,
}

/// A citation with document positions resolved to handles.
///
/// Offsets index into the turn's final answer text. Spans may arrive in any
/// order and may overlap; they are kept exactly as emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub start: usize,
    pub end: usize,
    pub quoted_text: String,
    pub document_ids: BTreeSet<DocId>,
}

/// One event of a conversation turn, surfaced to the caller as it happens.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    Text(String),
    Citation(Citation),
}

/// The assembled result of one turn, finalized exactly once when the
/// generation stream ends.
///
/// On a mid-stream error the text and citations delivered up to that point
/// are kept and `error` carries what interrupted the stream.
#[derive(Debug, Default)]
pub struct TurnOutcome {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub error: Option<PipelineError>,
}

impl TurnOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}
