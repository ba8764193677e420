use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle for a document: its position in the corpus, which is also
/// its position in the vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(pub usize);

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc_{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub text: String,
    pub source_url: String,
}

/// A source to ingest: one web page or file that the fetcher splits into
/// chunk-sized passages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub title: String,
    pub url: String,
}

impl SourceSpec {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// A chunk produced by a source fetcher, before it becomes a [`Document`].
#[derive(Debug, Clone)]
pub struct SourcePassage {
    pub text: String,
    pub title: Option<String>,
}

/// The chunked documents of one ingestion run, immutable once built.
///
/// Document handles are positions into this vector; the vector index built
/// from the corpus uses the same positions.
#[derive(Debug, Default)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a document, assigning it the next handle.
    pub fn push(&mut self, title: impl Into<String>, text: impl Into<String>, source_url: impl Into<String>) -> DocId {
        let id = DocId(self.documents.len());
        self.documents.push(Document {
            id,
            title: title.into(),
            text: text.into(),
            source_url: source_url.into(),
        });
        id
    }

    pub fn get(&self, id: DocId) -> Option<&Document> {
        self.documents.get(id.0)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// A read-only retrieval hit. Does not outlive the retrieval call that
/// produced it; the document is identified durably by `document.id`.
#[derive(Debug, Clone)]
pub struct RetrievedDocument {
    pub document: Document,
    pub rank: usize,
}

/// Splits passage text into chunks by paragraph boundaries.
///
/// Paragraphs are joined until they exceed `chunk_size`, then a new chunk
/// starts.
pub fn chunk_passages(text: &str, chunk_size: usize) -> Vec<String> {
    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs {
        let would_exceed = !current.is_empty() && current.len() + paragraph.len() + 2 > chunk_size;

        if would_exceed {
            chunks.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
