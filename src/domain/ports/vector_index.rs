use crate::domain::DocId;

/// One approximate-nearest-neighbor match, nearest first.
///
/// `distance` is the index's internal metric value; smaller is closer. Its
/// only contract is that candidate order follows it ascending.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnMatch {
    pub doc: DocId,
    pub distance: f32,
}

/// Approximate nearest-neighbor search over the corpus embeddings.
///
/// Search is local and synchronous; the index is immutable once built and
/// may be read from many tasks without locking.
pub trait VectorIndex: Send + Sync {
    /// The `top_k` nearest vectors to `query` by inner product, nearest
    /// first. May return fewer than `top_k` on a small corpus.
    fn search(&self, query: &[f32], top_k: usize) -> Vec<AnnMatch>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dimension(&self) -> usize;
}
