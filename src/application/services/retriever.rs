use std::cmp::Ordering;
use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    ports::{EmbeddingMode, EmbeddingService, RerankService, VectorIndex},
    Corpus, PipelineError, RetrievedDocument,
};

/// Two-stage retrieval: ANN candidate search, then cross-encoder reranking.
pub struct Retriever {
    embedding: Arc<dyn EmbeddingService>,
    reranker: Arc<dyn RerankService>,
    index: Arc<dyn VectorIndex>,
    corpus: Arc<Corpus>,
    retrieve_top_k: usize,
    rerank_top_k: usize,
}

impl Retriever {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        reranker: Arc<dyn RerankService>,
        index: Arc<dyn VectorIndex>,
        corpus: Arc<Corpus>,
        retrieve_top_k: usize,
        rerank_top_k: usize,
    ) -> Self {
        Self {
            embedding,
            reranker,
            index,
            corpus,
            retrieve_top_k,
            rerank_top_k,
        }
    }

    /// Retrieve at most `rerank_top_k` documents for one query.
    ///
    /// The query is embedded in query mode (not interchangeable with the
    /// document mode the corpus was embedded with), the index is searched
    /// for `retrieve_top_k` candidates by inner product, the candidates are
    /// reranked against the raw query text, and reranked positions are
    /// mapped back through the candidate list to document handles. A corpus
    /// smaller than `rerank_top_k` yields fewer results, never padding.
    #[instrument(skip(self))]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, PipelineError> {
        let mut embedded = self
            .embedding
            .embed(&[query], EmbeddingMode::Query)
            .await
            .map_err(|e| PipelineError::retrieval(format!("query embedding failed: {e}")))?;

        if embedded.len() != 1 {
            return Err(PipelineError::retrieval(format!(
                "embedding service returned {} vectors for one query",
                embedded.len()
            )));
        }
        let query_vector = embedded
            .pop()
            .ok_or_else(|| PipelineError::retrieval("embedding service returned no vector"))?;

        let candidates = self.index.search(query_vector.as_slice(), self.retrieve_top_k);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let texts = candidates
            .iter()
            .map(|m| {
                self.corpus
                    .get(m.doc)
                    .map(|d| d.text.as_str())
                    .ok_or_else(|| {
                        PipelineError::retrieval(format!("index returned unknown handle {}", m.doc))
                    })
            })
            .collect::<Result<Vec<&str>, _>>()?;

        let mut hits = self
            .reranker
            .rerank(query, &texts, self.rerank_top_k)
            .await
            .map_err(|e| PipelineError::retrieval(format!("reranking failed: {e}")))?;

        // Descending score; ties fall back to the original ANN rank, which
        // is ascending distance.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.original_index.cmp(&b.original_index))
        });
        hits.truncate(self.rerank_top_k);

        hits.iter()
            .enumerate()
            .map(|(rank, hit)| {
                let candidate = candidates.get(hit.original_index).ok_or_else(|| {
                    PipelineError::retrieval(format!(
                        "reranker index {} outside candidate set of {}",
                        hit.original_index,
                        candidates.len()
                    ))
                })?;
                let document = self.corpus.get(candidate.doc).cloned().ok_or_else(|| {
                    PipelineError::retrieval(format!(
                        "index returned unknown handle {}",
                        candidate.doc
                    ))
                })?;
                Ok(RetrievedDocument { document, rank })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{AnnMatch, RerankHit};
    use crate::domain::{DocId, Embedding};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn test_corpus(n: usize) -> Arc<Corpus> {
        let mut corpus = Corpus::new();
        for i in 0..n {
            corpus.push(format!("Doc {i}"), format!("text of doc {i}"), "http://s");
        }
        Arc::new(corpus)
    }

    struct FixedEmbedder {
        modes: Mutex<Vec<EmbeddingMode>>,
    }

    impl FixedEmbedder {
        fn new() -> Self {
            Self {
                modes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EmbeddingService for FixedEmbedder {
        async fn embed(
            &self,
            texts: &[&str],
            mode: EmbeddingMode,
        ) -> Result<Vec<Embedding>, PipelineError> {
            self.modes.lock().unwrap().push(mode);
            Ok(texts.iter().map(|_| Embedding::new(vec![1.0, 0.0])).collect())
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    /// ANN layer double returning a fixed candidate list.
    struct StubIndex {
        matches: Vec<AnnMatch>,
    }

    impl StubIndex {
        fn over(docs: &[usize]) -> Self {
            Self {
                matches: docs
                    .iter()
                    .enumerate()
                    .map(|(rank, d)| AnnMatch {
                        doc: DocId(*d),
                        distance: rank as f32,
                    })
                    .collect(),
            }
        }
    }

    impl VectorIndex for StubIndex {
        fn search(&self, _query: &[f32], top_k: usize) -> Vec<AnnMatch> {
            self.matches.iter().take(top_k).copied().collect()
        }

        fn len(&self) -> usize {
            self.matches.len()
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    /// Scores candidates from a fixed table keyed by candidate position.
    struct TableReranker {
        scores: Vec<f32>,
    }

    #[async_trait]
    impl RerankService for TableReranker {
        async fn rerank(
            &self,
            _query: &str,
            candidates: &[&str],
            top_n: usize,
        ) -> Result<Vec<RerankHit>, PipelineError> {
            let mut hits: Vec<RerankHit> = candidates
                .iter()
                .enumerate()
                .map(|(i, _)| RerankHit {
                    original_index: i,
                    score: self.scores.get(i).copied().unwrap_or(0.0),
                })
                .collect();
            hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
            hits.truncate(top_n);
            Ok(hits)
        }
    }

    struct FailingReranker;

    #[async_trait]
    impl RerankService for FailingReranker {
        async fn rerank(
            &self,
            _query: &str,
            _candidates: &[&str],
            _top_n: usize,
        ) -> Result<Vec<RerankHit>, PipelineError> {
            Err(PipelineError::retrieval("rerank service unavailable"))
        }
    }

    fn retriever(
        index: StubIndex,
        reranker: impl RerankService + 'static,
        corpus: Arc<Corpus>,
        rerank_top_k: usize,
    ) -> Retriever {
        Retriever::new(
            Arc::new(FixedEmbedder::new()),
            Arc::new(reranker),
            Arc::new(index),
            corpus,
            10,
            rerank_top_k,
        )
    }

    #[tokio::test]
    async fn test_query_uses_query_mode() {
        let embedder = Arc::new(FixedEmbedder::new());
        let r = Retriever::new(
            embedder.clone(),
            Arc::new(TableReranker {
                scores: vec![1.0, 0.5],
            }),
            Arc::new(StubIndex::over(&[0, 1])),
            test_corpus(2),
            10,
            3,
        );

        r.retrieve("anything").await.unwrap();

        assert_eq!(*embedder.modes.lock().unwrap(), vec![EmbeddingMode::Query]);
    }

    #[tokio::test]
    async fn test_remap_recovers_ann_candidates() {
        // ANN candidate list is handles 4, 2, 7; the reranker prefers the
        // candidate at position 2, then 0, then 1.
        let r = retriever(
            StubIndex::over(&[4, 2, 7]),
            TableReranker {
                scores: vec![0.5, 0.1, 0.9],
            },
            test_corpus(8),
            3,
        );

        let docs = r.retrieve("q").await.unwrap();

        let handles: Vec<DocId> = docs.iter().map(|d| d.document.id).collect();
        assert_eq!(handles, vec![DocId(7), DocId(4), DocId(2)]);
        assert_eq!(docs[0].rank, 0);
        assert_eq!(docs[2].rank, 2);
    }

    #[tokio::test]
    async fn test_returns_at_most_rerank_top_k() {
        let r = retriever(
            StubIndex::over(&[0, 1, 2, 3, 4]),
            TableReranker {
                scores: vec![0.9, 0.8, 0.7, 0.6, 0.5],
            },
            test_corpus(5),
            2,
        );

        let docs = r.retrieve("q").await.unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].document.id, DocId(0));
        assert_eq!(docs[1].document.id, DocId(1));
    }

    #[tokio::test]
    async fn test_ties_break_by_ann_rank() {
        let r = retriever(
            StubIndex::over(&[5, 3, 1]),
            TableReranker {
                scores: vec![0.4, 0.4, 0.4],
            },
            test_corpus(6),
            2,
        );

        let docs = r.retrieve("q").await.unwrap();

        // Equal scores keep ANN order: candidate 0 (handle 5), then 1.
        assert_eq!(docs[0].document.id, DocId(5));
        assert_eq!(docs[1].document.id, DocId(3));
    }

    #[tokio::test]
    async fn test_small_corpus_returns_what_exists() {
        let r = retriever(
            StubIndex::over(&[1, 0]),
            TableReranker {
                scores: vec![0.2, 0.8],
            },
            test_corpus(2),
            5,
        );

        let docs = r.retrieve("q").await.unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].document.id, DocId(0));
    }

    #[tokio::test]
    async fn test_rerank_failure_surfaces_as_retrieval_error() {
        let r = retriever(StubIndex::over(&[0, 1]), FailingReranker, test_corpus(2), 3);

        let result = r.retrieve("q").await;

        assert!(matches!(result, Err(PipelineError::Retrieval(_))));
    }
}
