use std::sync::Arc;
use tracing::{instrument, warn};

use crate::domain::{
    ports::{EmbeddingMode, EmbeddingService, SourceFetcher},
    Corpus, Embedding, PipelineError, SourceSpec,
};

/// Per-source failures collected during a best-effort ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub failures: Vec<SourceFailure>,
}

#[derive(Debug)]
pub struct SourceFailure {
    pub url: String,
    pub error: PipelineError,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Builds a corpus from remote sources and embeds it for indexing.
///
/// Fetching is best-effort: a source that cannot be fetched or chunked is
/// recorded in the report and skipped, the rest still ingest. Embedding is
/// atomic: any batch failure fails the whole call and nothing partial is
/// handed to the caller.
pub struct IngestService {
    fetcher: Arc<dyn SourceFetcher>,
    embedding: Arc<dyn EmbeddingService>,
    batch_size: usize,
}

impl IngestService {
    pub fn new(fetcher: Arc<dyn SourceFetcher>, embedding: Arc<dyn EmbeddingService>) -> Self {
        Self {
            fetcher,
            embedding,
            batch_size: 96,
        }
    }

    /// Batch size bounds request size only; any value >= 1 produces
    /// identical corpus and vectors.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[instrument(skip(self, sources), fields(sources = sources.len()))]
    pub async fn ingest(&self, sources: &[SourceSpec]) -> (Corpus, IngestReport) {
        let mut corpus = Corpus::new();
        let mut report = IngestReport::default();

        for source in sources {
            match self.fetcher.fetch_and_chunk(&source.url).await {
                Ok(passages) => {
                    for passage in passages {
                        let title = passage.title.unwrap_or_else(|| source.title.clone());
                        corpus.push(title, passage.text, source.url.clone());
                    }
                }
                Err(error) => {
                    warn!(url = %source.url, %error, "Skipping source that failed to ingest");
                    report.failures.push(SourceFailure {
                        url: source.url.clone(),
                        error,
                    });
                }
            }
        }

        (corpus, report)
    }

    /// Embed every document in corpus order, in document mode.
    ///
    /// The vector at position `i` corresponds to the document with handle
    /// `i`; the returned set is complete or the call fails.
    #[instrument(skip(self, corpus), fields(documents = corpus.len()))]
    pub async fn embed_all(&self, corpus: &Corpus) -> Result<Vec<Embedding>, PipelineError> {
        let mut vectors = Vec::with_capacity(corpus.len());

        for batch in corpus.documents().chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|d| d.text.as_str()).collect();
            let embedded = self.embedding.embed(&texts, EmbeddingMode::Document).await?;

            if embedded.len() != texts.len() {
                return Err(PipelineError::embedding(format!(
                    "embedding service returned {} vectors for {} texts",
                    embedded.len(),
                    texts.len()
                )));
            }

            vectors.extend(embedded);
        }

        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourcePassage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeFetcher;

    #[async_trait]
    impl SourceFetcher for FakeFetcher {
        async fn fetch_and_chunk(&self, url: &str) -> Result<Vec<SourcePassage>, PipelineError> {
            match url {
                "http://bad" => Err(PipelineError::ingestion(url, "connection refused")),
                _ => Ok(vec![
                    SourcePassage {
                        text: format!("first passage of {url}"),
                        title: None,
                    },
                    SourcePassage {
                        text: format!("second passage of {url}"),
                        title: Some("Structural title".to_string()),
                    },
                ]),
            }
        }
    }

    /// Records every (batch, mode) call and yields unit-length vectors.
    struct RecordingEmbedder {
        calls: Mutex<Vec<(usize, EmbeddingMode)>>,
        fail_after: Option<usize>,
    }

    impl RecordingEmbedder {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_after: None,
            }
        }

        fn failing_after(calls: usize) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_after: Some(calls),
            }
        }
    }

    #[async_trait]
    impl EmbeddingService for RecordingEmbedder {
        async fn embed(
            &self,
            texts: &[&str],
            mode: EmbeddingMode,
        ) -> Result<Vec<Embedding>, PipelineError> {
            let mut calls = self.calls.lock().unwrap();
            if let Some(limit) = self.fail_after {
                if calls.len() >= limit {
                    return Err(PipelineError::embedding("remote embed call failed"));
                }
            }
            calls.push((texts.len(), mode));
            Ok(texts.iter().map(|_| Embedding::new(vec![1.0, 0.0])).collect())
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn test_ingest_is_best_effort() {
        let service = IngestService::new(Arc::new(FakeFetcher), Arc::new(RecordingEmbedder::new()));
        let sources = vec![
            SourceSpec::new("Good A", "http://a"),
            SourceSpec::new("Bad", "http://bad"),
            SourceSpec::new("Good B", "http://b"),
        ];

        let (corpus, report) = service.ingest(&sources).await;

        assert_eq!(corpus.len(), 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].url, "http://bad");
    }

    #[tokio::test]
    async fn test_structural_title_overrides_source_title() {
        let service = IngestService::new(Arc::new(FakeFetcher), Arc::new(RecordingEmbedder::new()));
        let (corpus, _) = service.ingest(&[SourceSpec::new("Source", "http://a")]).await;

        assert_eq!(corpus.documents()[0].title, "Source");
        assert_eq!(corpus.documents()[1].title, "Structural title");
    }

    #[tokio::test]
    async fn test_embed_all_uses_document_mode_and_matches_corpus_length() {
        let embedder = Arc::new(RecordingEmbedder::new());
        let service = IngestService::new(Arc::new(FakeFetcher), embedder.clone()).with_batch_size(3);
        let sources = vec![
            SourceSpec::new("A", "http://a"),
            SourceSpec::new("Bad", "http://bad"),
            SourceSpec::new("B", "http://b"),
        ];

        let (corpus, _) = service.ingest(&sources).await;
        let vectors = service.embed_all(&corpus).await.unwrap();

        assert_eq!(vectors.len(), corpus.len());

        let calls = embedder.calls.lock().unwrap();
        assert!(calls.iter().all(|(_, mode)| *mode == EmbeddingMode::Document));
        // 4 documents at batch size 3
        assert_eq!(calls.iter().map(|(n, _)| n).sum::<usize>(), 4);
    }

    #[tokio::test]
    async fn test_embed_all_is_atomic_on_batch_failure() {
        let embedder = Arc::new(RecordingEmbedder::failing_after(1));
        let service = IngestService::new(Arc::new(FakeFetcher), embedder).with_batch_size(1);
        let (corpus, _) = service.ingest(&[SourceSpec::new("A", "http://a")]).await;

        let result = service.embed_all(&corpus).await;

        assert!(matches!(result, Err(PipelineError::EmbeddingService(_))));
    }
}
