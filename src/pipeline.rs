//! Pipeline facade wiring the ports together.
//!
//! A [`RagPipeline`] owns the collaborator ports and the configuration;
//! [`ingest`](RagPipeline::ingest) builds a [`KnowledgeBase`] once, and
//! [`new_session`](RagPipeline::new_session) opens independent
//! conversations over it.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::application::{ConversationOrchestrator, IngestReport, IngestService, Retriever};
use crate::domain::{
    ports::{ChatService, EmbeddingService, RerankService, SourceFetcher, VectorIndex},
    Corpus, PipelineError, SourceSpec,
};
use crate::infrastructure::{config::Config, vector_store::HnswVectorIndex};

/// An ingested corpus and its vector index, read-only and shareable
/// across sessions without locking.
#[derive(Clone)]
pub struct KnowledgeBase {
    corpus: Arc<Corpus>,
    index: Arc<dyn VectorIndex>,
}

impl KnowledgeBase {
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }
}

pub struct RagPipeline {
    fetcher: Arc<dyn SourceFetcher>,
    embedding: Arc<dyn EmbeddingService>,
    reranker: Arc<dyn RerankService>,
    chat: Arc<dyn ChatService>,
    config: Config,
}

impl RagPipeline {
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch, chunk, embed and index the sources.
    ///
    /// Source failures are best-effort (collected in the report); an
    /// embedding failure or an empty corpus fails the whole call, so a
    /// returned knowledge base is always complete and queryable.
    pub async fn ingest(
        &self,
        sources: &[SourceSpec],
    ) -> Result<(KnowledgeBase, IngestReport), PipelineError> {
        let ingestor = IngestService::new(self.fetcher.clone(), self.embedding.clone())
            .with_batch_size(self.config.embedding.batch_size);

        let (corpus, report) = ingestor.ingest(sources).await;
        let vectors = ingestor.embed_all(&corpus).await?;
        let index =
            HnswVectorIndex::build(&vectors, self.config.embedding.dimension, &self.config.index)?;

        info!(
            documents = corpus.len(),
            failed_sources = report.failures.len(),
            "Knowledge base built"
        );

        Ok((
            KnowledgeBase {
                corpus: Arc::new(corpus),
                index: Arc::new(index),
            },
            report,
        ))
    }

    /// Open a new conversation over the knowledge base.
    pub fn new_session(&self, kb: &KnowledgeBase) -> ConversationOrchestrator {
        let retriever = Retriever::new(
            self.embedding.clone(),
            self.reranker.clone(),
            kb.index.clone(),
            kb.corpus.clone(),
            self.config.retrieval.retrieve_top_k,
            self.config.retrieval.rerank_top_k,
        );

        ConversationOrchestrator::new(
            self.chat.clone(),
            Arc::new(retriever),
            Duration::from_secs(self.config.chat.planning_timeout_seconds),
        )
    }
}

#[derive(Default)]
pub struct RagPipelineBuilder {
    fetcher: Option<Arc<dyn SourceFetcher>>,
    embedding: Option<Arc<dyn EmbeddingService>>,
    reranker: Option<Arc<dyn RerankService>>,
    chat: Option<Arc<dyn ChatService>>,
    config: Option<Config>,
}

impl RagPipelineBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn embedding(mut self, embedding: Arc<dyn EmbeddingService>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn reranker(mut self, reranker: Arc<dyn RerankService>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn chat(mut self, chat: Arc<dyn ChatService>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn build(self) -> Result<RagPipeline, PipelineError> {
        let fetcher = self
            .fetcher
            .ok_or_else(|| PipelineError::config("fetcher is required"))?;
        let embedding = self
            .embedding
            .ok_or_else(|| PipelineError::config("embedding service is required"))?;
        let reranker = self
            .reranker
            .ok_or_else(|| PipelineError::config("rerank service is required"))?;
        let chat = self
            .chat
            .ok_or_else(|| PipelineError::config("chat service is required"))?;

        Ok(RagPipeline {
            fetcher,
            embedding,
            reranker,
            chat,
            config: self.config.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        EmbeddingMode, GenerationStream, RerankHit,
    };
    use crate::domain::{Document, Embedding, SourcePassage};
    use async_trait::async_trait;
    use uuid::Uuid;

    struct FakeFetcher;

    #[async_trait]
    impl SourceFetcher for FakeFetcher {
        async fn fetch_and_chunk(
            &self,
            url: &str,
        ) -> Result<Vec<SourcePassage>, PipelineError> {
            if url == "http://bad" {
                return Err(PipelineError::ingestion(url, "unreachable"));
            }
            Ok(vec![
                SourcePassage {
                    text: format!("alpha from {url}"),
                    title: None,
                },
                SourcePassage {
                    text: format!("beta from {url}"),
                    title: None,
                },
            ])
        }
    }

    struct CountingEmbedder;

    #[async_trait]
    impl EmbeddingService for CountingEmbedder {
        async fn embed(
            &self,
            texts: &[&str],
            _mode: EmbeddingMode,
        ) -> Result<Vec<Embedding>, PipelineError> {
            Ok(texts
                .iter()
                .enumerate()
                .map(|(i, _)| {
                    Embedding::new(vec![1.0, i as f32 * 0.25, 1.0 - i as f32 * 0.25])
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    struct NoopReranker;

    #[async_trait]
    impl RerankService for NoopReranker {
        async fn rerank(
            &self,
            _query: &str,
            _candidates: &[&str],
            _top_n: usize,
        ) -> Result<Vec<RerankHit>, PipelineError> {
            Ok(Vec::new())
        }
    }

    struct SilentChat;

    #[async_trait]
    impl ChatService for SilentChat {
        async fn plan_queries(
            &self,
            _utterance: &str,
            _session_id: Uuid,
        ) -> Result<Vec<String>, PipelineError> {
            Ok(Vec::new())
        }

        async fn generate_grounded(
            &self,
            _utterance: &str,
            _documents: &[Document],
            _session_id: Uuid,
        ) -> Result<GenerationStream, PipelineError> {
            Ok(Box::pin(futures::stream::empty()))
        }

        async fn generate_plain(
            &self,
            _utterance: &str,
            _session_id: Uuid,
        ) -> Result<GenerationStream, PipelineError> {
            Ok(Box::pin(futures::stream::empty()))
        }
    }

    fn test_pipeline() -> RagPipeline {
        let mut config = Config::default();
        config.embedding.dimension = 3;

        RagPipeline::builder()
            .config(config)
            .fetcher(Arc::new(FakeFetcher))
            .embedding(Arc::new(CountingEmbedder))
            .reranker(Arc::new(NoopReranker))
            .chat(Arc::new(SilentChat))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_every_port() {
        let result = RagPipeline::builder().config(Config::default()).build();

        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[tokio::test]
    async fn test_ingest_keeps_corpus_and_index_parallel_despite_failures() {
        let pipeline = test_pipeline();
        let sources = vec![
            SourceSpec::new("A", "http://a"),
            SourceSpec::new("Bad", "http://bad"),
            SourceSpec::new("B", "http://b"),
        ];

        let (kb, report) = pipeline.ingest(&sources).await.unwrap();

        assert_eq!(kb.corpus().len(), 4);
        assert_eq!(kb.corpus().len(), kb.index().len());
        assert_eq!(report.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_with_no_documents_is_an_index_build_error() {
        let pipeline = test_pipeline();

        let result = pipeline.ingest(&[SourceSpec::new("Bad", "http://bad")]).await;

        assert!(matches!(result, Err(PipelineError::IndexBuild(_))));
    }
}
