use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub chat: ChatConfig,
    pub embedding: EmbeddingConfig,
    pub rerank: RerankConfig,
    pub retrieval: RetrievalConfig,
    pub index: IndexConfig,
    pub ingest: IngestConfig,
    pub api_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub model: String,
    pub planning_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RerankConfig {
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// ANN candidates fetched per query.
    pub retrieve_top_k: usize,
    /// Documents kept after reranking.
    pub rerank_top_k: usize,
}

/// ANN graph construction parameters. Higher quality and connectivity
/// raise recall at the cost of build time and memory.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    pub construction_quality: usize,
    pub max_connections: usize,
    pub search_quality: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chat: ChatConfig {
                model: "command-r".to_string(),
                planning_timeout_seconds: 10,
                request_timeout_seconds: 120,
            },
            embedding: EmbeddingConfig {
                model: "embed-english-v3.0".to_string(),
                dimension: 1024,
                batch_size: 96,
            },
            rerank: RerankConfig {
                model: "rerank-english-v3.0".to_string(),
            },
            retrieval: RetrievalConfig {
                retrieve_top_k: 10,
                rerank_top_k: 3,
            },
            index: IndexConfig {
                construction_quality: 256,
                max_connections: 16,
                search_quality: 128,
            },
            ingest: IngestConfig { chunk_size: 1200 },
            api_base_url: "https://api.cohere.com".to_string(),
        }
    }
}
