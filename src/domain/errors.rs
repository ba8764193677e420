use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Ingestion failed for {url}: {message}")]
    Ingestion { url: String, message: String },

    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    #[error("Index build error: {0}")]
    IndexBuild(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Generation stream error: {0}")]
    GenerationStream(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn ingestion(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Ingestion {
            url: url.into(),
            message: msg.into(),
        }
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::EmbeddingService(msg.into())
    }

    pub fn index_build(msg: impl Into<String>) -> Self {
        Self::IndexBuild(msg.into())
    }

    pub fn retrieval(msg: impl Into<String>) -> Self {
        Self::Retrieval(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn stream(msg: impl Into<String>) -> Self {
        Self::GenerationStream(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
