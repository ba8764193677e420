use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::domain::{
    ports::{EmbeddingMode, EmbeddingService},
    Embedding, PipelineError,
};
use crate::infrastructure::cohere::CohereClient;

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

fn input_type(mode: EmbeddingMode) -> &'static str {
    match mode {
        EmbeddingMode::Document => "search_document",
        EmbeddingMode::Query => "search_query",
    }
}

#[async_trait]
impl EmbeddingService for CohereClient {
    async fn embed(
        &self,
        texts: &[&str],
        mode: EmbeddingMode,
    ) -> Result<Vec<Embedding>, PipelineError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .post("/v1/embed")
            .json(&json!({
                "model": self.config.embedding.model,
                "texts": texts,
                "input_type": input_type(mode),
            }))
            .send()
            .await
            .map_err(|e| PipelineError::embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::embedding(format!("embed failed ({status}): {body}")));
        }

        let payload: EmbedResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::embedding(e.to_string()))?;

        Ok(payload.embeddings.into_iter().map(Embedding::new).collect())
    }

    fn dimension(&self) -> usize {
        self.config.embedding.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_type_names_the_mode_asymmetry() {
        assert_eq!(input_type(EmbeddingMode::Document), "search_document");
        assert_eq!(input_type(EmbeddingMode::Query), "search_query");
    }
}
