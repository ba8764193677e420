use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::domain::{
    ports::{RerankHit, RerankService},
    PipelineError,
};
use crate::infrastructure::cohere::CohereClient;

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

#[async_trait]
impl RerankService for CohereClient {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[&str],
        top_n: usize,
    ) -> Result<Vec<RerankHit>, PipelineError> {
        let response = self
            .post("/v1/rerank")
            .json(&json!({
                "model": self.config.rerank.model,
                "query": query,
                "documents": candidates,
                "top_n": top_n,
            }))
            .send()
            .await
            .map_err(|e| PipelineError::retrieval(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::retrieval(format!("rerank failed ({status}): {body}")));
        }

        let payload: RerankResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::retrieval(e.to_string()))?;

        Ok(payload
            .results
            .into_iter()
            .map(|r| RerankHit {
                original_index: r.index,
                score: r.relevance_score,
            })
            .collect())
    }
}
