use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::{
    ports::{ChatService, GenerationStream},
    CitationSpan, Document, GenerationEvent, PipelineError,
};
use crate::infrastructure::cohere::CohereClient;

/// One decoded line of the chat stream. The wire protocol is
/// newline-delimited JSON, one event object per line.
#[derive(Debug, Deserialize)]
#[serde(tag = "event_type", rename_all = "kebab-case")]
enum StreamLine {
    TextGeneration {
        text: String,
    },
    CitationGeneration {
        citations: Vec<WireCitation>,
    },
    StreamEnd {},
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct WireCitation {
    start: usize,
    end: usize,
    text: String,
    #[serde(default)]
    document_ids: Vec<String>,
}

impl From<WireCitation> for CitationSpan {
    fn from(wire: WireCitation) -> Self {
        CitationSpan {
            start: wire.start,
            end: wire.end,
            quoted_text: wire.text,
            document_indices: wire
                .document_ids
                .iter()
                .filter_map(|id| parse_doc_index(id))
                .collect(),
        }
    }
}

/// Citation payloads reference attached documents as `doc_<position>`.
fn parse_doc_index(id: &str) -> Option<usize> {
    id.strip_prefix("doc_").and_then(|n| n.parse().ok())
}

fn decode_line(line: &str) -> Option<StreamLine> {
    serde_json::from_str(line).ok()
}

#[derive(Deserialize)]
struct PlanResponse {
    #[serde(default)]
    search_queries: Vec<PlannedQuery>,
}

#[derive(Deserialize)]
struct PlannedQuery {
    text: String,
}

impl CohereClient {
    async fn open_chat_stream(
        &self,
        body: serde_json::Value,
    ) -> Result<GenerationStream, PipelineError> {
        let response = self
            .post("/v1/chat")
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::generation(format!(
                "chat request failed ({status}): {text}"
            )));
        }

        let mut bytes = response.bytes_stream();

        let stream = try_stream! {
            let mut buffer = String::new();

            'receive: while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| PipelineError::stream(e.to_string()))?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Chunk boundaries need not align with lines.
                while let Some(newline) = buffer.find('\n') {
                    let line: String = buffer.drain(..=newline).collect();
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    match decode_line(line) {
                        Some(StreamLine::TextGeneration { text }) => {
                            yield GenerationEvent::Text(text);
                        }
                        Some(StreamLine::CitationGeneration { citations }) => {
                            for citation in citations {
                                yield GenerationEvent::Citation(citation.into());
                            }
                        }
                        Some(StreamLine::StreamEnd {}) => break 'receive,
                        Some(StreamLine::Other) | None => {}
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl ChatService for CohereClient {
    async fn plan_queries(
        &self,
        utterance: &str,
        session_id: Uuid,
    ) -> Result<Vec<String>, PipelineError> {
        let response = self
            .post("/v1/chat")
            .json(&json!({
                "model": self.config.chat.model,
                "message": utterance,
                "conversation_id": session_id,
                "search_queries_only": true,
            }))
            .send()
            .await
            .map_err(|e| PipelineError::generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::generation(format!(
                "query planning failed ({status}): {text}"
            )));
        }

        let payload: PlanResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::generation(e.to_string()))?;

        Ok(payload.search_queries.into_iter().map(|q| q.text).collect())
    }

    async fn generate_grounded(
        &self,
        utterance: &str,
        documents: &[Document],
        session_id: Uuid,
    ) -> Result<GenerationStream, PipelineError> {
        // Ids are positions in the attached list; citations come back
        // keyed by them.
        let attached: Vec<_> = documents
            .iter()
            .enumerate()
            .map(|(i, d)| {
                json!({
                    "id": format!("doc_{i}"),
                    "title": d.title,
                    "snippet": d.text,
                    "url": d.source_url,
                })
            })
            .collect();

        self.open_chat_stream(json!({
            "model": self.config.chat.model,
            "message": utterance,
            "conversation_id": session_id,
            "stream": true,
            "documents": attached,
        }))
        .await
    }

    async fn generate_plain(
        &self,
        utterance: &str,
        session_id: Uuid,
    ) -> Result<GenerationStream, PipelineError> {
        self.open_chat_stream(json!({
            "model": self.config.chat.model,
            "message": utterance,
            "conversation_id": session_id,
            "stream": true,
        }))
        .await
    }
}
