use async_stream::stream;
use futures::{future, Stream, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::application::services::retriever::Retriever;
use crate::domain::{
    ports::ChatService, Citation, ConversationSession, Document, GenerationEvent, PipelineError,
    Role, TurnEvent, TurnOutcome,
};

/// Drives one conversation: plans retrieval for each user utterance, merges
/// multi-query results, and reassembles the cited answer from the streamed
/// generation events.
///
/// Each turn moves through planning, optional retrieval, and generation,
/// and ends back at idle; turns within a session are strictly sequential,
/// which the `&mut self` borrow of [`submit_turn`](Self::submit_turn)
/// enforces at compile time.
pub struct ConversationOrchestrator {
    chat: Arc<dyn ChatService>,
    retriever: Arc<Retriever>,
    session: ConversationSession,
    planning_timeout: Duration,
}

impl ConversationOrchestrator {
    /// Create an orchestrator with a fresh session; the session id is
    /// minted here and passed unchanged on every chat call.
    pub fn new(
        chat: Arc<dyn ChatService>,
        retriever: Arc<Retriever>,
        planning_timeout: Duration,
    ) -> Self {
        Self {
            chat,
            retriever,
            session: ConversationSession::new(),
            planning_timeout,
        }
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    /// Run one turn, surfacing text and citation events as they arrive.
    ///
    /// The stream is finite and not restartable; a new call is required per
    /// turn. Dropping it mid-turn cancels the turn and closes the
    /// underlying generation stream; events already delivered stand. A
    /// generation failure mid-stream is surfaced as the final item after
    /// everything delivered before it.
    pub fn submit_turn(
        &mut self,
        utterance: impl Into<String>,
    ) -> impl Stream<Item = Result<TurnEvent, PipelineError>> + Send + '_ {
        let utterance = utterance.into();

        stream! {
            let session_id = self.session.id;
            self.session.push_turn(Role::User, utterance.clone());

            let sub_queries = match tokio::time::timeout(
                self.planning_timeout,
                self.chat.plan_queries(&utterance, session_id),
            )
            .await
            {
                Ok(Ok(queries)) => queries,
                Ok(Err(error)) => {
                    warn!(%error, "Query planning failed, answering ungrounded");
                    Vec::new()
                }
                Err(_) => {
                    warn!("Query planning timed out, answering ungrounded");
                    Vec::new()
                }
            };
            debug!(sub_queries = sub_queries.len(), "Planned turn");

            let documents = if sub_queries.is_empty() {
                Vec::new()
            } else {
                self.retrieve_all(&sub_queries).await
            };

            let opened = if documents.is_empty() {
                self.chat.generate_plain(&utterance, session_id).await
            } else {
                debug!(documents = documents.len(), "Generating grounded answer");
                self.chat.generate_grounded(&utterance, &documents, session_id).await
            };

            let mut answer = String::new();

            match opened {
                Ok(mut events) => {
                    while let Some(event) = events.next().await {
                        match event {
                            Ok(GenerationEvent::Text(text)) => {
                                answer.push_str(&text);
                                yield Ok(TurnEvent::Text(text));
                            }
                            Ok(GenerationEvent::Citation(span)) => {
                                yield Ok(TurnEvent::Citation(resolve_citation(span, &documents)));
                            }
                            Err(error) => {
                                // Everything already delivered stands; the
                                // error is the stream's final word.
                                yield Err(error);
                                break;
                            }
                        }
                    }
                }
                Err(error) => yield Err(error),
            }

            self.session.push_turn(Role::Assistant, answer);
        }
    }

    /// Run one turn to completion and collect the result object.
    ///
    /// On a mid-stream failure the partial answer and citations are kept
    /// and the error is reported in [`TurnOutcome::error`].
    pub async fn complete_turn(&mut self, utterance: impl Into<String>) -> TurnOutcome {
        let mut outcome = TurnOutcome::default();

        {
            let events = self.submit_turn(utterance);
            futures::pin_mut!(events);
            while let Some(event) = events.next().await {
                match event {
                    Ok(TurnEvent::Text(text)) => outcome.answer.push_str(&text),
                    Ok(TurnEvent::Citation(citation)) => outcome.citations.push(citation),
                    Err(error) => outcome.error = Some(error),
                }
            }
        }

        outcome
    }

    /// Retrieve once per sub-query, concurrently, and concatenate the
    /// results in sub-query order.
    ///
    /// Duplicates across sub-queries are kept: citation indices are
    /// positions in this combined list, so identity-based deduplication
    /// would corrupt the mapping. An errored sub-query contributes zero
    /// documents and the turn continues.
    async fn retrieve_all(&self, sub_queries: &[String]) -> Vec<Document> {
        let results =
            future::join_all(sub_queries.iter().map(|q| self.retriever.retrieve(q))).await;

        let mut combined = Vec::new();
        for (query, result) in sub_queries.iter().zip(results) {
            match result {
                Ok(retrieved) => combined.extend(retrieved.into_iter().map(|r| r.document)),
                Err(error) => {
                    warn!(query = %query, %error, "Sub-query retrieval failed, contributing no documents");
                }
            }
        }
        combined
    }
}

/// Map the positional document references of a raw citation onto the
/// handles of the document list attached to this generation call.
///
/// The table is positional and per-call; references outside the attached
/// list are dropped rather than failing the turn.
fn resolve_citation(span: crate::domain::CitationSpan, documents: &[Document]) -> Citation {
    let document_ids: BTreeSet<_> = span
        .document_indices
        .iter()
        .filter_map(|&i| documents.get(i).map(|d| d.id))
        .collect();

    Citation {
        start: span.start,
        end: span.end,
        quoted_text: span.quoted_text,
        document_ids,
    }
}
