mod chat;
mod client;
mod embed;
mod rerank;

pub use client::CohereClient;
