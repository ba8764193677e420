use futures::{pin_mut, StreamExt};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rag_agent::{
    CohereClient, Config, HttpSourceFetcher, RagPipeline, SourceSpec, TurnEvent,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let sources: Vec<SourceSpec> = std::env::args()
        .skip(1)
        .map(|url| SourceSpec::new(url.clone(), url))
        .collect();
    if sources.is_empty() {
        anyhow::bail!("usage: chat <source-url>...");
    }

    let config = Config::default();
    let client = Arc::new(CohereClient::from_env(&config)?);

    let pipeline = RagPipeline::builder()
        .config(config.clone())
        .fetcher(Arc::new(HttpSourceFetcher::new(config.ingest.chunk_size)))
        .embedding(client.clone())
        .reranker(client.clone())
        .chat(client)
        .build()?;

    let (kb, report) = pipeline.ingest(&sources).await?;
    for failure in &report.failures {
        warn!(url = %failure.url, error = %failure.error, "Source skipped");
    }
    info!(documents = kb.corpus().len(), "Ready, ask away (empty line quits)");

    let mut orchestrator = pipeline.new_session(&kb);
    let stdin = std::io::stdin();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let utterance = line.trim();
        if utterance.is_empty() {
            break;
        }

        let mut citations = Vec::new();
        {
            let events = orchestrator.submit_turn(utterance);
            pin_mut!(events);
            while let Some(event) = events.next().await {
                match event {
                    Ok(TurnEvent::Text(text)) => {
                        print!("{text}");
                        std::io::stdout().flush()?;
                    }
                    Ok(TurnEvent::Citation(citation)) => citations.push(citation),
                    Err(error) => eprintln!("\n[stream interrupted: {error}]"),
                }
            }
        }
        println!();

        for citation in &citations {
            let ids: Vec<String> = citation.document_ids.iter().map(|d| d.to_string()).collect();
            println!(
                "  [{}..{}] {:?} <- {}",
                citation.start,
                citation.end,
                citation.quoted_text,
                ids.join(", ")
            );
        }
    }

    Ok(())
}
