use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::domain::{chunk_passages, ports::SourceFetcher, PipelineError, SourcePassage};

/// Fetches a source over HTTP and splits the body into passages.
///
/// HTML bodies get a minimal tag strip before paragraph chunking; anything
/// else is treated as plain text.
pub struct HttpSourceFetcher {
    http: Client,
    chunk_size: usize,
    timeout: Duration,
}

impl HttpSourceFetcher {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            http: Client::new(),
            chunk_size,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn fetch_and_chunk(&self, url: &str) -> Result<Vec<SourcePassage>, PipelineError> {
        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::ingestion(url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::ingestion(
                url,
                format!("request failed with status {}", response.status()),
            ));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("text/html"))
            .unwrap_or(false);

        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::ingestion(url, e.to_string()))?;

        let text = if is_html || body.trim_start().starts_with('<') {
            strip_tags(&body)
        } else {
            body
        };

        Ok(chunk_passages(&text, self.chunk_size)
            .into_iter()
            .map(|text| SourcePassage { text, title: None })
            .collect())
    }
}

/// Drop markup, keeping block boundaries as blank lines so the paragraph
/// chunker can split on them. Script and style content is discarded.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let mut rest = html;
    let mut skip_until: Option<&str> = None;

    while let Some(open) = rest.find('<') {
        if skip_until.is_none() {
            out.push_str(&rest[..open]);
        }
        rest = &rest[open..];

        let Some(close) = rest.find('>') else { break };
        let tag = rest[1..close].trim().to_ascii_lowercase();
        rest = &rest[close + 1..];

        if let Some(terminator) = skip_until {
            if tag.starts_with(terminator) {
                skip_until = None;
            }
            continue;
        }

        if tag.starts_with("script") {
            skip_until = Some("/script");
        } else if tag.starts_with("style") {
            skip_until = Some("/style");
        } else if is_block_end(&tag) {
            out.push_str("\n\n");
        }
    }

    if skip_until.is_none() {
        out.push_str(rest);
    }

    decode_basic_entities(&out)
}

fn is_block_end(tag: &str) -> bool {
    matches!(
        tag,
        "/p" | "/div" | "/li" | "/h1" | "/h2" | "/h3" | "/h4" | "/h5" | "/h6" | "br" | "br/"
            | "br /"
    )
}

fn decode_basic_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags_keeps_paragraph_boundaries() {
        let html = "<html><body><p>First paragraph.</p><p>Second paragraph.</p></body></html>";

        let text = strip_tags(html);
        let chunks = chunk_passages(&text, 1000);

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("First paragraph."));
        assert!(chunks[0].contains("Second paragraph."));
    }

    #[test]
    fn test_strip_tags_discards_script_content() {
        let html = "<p>Visible.</p><script>var hidden = 1;</script><p>Also visible.</p>";

        let text = strip_tags(html);

        assert!(text.contains("Visible."));
        assert!(text.contains("Also visible."));
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn test_strip_tags_decodes_entities() {
        assert_eq!(strip_tags("<p>A &amp; B</p>"), "A & B\n\n");
    }
}
