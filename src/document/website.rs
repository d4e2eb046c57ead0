//! Website reader: crawls a page (and optionally its same-site links) into documents.

use super::{chunk_document, extract_links, html_to_text, Document, DEFAULT_CHUNK_SIZE};
use crate::error::{LlmOsError, Result};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; llmos/0.1; +https://github.com/llmos/llmos)";

/// Breadth-first crawler limited by page count and depth.
pub struct WebsiteReader {
    client: reqwest::Client,
    /// Maximum number of pages read, start page included.
    max_links: usize,
    /// Maximum depth; the start page is depth 1.
    max_depth: usize,
    chunk_size: usize,
}

impl WebsiteReader {
    /// Create a reader with the given limits.
    pub fn new(max_links: usize, max_depth: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            max_links,
            max_depth,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the maximum characters per document.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Read a website into documents.
    ///
    /// Pages that fail to load are skipped; an empty result means nothing
    /// could be read.
    #[instrument(skip(self))]
    pub async fn read(&self, url: &str) -> Result<Vec<Document>> {
        let start = Url::parse(url.trim())
            .map_err(|e| LlmOsError::InvalidInput(format!("Invalid URL '{}': {}", url, e)))?;
        if !matches!(start.scheme(), "http" | "https") {
            return Err(LlmOsError::InvalidInput(format!(
                "Unsupported URL scheme: {}",
                start.scheme()
            )));
        }

        let mut documents = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(Url, usize)> = VecDeque::from([(start.clone(), 1)]);
        let mut pages_read = 0;

        while let Some((page_url, depth)) = queue.pop_front() {
            if pages_read >= self.max_links {
                break;
            }
            if depth > self.max_depth || !visited.insert(page_url.to_string()) {
                continue;
            }

            let html = match self.fetch(&page_url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Failed to read {}: {}", page_url, e);
                    continue;
                }
            };
            pages_read += 1;

            let text = html_to_text(&html);
            if !text.is_empty() {
                let docs = chunk_document(page_url.as_str(), &text, self.chunk_size)
                    .into_iter()
                    .map(|d| d.with_meta("url", page_url.as_str()));
                documents.extend(docs);
            }

            if depth < self.max_depth {
                for link in extract_links(&html) {
                    if let Some(next) = resolve_link(&start, &page_url, &link) {
                        if !visited.contains(next.as_str()) {
                            queue.push_back((next, depth + 1));
                        }
                    }
                }
            }
        }

        info!("Read {} documents from {} page(s)", documents.len(), pages_read);
        Ok(documents)
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        debug!("Fetching {}", url);
        let response = self.client.get(url.clone()).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Resolve an `href` found on `page` into a crawlable URL on the start site.
fn resolve_link(start: &Url, page: &Url, href: &str) -> Option<Url> {
    let mut resolved = page.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    if resolved.host_str()? != start.host_str()? {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_link_same_site_only() {
        let start = Url::parse("https://blog.example.com/post").unwrap();

        let rel = resolve_link(&start, &start, "/archive#top").unwrap();
        assert_eq!(rel.as_str(), "https://blog.example.com/archive");

        assert!(resolve_link(&start, &start, "https://other.com/x").is_none());
        assert!(resolve_link(&start, &start, "mailto:someone@example.com").is_none());
    }

    #[tokio::test]
    async fn test_read_rejects_invalid_url() {
        let reader = WebsiteReader::new(2, 1);
        assert!(matches!(
            reader.read("not a url").await,
            Err(LlmOsError::InvalidInput(_))
        ));
        assert!(matches!(
            reader.read("ftp://example.com/file").await,
            Err(LlmOsError::InvalidInput(_))
        ));
    }
}
