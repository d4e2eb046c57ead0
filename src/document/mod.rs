//! Documents and the readers that produce them.
//!
//! Readers turn external content (web pages, PDF files) into plain-text
//! [`Document`]s that can be embedded into the knowledge base.

mod pdf;
mod website;

pub use pdf::PdfReader;
pub use website::WebsiteReader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Default maximum characters per document chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 5000;

/// A unit of text destined for the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Source name (URL or file stem). Documents of one source share it.
    pub name: String,
    /// Plain-text content.
    pub content: String,
    /// Free-form metadata (chunk index, page number, source url...).
    #[serde(default)]
    pub meta_data: Map<String, Value>,
}

impl Document {
    /// Create a document without metadata.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            meta_data: Map::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.meta_data.insert(key.to_string(), value.into());
        self
    }
}

/// Split text into chunks of at most `chunk_size` characters.
///
/// Paragraphs (blank-line separated) are kept together where possible; a
/// paragraph longer than `chunk_size` is split on character boundaries.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let needed = if current.is_empty() {
            paragraph.chars().count()
        } else {
            current.chars().count() + 2 + paragraph.chars().count()
        };

        if needed <= chunk_size {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if paragraph.chars().count() <= chunk_size {
            current.push_str(paragraph);
        } else {
            let chars: Vec<char> = paragraph.chars().collect();
            for piece in chars.chunks(chunk_size) {
                chunks.push(piece.iter().collect());
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Split one source's text into numbered documents.
pub fn chunk_document(name: &str, text: &str, chunk_size: usize) -> Vec<Document> {
    chunk_text(text, chunk_size)
        .into_iter()
        .enumerate()
        .map(|(i, content)| Document::new(name, content).with_meta("chunk", (i + 1) as u64))
        .collect()
}

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|svg|head)\b[^>]*>.*?</(script|style|noscript|svg|head)>")
        .expect("Invalid regex")
});
static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(p|div|br|li|ul|ol|h[1-6]|tr|table|section|article|header|footer|blockquote|pre)\b[^>]*>")
        .expect("Invalid regex")
});
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid regex"));
static SPACES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("Invalid regex"));
static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("Invalid regex"));
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\s[^>]*href\s*=\s*["']([^"'#]+)["']"#).expect("Invalid regex")
});

/// Decode the handful of HTML entities that matter for readable text.
pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Convert an HTML page into readable plain text.
pub fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let with_breaks = BLOCK_RE.replace_all(&without_scripts, "\n\n");
    let stripped = TAG_RE.replace_all(&with_breaks, " ");
    let decoded = decode_entities(&stripped);
    let collapsed = SPACES_RE.replace_all(&decoded, " ");

    let lines: Vec<&str> = collapsed.lines().map(str::trim).collect();
    BLANK_LINES_RE
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

/// Extract raw `href` targets from anchor tags, in document order.
pub fn extract_links(html: &str) -> Vec<String> {
    HREF_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| decode_entities(m.as_str().trim())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_keeps_header_and_article() {
        let html = r#"<html><head><title>Blog</title></head><body>
            <header class="site"><nav>Home</nav></header>
            <article><p>What I wish someone had told me.</p></article>
            <script>track()</script></body></html>"#;

        let text = html_to_text(html);
        assert!(text.contains("Home"));
        assert!(text.contains("What I wish someone had told me."));
        assert!(!text.contains("track()"));
        assert!(!text.contains("Blog"));
    }

    #[test]
    fn test_html_to_text_strips_markup() {
        let html = r#"<html><head><title>x</title></head><body>
            <script>var a = 1;</script>
            <h1>What I wish</h1><p>Optimism &amp; <b>focus</b> matter.</p>
            <p>Second&nbsp;paragraph</p></body></html>"#;

        let text = html_to_text(html);
        assert!(text.starts_with("What I wish"));
        assert!(text.contains("Optimism & focus matter."));
        assert!(text.contains("Second paragraph"));
        assert!(!text.contains("var a"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_extract_links() {
        let html = r##"<a href="/about">About</a> <a class="x" href='https://example.com/post?id=1&amp;p=2'>Post</a> <a href="#top">Top</a>"##;
        let links = extract_links(html);
        assert_eq!(links, vec!["/about", "https://example.com/post?id=1&p=2"]);
    }

    #[test]
    fn test_chunk_text_keeps_paragraphs_together() {
        let text = "aaaa\n\nbbbb\n\ncccccccccc";
        let chunks = chunk_text(text, 10);
        assert_eq!(chunks, vec!["aaaa\n\nbbbb", "cccccccccc"]);
    }

    #[test]
    fn test_chunk_text_splits_long_paragraph() {
        let chunks = chunk_text(&"x".repeat(25), 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 5);
    }

    #[test]
    fn test_chunk_document_numbers_chunks() {
        let docs = chunk_document("https://example.com", "one\n\ntwo", 3);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].name, "https://example.com");
        assert_eq!(docs[1].meta_data["chunk"], 2);
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("  \n\n ", 100).is_empty());
    }
}
