//! PDF reader backed by the `pdftotext` utility (poppler).

use super::{chunk_text, Document, DEFAULT_CHUNK_SIZE};
use crate::error::{LlmOsError, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, instrument};

/// Reads a PDF file into one document per page.
pub struct PdfReader {
    chunk_size: usize,
}

impl Default for PdfReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfReader {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Source name for a PDF path: the file name up to its first dot.
    pub fn source_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .and_then(|n| n.split('.').next().map(str::to_string))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "document".to_string())
    }

    /// Extract the text of a PDF and split it into page documents.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn read(&self, path: &Path) -> Result<Vec<Document>> {
        if !path.exists() {
            return Err(LlmOsError::InvalidInput(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let result = Command::new("pdftotext")
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LlmOsError::ToolNotFound("pdftotext".into()));
            }
            Err(e) => {
                return Err(LlmOsError::ToolFailed(format!("pdftotext execution failed: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LlmOsError::Reader(format!("pdftotext failed: {stderr}")));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let documents = split_pages(&Self::source_name(path), &text, self.chunk_size);
        info!("Read {} documents from {}", documents.len(), path.display());
        Ok(documents)
    }
}

/// Split `pdftotext` output (pages separated by form feeds) into documents.
fn split_pages(name: &str, text: &str, chunk_size: usize) -> Vec<Document> {
    let mut documents = Vec::new();

    for (index, page) in text.split('\x0c').enumerate() {
        for (chunk_index, content) in chunk_text(page, chunk_size).into_iter().enumerate() {
            documents.push(
                Document::new(name, content)
                    .with_meta("page", (index + 1) as u64)
                    .with_meta("chunk", (chunk_index + 1) as u64),
            );
        }
    }

    documents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_name() {
        assert_eq!(PdfReader::source_name(Path::new("/tmp/report.pdf")), "report");
        assert_eq!(PdfReader::source_name(Path::new("annual.2023.pdf")), "annual");
    }

    #[test]
    fn test_split_pages_skips_blank_pages() {
        let text = "First page text\n\x0c   \n\x0cThird page\n\x0c";
        let docs = split_pages("report", text, 1000);

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, "First page text");
        assert_eq!(docs[0].meta_data["page"], 1);
        assert_eq!(docs[1].meta_data["page"], 3);
        assert!(docs.iter().all(|d| d.name == "report"));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let reader = PdfReader::new();
        let result = reader.read(Path::new("/definitely/not/here.pdf")).await;
        assert!(matches!(result, Err(LlmOsError::InvalidInput(_))));
    }
}
