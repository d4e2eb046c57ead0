//! Exa neural web search.

use super::{opt_u64_arg, str_arg, FunctionSpec, Toolkit};
use crate::error::{LlmOsError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

const SEARCH_URL: &str = "https://api.exa.ai/search";

/// Results per search when neither the settings nor the model pick a count.
const DEFAULT_NUM_RESULTS: usize = 10;

/// Environment variable holding the Exa API key.
pub const EXA_API_KEY_ENV: &str = "EXA_API_KEY";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    num_results: usize,
    contents: Value,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExaResult {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// A search result handed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExaHit {
    pub title: Option<String>,
    pub url: String,
    pub published_date: Option<String>,
    pub author: Option<String>,
    pub text: String,
}

/// Search the web through the Exa API.
pub struct ExaTools {
    client: reqwest::Client,
    api_key: Option<String>,
    num_results: Option<usize>,
    text_length_limit: usize,
}

impl ExaTools {
    /// Create the toolkit; the API key is read from `EXA_API_KEY`.
    pub fn new(num_results: Option<usize>, text_length_limit: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key: std::env::var(EXA_API_KEY_ENV).ok().filter(|k| !k.is_empty()),
            num_results,
            text_length_limit,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// The configured count wins over the one requested by the model.
    fn result_count(&self, requested: Option<usize>) -> usize {
        self.num_results.or(requested).unwrap_or(DEFAULT_NUM_RESULTS)
    }

    #[instrument(skip(self))]
    pub async fn search_exa(&self, query: &str, num_results: usize) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            LlmOsError::Config(format!("{} environment variable not set", EXA_API_KEY_ENV))
        })?;

        let request = SearchRequest {
            query,
            num_results,
            contents: json!({"text": {"maxCharacters": self.text_length_limit}}),
        };

        let response: SearchResponse = self
            .client
            .post(SEARCH_URL)
            .header("x-api-key", api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let hits = to_hits(response.results, self.text_length_limit);
        debug!("Exa returned {} results", hits.len());
        Ok(serde_json::to_string_pretty(&hits)?)
    }
}

fn to_hits(results: Vec<ExaResult>, text_length_limit: usize) -> Vec<ExaHit> {
    results
        .into_iter()
        .map(|r| ExaHit {
            title: r.title,
            url: r.url,
            published_date: r.published_date,
            author: r.author,
            text: r
                .text
                .unwrap_or_default()
                .chars()
                .take(text_length_limit)
                .collect(),
        })
        .collect()
}

#[async_trait]
impl Toolkit for ExaTools {
    fn name(&self) -> &str {
        "exa"
    }

    fn functions(&self) -> Vec<FunctionSpec> {
        vec![FunctionSpec::new(
            "search_exa",
            "Searches Exa for a query and returns JSON results with title, url, author and text.",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The query to search for."},
                    "num_results": {"type": "integer", "description": "Number of results to return."}
                },
                "required": ["query"]
            }),
        )]
    }

    async fn call(&self, function: &str, args: &Value) -> Result<String> {
        match function {
            "search_exa" => {
                let requested = opt_u64_arg(args, "num_results").map(|n| n as usize);
                let num_results = self.result_count(requested);
                self.search_exa(str_arg(args, "query")?, num_results).await
            }
            other => Err(LlmOsError::Tool(format!("Unknown Exa function: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let request = SearchRequest {
            query: "rust",
            num_results: 5,
            contents: json!({"text": {"maxCharacters": 1000}}),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["numResults"], 5);
        assert_eq!(body["contents"]["text"]["maxCharacters"], 1000);
    }

    #[test]
    fn test_results_are_truncated() {
        let response: SearchResponse = serde_json::from_value(json!({
            "results": [
                {"title": "Rust 2024", "url": "https://blog.rust-lang.org", "publishedDate": "2024-01-01", "text": "abcdefghij"},
                {"url": "https://example.com"}
            ]
        }))
        .unwrap();

        let hits = to_hits(response.results, 4);
        assert_eq!(hits[0].text, "abcd");
        assert_eq!(hits[0].published_date.as_deref(), Some("2024-01-01"));
        assert_eq!(hits[1].title, None);
        assert_eq!(hits[1].text, "");
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let mut tools = ExaTools::new(Some(5), 1000);
        tools.api_key = None;
        let result = tools.call("search_exa", &json!({"query": "rust"})).await;
        assert!(matches!(result, Err(LlmOsError::Config(_))));
    }

    #[test]
    fn test_configured_result_count_wins() {
        let tools = ExaTools::new(Some(5), 1000);
        assert_eq!(tools.result_count(Some(10)), 5);
        assert_eq!(tools.result_count(None), 5);

        let tools = ExaTools::new(None, 1000);
        assert_eq!(tools.result_count(Some(3)), 3);
        assert_eq!(tools.result_count(None), DEFAULT_NUM_RESULTS);
    }
}
