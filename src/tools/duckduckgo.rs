//! DuckDuckGo web and news search.

use super::{opt_u64_arg, str_arg, FunctionSpec, Toolkit};
use crate::document::decode_entities;
use crate::error::{LlmOsError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const DEFAULT_MAX_RESULTS: usize = 5;

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="result__a"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#)
        .expect("Invalid regex")
});
static SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="result__snippet"[^>]*>(.*?)</(?:a|div|td)>"#).expect("Invalid regex")
});
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid regex"));

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub href: String,
    pub body: String,
}

/// Web search through DuckDuckGo's HTML endpoint.
pub struct DuckDuckGo {
    client: reqwest::Client,
    search: bool,
    news: bool,
    /// Overrides the result count requested by the model.
    fixed_max_results: Option<usize>,
}

impl Default for DuckDuckGo {
    fn default() -> Self {
        Self::new()
    }
}

impl DuckDuckGo {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            search: true,
            news: true,
            fixed_max_results: None,
        }
    }

    pub fn with_fixed_max_results(mut self, max_results: usize) -> Self {
        self.fixed_max_results = Some(max_results);
        self
    }

    pub fn with_news(mut self, enabled: bool) -> Self {
        self.news = enabled;
        self
    }

    fn max_results(&self, args: &Value) -> usize {
        self.fixed_max_results
            .or_else(|| opt_u64_arg(args, "max_results").map(|n| n as usize))
            .unwrap_or(DEFAULT_MAX_RESULTS)
    }

    #[instrument(skip(self))]
    async fn query(&self, query: &str, news: bool, max_results: usize) -> Result<Vec<SearchHit>> {
        let mut form = vec![("q", query)];
        if news {
            form.push(("iar", "news"));
        }

        let html = self
            .client
            .post(SEARCH_URL)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut hits = parse_results(&html);
        hits.truncate(max_results);
        debug!("DuckDuckGo returned {} results", hits.len());
        Ok(hits)
    }
}

fn query_spec(name: &str, description: &str) -> FunctionSpec {
    FunctionSpec::new(
        name,
        description,
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "The query to search for."},
                "max_results": {"type": "integer", "description": "The maximum number of results to return.", "default": 5}
            },
            "required": ["query"]
        }),
    )
}

#[async_trait]
impl Toolkit for DuckDuckGo {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    fn functions(&self) -> Vec<FunctionSpec> {
        let mut functions = Vec::new();
        if self.search {
            functions.push(query_spec(
                "duckduckgo_search",
                "Use this function to search DuckDuckGo for a query. Returns JSON results with title, href and body.",
            ));
        }
        if self.news {
            functions.push(query_spec(
                "duckduckgo_news",
                "Use this function to get the latest news from DuckDuckGo. Returns JSON results with title, href and body.",
            ));
        }
        functions
    }

    async fn call(&self, function: &str, args: &Value) -> Result<String> {
        let news = match function {
            "duckduckgo_search" if self.search => false,
            "duckduckgo_news" if self.news => true,
            other => return Err(LlmOsError::Tool(format!("Unknown DuckDuckGo function: {}", other))),
        };

        let query = str_arg(args, "query")?;
        let hits = self.query(query, news, self.max_results(args)).await?;
        Ok(serde_json::to_string_pretty(&hits)?)
    }
}

/// Extract hits from a DuckDuckGo HTML results page.
fn parse_results(html: &str) -> Vec<SearchHit> {
    let titles: Vec<_> = TITLE_RE.captures_iter(html).collect();
    let mut hits = Vec::with_capacity(titles.len());

    for (i, caps) in titles.iter().enumerate() {
        let (Some(whole), Some(href), Some(title)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };

        let section_end = titles
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(html.len());
        let body = SNIPPET_RE
            .captures(&html[whole.end()..section_end])
            .and_then(|c| c.get(1))
            .map(|m| clean_text(m.as_str()))
            .unwrap_or_default();

        let href = resolve_href(&decode_entities(href.as_str()));
        // Sponsored results point back to DuckDuckGo's ad redirector
        if href.contains("duckduckgo.com/y.js") {
            continue;
        }

        hits.push(SearchHit {
            title: clean_text(title.as_str()),
            href,
            body,
        });
    }

    hits
}

fn clean_text(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, "");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Unwrap DuckDuckGo's `/l/?uddg=<target>` redirect links.
fn resolve_href(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    Url::parse(&absolute)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div class="result results_links">
          <h2 class="result__title">
            <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust%2Dlang.org%2F&amp;rut=abc">Rust <b>Programming</b> Language</a>
          </h2>
          <a class="result__snippet" href="x">A language empowering everyone to build <b>reliable</b> &amp; efficient software.</a>
        </div>
        <div class="result results_links">
          <a rel="nofollow" class="result__a" href="https://doc.rust-lang.org/book/">The Book</a>
        </div>
        <div class="result results_links">
          <a rel="nofollow" class="result__a" href="https://duckduckgo.com/y.js?ad_domain=x">Ad</a>
          <a class="result__snippet" href="x">Sponsored</a>
        </div>
    "#;

    #[test]
    fn test_parse_results() {
        let hits = parse_results(PAGE);
        assert_eq!(hits.len(), 2);

        assert_eq!(hits[0].title, "Rust Programming Language");
        assert_eq!(hits[0].href, "https://www.rust-lang.org/");
        assert_eq!(
            hits[0].body,
            "A language empowering everyone to build reliable & efficient software."
        );

        assert_eq!(hits[1].href, "https://doc.rust-lang.org/book/");
        assert_eq!(hits[1].body, "");
    }

    #[test]
    fn test_fixed_max_results_overrides_model() {
        let ddg = DuckDuckGo::new().with_fixed_max_results(3);
        assert_eq!(ddg.max_results(&json!({"max_results": 10})), 3);

        let ddg = DuckDuckGo::new();
        assert_eq!(ddg.max_results(&json!({"max_results": 10})), 10);
        assert_eq!(ddg.max_results(&json!({})), DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn test_functions() {
        let names: Vec<String> = DuckDuckGo::new()
            .with_news(false)
            .functions()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["duckduckgo_search"]);
    }
}
