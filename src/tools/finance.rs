//! Stock market data from Yahoo Finance.

use super::{opt_u64_arg, str_arg, FunctionSpec, Toolkit};
use crate::error::{LlmOsError, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const SEARCH_URL: &str = "https://query1.finance.yahoo.com/v1/finance/search";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Yahoo Finance toolkit.
pub struct YFinanceTools {
    client: reqwest::Client,
    stock_price: bool,
    company_info: bool,
    analyst_recommendations: bool,
    company_news: bool,
}

/// Selects which finance functions are exposed.
#[derive(Debug, Clone, Default)]
pub struct YFinanceToolsBuilder {
    stock_price: bool,
    company_info: bool,
    analyst_recommendations: bool,
    company_news: bool,
}

impl YFinanceToolsBuilder {
    pub fn stock_price(mut self) -> Self {
        self.stock_price = true;
        self
    }

    pub fn company_info(mut self) -> Self {
        self.company_info = true;
        self
    }

    pub fn analyst_recommendations(mut self) -> Self {
        self.analyst_recommendations = true;
        self
    }

    pub fn company_news(mut self) -> Self {
        self.company_news = true;
        self
    }

    pub fn all(self) -> Self {
        self.stock_price()
            .company_info()
            .analyst_recommendations()
            .company_news()
    }

    pub fn build(self) -> YFinanceTools {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        YFinanceTools {
            client,
            stock_price: self.stock_price,
            company_info: self.company_info,
            analyst_recommendations: self.analyst_recommendations,
            company_news: self.company_news,
        }
    }
}

impl YFinanceTools {
    /// Only the current price lookup.
    pub fn new() -> Self {
        Self::builder().stock_price().build()
    }

    pub fn builder() -> YFinanceToolsBuilder {
        YFinanceToolsBuilder::default()
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn quote_summary(&self, symbol: &str, modules: &str) -> Result<Value> {
        let url = format!("{}/{}", SUMMARY_URL, symbol);
        let body = self.get_json(&url, &[("modules", modules)]).await?;
        body.pointer("/quoteSummary/result/0")
            .cloned()
            .ok_or_else(|| LlmOsError::Tool(format!("No data found for {}", symbol)))
    }

    #[instrument(skip(self))]
    pub async fn get_current_stock_price(&self, symbol: &str) -> Result<String> {
        let url = format!("{}/{}", CHART_URL, symbol);
        let body = self.get_json(&url, &[("range", "1d"), ("interval", "1d")]).await;

        let price = body.ok().and_then(|b| parse_chart_price(&b));
        Ok(match price {
            Some(price) => format!("{:.4}", price),
            None => format!("Could not fetch current price for {}", symbol),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_company_info(&self, symbol: &str) -> Result<String> {
        let summary = self
            .quote_summary(
                symbol,
                "assetProfile,price,summaryDetail,financialData,defaultKeyStatistics",
            )
            .await?;
        Ok(serde_json::to_string_pretty(&company_info(symbol, &summary))?)
    }

    #[instrument(skip(self))]
    pub async fn get_analyst_recommendations(&self, symbol: &str) -> Result<String> {
        let summary = self.quote_summary(symbol, "recommendationTrend").await?;
        let trend = summary
            .pointer("/recommendationTrend/trend")
            .cloned()
            .unwrap_or_else(|| json!([]));
        Ok(serde_json::to_string_pretty(&trend)?)
    }

    #[instrument(skip(self))]
    pub async fn get_company_news(&self, symbol: &str, num_stories: usize) -> Result<String> {
        let count = num_stories.to_string();
        let body = self
            .get_json(SEARCH_URL, &[("q", symbol), ("newsCount", &count), ("quotesCount", "0")])
            .await?;

        let mut news = parse_news(&body);
        news.truncate(num_stories);
        debug!("Fetched {} stories for {}", news.len(), symbol);
        Ok(serde_json::to_string_pretty(&news)?)
    }
}

impl Default for YFinanceTools {
    fn default() -> Self {
        Self::new()
    }
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`.
fn raw(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Object(map)) => map.get("raw").cloned().unwrap_or(Value::Null),
        Some(other) => other.clone(),
        None => Value::Null,
    }
}

fn parse_chart_price(body: &Value) -> Option<f64> {
    body.pointer("/chart/result/0/meta/regularMarketPrice")
        .and_then(Value::as_f64)
}

fn company_info(symbol: &str, summary: &Value) -> Value {
    let profile = summary.get("assetProfile");
    let price = summary.get("price");
    let detail = summary.get("summaryDetail");
    let financial = summary.get("financialData");
    let stats = summary.get("defaultKeyStatistics");

    let field = |section: Option<&Value>, key: &str| raw(section.and_then(|s| s.get(key)));

    let entries = [
        ("Name", field(price, "longName")),
        ("Symbol", json!(symbol)),
        ("Current Stock Price", field(financial, "currentPrice")),
        ("Currency", field(price, "currency")),
        ("Market Cap", field(price, "marketCap")),
        ("Sector", field(profile, "sector")),
        ("Industry", field(profile, "industry")),
        ("Address", field(profile, "address1")),
        ("City", field(profile, "city")),
        ("State", field(profile, "state")),
        ("Zip", field(profile, "zip")),
        ("Country", field(profile, "country")),
        ("EPS", field(stats, "trailingEps")),
        ("P/E Ratio", field(detail, "trailingPE")),
        ("52 Week Low", field(detail, "fiftyTwoWeekLow")),
        ("52 Week High", field(detail, "fiftyTwoWeekHigh")),
        ("50 Day Average", field(detail, "fiftyDayAverage")),
        ("200 Day Average", field(detail, "twoHundredDayAverage")),
        ("Website", field(profile, "website")),
        ("Summary", field(profile, "longBusinessSummary")),
        ("Analyst Recommendation", field(financial, "recommendationKey")),
        ("Number Of Analyst Opinions", field(financial, "numberOfAnalystOpinions")),
        ("Employees", field(profile, "fullTimeEmployees")),
        ("Total Cash", field(financial, "totalCash")),
        ("Free Cash flow", field(financial, "freeCashflow")),
        ("Operating Cash flow", field(financial, "operatingCashflow")),
        ("EBITDA", field(financial, "ebitda")),
        ("Revenue Growth", field(financial, "revenueGrowth")),
        ("Gross Margins", field(financial, "grossMargins")),
        ("Ebitda Margins", field(financial, "ebitdaMargins")),
    ];

    let info: Map<String, Value> = entries
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    Value::Object(info)
}

fn parse_news(body: &Value) -> Vec<Value> {
    body.get("news")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    json!({
                        "title": item.get("title").cloned().unwrap_or(Value::Null),
                        "publisher": item.get("publisher").cloned().unwrap_or(Value::Null),
                        "link": item.get("link").cloned().unwrap_or(Value::Null),
                        "published_at": item.get("providerPublishTime").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn symbol_spec(name: &str, description: &str) -> FunctionSpec {
    FunctionSpec::new(
        name,
        description,
        json!({
            "type": "object",
            "properties": {
                "symbol": {"type": "string", "description": "The stock symbol, e.g. NVDA."}
            },
            "required": ["symbol"]
        }),
    )
}

#[async_trait]
impl Toolkit for YFinanceTools {
    fn name(&self) -> &str {
        "yfinance_tools"
    }

    fn functions(&self) -> Vec<FunctionSpec> {
        let mut functions = Vec::new();
        if self.stock_price {
            functions.push(symbol_spec(
                "get_current_stock_price",
                "Use this function to get the current stock price for a given symbol.",
            ));
        }
        if self.company_info {
            functions.push(symbol_spec(
                "get_company_info",
                "Use this function to get company information and overview for a given stock symbol.",
            ));
        }
        if self.analyst_recommendations {
            functions.push(symbol_spec(
                "get_analyst_recommendations",
                "Use this function to get analyst recommendations for a given stock symbol.",
            ));
        }
        if self.company_news {
            functions.push(FunctionSpec::new(
                "get_company_news",
                "Use this function to get company news and press releases for a given stock symbol.",
                json!({
                    "type": "object",
                    "properties": {
                        "symbol": {"type": "string", "description": "The stock symbol."},
                        "num_stories": {"type": "integer", "description": "The number of news stories to return.", "default": 3}
                    },
                    "required": ["symbol"]
                }),
            ));
        }
        functions
    }

    async fn call(&self, function: &str, args: &Value) -> Result<String> {
        let symbol = str_arg(args, "symbol")?.trim().to_uppercase();
        match function {
            "get_current_stock_price" if self.stock_price => self.get_current_stock_price(&symbol).await,
            "get_company_info" if self.company_info => self.get_company_info(&symbol).await,
            "get_analyst_recommendations" if self.analyst_recommendations => {
                self.get_analyst_recommendations(&symbol).await
            }
            "get_company_news" if self.company_news => {
                let num_stories = opt_u64_arg(args, "num_stories").unwrap_or(3) as usize;
                self.get_company_news(&symbol, num_stories).await
            }
            other => Err(LlmOsError::Tool(format!("Unknown finance function: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chart_price() {
        let body = json!({"chart": {"result": [{"meta": {"symbol": "NVDA", "regularMarketPrice": 121.4}}]}});
        assert_eq!(parse_chart_price(&body), Some(121.4));
        assert_eq!(parse_chart_price(&json!({"chart": {"result": null}})), None);
    }

    #[test]
    fn test_company_info_unwraps_raw_values() {
        let summary = json!({
            "price": {"longName": "NVIDIA Corporation", "marketCap": {"raw": 3.0e12, "fmt": "3T"}},
            "assetProfile": {"sector": "Technology", "city": "Santa Clara"},
            "financialData": {"currentPrice": {"raw": 121.4, "fmt": "121.40"}, "recommendationKey": "buy"}
        });

        let info = company_info("NVDA", &summary);
        assert_eq!(info["Name"], "NVIDIA Corporation");
        assert_eq!(info["Symbol"], "NVDA");
        assert_eq!(info["Market Cap"], 3.0e12);
        assert_eq!(info["Current Stock Price"], 121.4);
        assert_eq!(info["Analyst Recommendation"], "buy");
        assert!(info.get("EPS").is_none());
    }

    #[test]
    fn test_parse_news() {
        let body = json!({"news": [
            {"title": "Chips rally", "publisher": "Reuters", "link": "https://x", "providerPublishTime": 1}
        ]});
        let news = parse_news(&body);
        assert_eq!(news.len(), 1);
        assert_eq!(news[0]["publisher"], "Reuters");
        assert!(parse_news(&json!({})).is_empty());
    }

    #[test]
    fn test_switchable_functions() {
        assert_eq!(YFinanceTools::new().functions().len(), 1);
        assert_eq!(YFinanceTools::builder().all().build().functions().len(), 4);
    }
}
