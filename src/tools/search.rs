//! web_search 工具与搜索协作方
//!
//! SearchClient 抽象搜索后端；TavilySearchClient 调用 Tavily REST API（reqwest，显式超时）；
//! MockSearchClient 返回固定结果供离线运行。结果条目对核心不透明，原样传给后续步骤。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::schema::{PlanStep, ToolKind};
use crate::tools::{StepTool, ToolError, ToolOutput, WorkingState};

pub const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(String),

    #[error("search request timed out")]
    Timeout,

    #[error("search backend returned HTTP {0}")]
    Status(u16),

    #[error("search response malformed: {0}")]
    Decode(String),
}

/// 搜索协作方
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Value>, SearchError>;
}

/// Tavily 搜索：POST JSON，Bearer 鉴权，读取 results 数组
pub struct TavilySearchClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl TavilySearchClient {
    pub fn new(endpoint: &str, api_key: &str, timeout_secs: u64) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("bee-reflect/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SearchError::Request(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl SearchClient for TavilySearchClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Value>, SearchError> {
        tracing::info!(query = %query, max_results, "tavily search");
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({ "query": query, "max_results": max_results }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout
                } else {
                    SearchError::Request(e.to_string())
                }
            })?;
        if !resp.status().is_success() {
            return Err(SearchError::Status(resp.status().as_u16()));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        let results = body
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchError::Decode("missing results array".to_string()))?;
        Ok(results.iter().take(max_results).cloned().collect())
    }
}

/// 离线搜索：按查询生成固定条目
#[derive(Debug, Default)]
pub struct MockSearchClient;

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Value>, SearchError> {
        Ok((1..=max_results.min(3))
            .map(|i| {
                json!({
                    "title": format!("Result {i} for {query}"),
                    "url": format!("https://example.com/{i}"),
                    "content": format!("[Mock search content {i}: {query}]"),
                })
            })
            .collect())
    }
}

/// web_search：以 step.action 为查询词
pub struct WebSearchTool {
    client: Arc<dyn SearchClient>,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(client: Arc<dyn SearchClient>, max_results: usize) -> Self {
        Self {
            client,
            max_results,
        }
    }
}

#[async_trait]
impl StepTool for WebSearchTool {
    fn name(&self) -> &str {
        ToolKind::WebSearch.as_str()
    }

    fn description(&self) -> &str {
        "Search the web using the step action as query; stores raw results as search_results"
    }

    async fn run(&self, step: &PlanStep, _working: &WorkingState) -> Result<ToolOutput, ToolError> {
        let results = self.client.search(&step.action, self.max_results).await?;
        Ok(ToolOutput::SearchResults(results))
    }
}
