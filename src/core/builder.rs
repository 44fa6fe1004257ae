//! Orchestrator 构建器：统一的初始化逻辑
//!
//! 按配置选择 LLM / 搜索后端（缺少 API Key 时回退到 Mock），组装 Planner、Executor、Reflector
//! 与产物 / 升级接收方。测试可用 with_* 注入任意协作方。

use std::sync::Arc;

use crate::config::{AppConfig, ConfigError, LlmProvider, SearchProvider};
use crate::core::{
    ArtifactSink, EscalationSink, FsArtifactSink, LogEscalationSink, Orchestrator, RetryStrategy,
    RunPolicy,
};
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::pipeline::{PlanExecutor, Planner, Reflector};
use crate::tools::{MockSearchClient, SearchClient, TavilySearchClient, ToolDispatcher};

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// 根据配置与环境变量选择 LLM 后端（DeepSeek / OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let timeout = cfg.llm.request_timeout_secs;
    match cfg.llm.provider {
        LlmProvider::DeepSeek if env_key("DEEPSEEK_API_KEY").is_some() => {
            let client = create_deepseek_client(cfg.llm.model.as_deref(), timeout);
            tracing::info!("Using DeepSeek LLM ({})", client.model());
            Arc::new(client)
        }
        LlmProvider::OpenAi if env_key("OPENAI_API_KEY").is_some() => {
            let client = OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                cfg.llm.model.as_deref().unwrap_or("gpt-4o-mini"),
                env_key("OPENAI_API_KEY").as_deref(),
                timeout,
            );
            tracing::info!("Using OpenAI LLM ({})", client.model());
            Arc::new(client)
        }
        LlmProvider::Mock => {
            tracing::info!("Using Mock LLM");
            Arc::new(MockLlmClient)
        }
        provider => {
            tracing::warn!(?provider, "No API key set for provider, using Mock LLM");
            Arc::new(MockLlmClient)
        }
    }
}

/// 根据配置选择搜索后端；Tavily 没有 Key 时回退到 Mock
pub fn create_search_from_config(cfg: &AppConfig) -> Result<Arc<dyn SearchClient>, ConfigError> {
    match (cfg.search.provider, env_key("TAVILY_API_KEY")) {
        (SearchProvider::Tavily, Some(key)) => {
            tracing::info!(endpoint = %cfg.search.endpoint, "Using Tavily search");
            let client =
                TavilySearchClient::new(&cfg.search.endpoint, &key, cfg.search.timeout_secs)
                    .map_err(|e| ConfigError::Collaborator(e.to_string()))?;
            Ok(Arc::new(client))
        }
        (SearchProvider::Tavily, None) => {
            tracing::warn!("TAVILY_API_KEY not set, using Mock search");
            Ok(Arc::new(MockSearchClient))
        }
        (SearchProvider::Mock, _) => Ok(Arc::new(MockSearchClient)),
    }
}

/// Orchestrator 构建器：默认按配置创建协作方，可逐个覆盖
pub struct OrchestratorBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    search: Option<Arc<dyn SearchClient>>,
    artifacts: Option<Arc<dyn ArtifactSink>>,
    escalation: Option<Arc<dyn EscalationSink>>,
}

impl OrchestratorBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            search: None,
            artifacts: None,
            escalation: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_search(mut self, search: Arc<dyn SearchClient>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_artifact_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.artifacts = Some(sink);
        self
    }

    pub fn with_escalation_sink(mut self, sink: Arc<dyn EscalationSink>) -> Self {
        self.escalation = Some(sink);
        self
    }

    /// 覆盖重试上限（如 CLI 的 --max-retries）
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.orchestrator.max_retries = max_retries;
        self
    }

    pub fn with_retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.config.orchestrator.retry_strategy = strategy;
        self
    }

    pub fn build(self) -> Result<Orchestrator, ConfigError> {
        let cfg = self.config;
        cfg.validate()?;

        let llm = match self.llm {
            Some(llm) => llm,
            None => create_llm_from_config(&cfg),
        };
        let search = match self.search {
            Some(search) => search,
            None => create_search_from_config(&cfg)?,
        };
        let artifacts = self
            .artifacts
            .unwrap_or_else(|| Arc::new(FsArtifactSink::new(&cfg.output.root_dir)));
        let escalation = self
            .escalation
            .unwrap_or_else(|| Arc::new(LogEscalationSink::new(cfg.output.escalation_dir.clone())));

        let dispatcher = ToolDispatcher::with_standard_tools(
            llm.clone(),
            search,
            cfg.search.max_results,
            cfg.orchestrator.missing_context,
            cfg.orchestrator.step_timeout_secs,
        );
        for (name, description) in dispatcher.tool_descriptions() {
            tracing::debug!(tool = %name, %description, "tool registered");
        }

        let policy = RunPolicy {
            max_retries: cfg.orchestrator.max_retries,
            retry_strategy: cfg.orchestrator.retry_strategy,
        };

        Ok(Orchestrator::new(
            Planner::new(llm.clone(), cfg.llm.schema_retries),
            PlanExecutor::new(dispatcher),
            Reflector::new(llm, cfg.llm.schema_retries),
            artifacts,
            escalation,
        )
        .with_policy(policy))
    }
}
