//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `BEE_REFLECT__*` 覆盖（双下划线表示嵌套，如 `BEE_REFLECT__LLM__PROVIDER=openai`）。
//! API Key 不进配置文件，只从环境变量读取（OPENAI_API_KEY / DEEPSEEK_API_KEY / TAVILY_API_KEY）。

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::core::RetryStrategy;
use crate::tools::{MissingContextPolicy, TAVILY_ENDPOINT};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "BEE_REFLECT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// 外部调用没有超时视为配置缺陷
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("failed to build collaborator: {0}")]
    Collaborator(String),
}

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub search: SearchSection,
    pub orchestrator: OrchestratorSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    #[default]
    DeepSeek,
    Mock,
}

/// [llm] 段：后端选择、模型、超时、结构化输出的内部重试次数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / deepseek / mock；没有对应 API Key 时回退到 mock
    pub provider: LlmProvider,
    /// 未设置时按后端取默认模型（deepseek-chat / gpt-4o-mini）
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub request_timeout_secs: u64,
    /// 结构化输出不合法时追加纠正提示重试的次数
    pub schema_retries: u32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: None,
            base_url: None,
            request_timeout_secs: 60,
            schema_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    #[default]
    Tavily,
    Mock,
}

/// [search] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub provider: SearchProvider,
    pub endpoint: String,
    pub max_results: usize,
    /// 读超时（秒），不可为 0
    pub timeout_secs: u64,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            provider: SearchProvider::default(),
            endpoint: TAVILY_ENDPOINT.to_string(),
            max_results: 5,
            timeout_secs: 30,
        }
    }
}

/// [orchestrator] 段：重试上限与策略
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    pub max_retries: u32,
    pub retry_strategy: RetryStrategy,
    pub missing_context: MissingContextPolicy,
    /// 单步工具调用超时（秒）
    pub step_timeout_secs: u64,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_retries: 1,
            retry_strategy: RetryStrategy::default(),
            missing_context: MissingContextPolicy::default(),
            step_timeout_secs: 120,
        }
    }
}

/// [output] 段：产物根目录与升级报告目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub root_dir: PathBuf,
    /// 未设置时升级报告只写日志
    pub escalation_dir: Option<PathBuf>,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            escalation_dir: None,
        }
    }
}

impl AppConfig {
    /// 校验：所有外部调用必须有非零超时
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("llm.request_timeout_secs"));
        }
        if self.search.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("search.timeout_secs"));
        }
        if self.orchestrator.step_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("orchestrator.step_timeout_secs"));
        }
        Ok(())
    }
}

/// 从 config 目录加载配置，环境变量 BEE_REFLECT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（必须存在，可覆盖前面的键）
/// 3. 最后叠加环境变量 BEE_REFLECT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        if std::path::Path::new(&format!("{name}.toml")).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}
