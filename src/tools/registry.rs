//! 步骤工具注册表
//!
//! 三种计划工具实现 StepTool trait（name / description / run），由 ToolRegistry 按名注册与查找，
//! ToolDispatcher 在调用时加超时并统一转 ToolError。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::LlmError;
use crate::schema::{PlanStep, ToolKind};
use crate::tools::{SearchError, ToolOutput, WorkingState};

/// 工具执行错误
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unsupported tool: {0}")]
    Unsupported(String),

    #[error("{tool} requires {missing}, but no earlier step produced it")]
    MissingPrecondition { tool: ToolKind, missing: &'static str },

    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool {tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },
}

/// 步骤工具：读取当前工作状态，返回一项产出；不直接修改状态
#[async_trait]
pub trait StepTool: Send + Sync {
    /// 计划中 "tool" 字段对应的名称
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn run(&self, step: &PlanStep, working: &WorkingState) -> Result<ToolOutput, ToolError>;
}

/// 按名称存储 Arc<dyn StepTool>
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn StepTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl StepTool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn StepTool>> {
        self.tools.get(name).cloned()
    }

    /// (名称, 描述)，按名称排序
    pub fn describe(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .tools
            .iter()
            .map(|(name, tool)| (name.clone(), tool.description().to_string()))
            .collect();
        entries.sort();
        entries
    }
}
