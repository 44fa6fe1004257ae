//! 编排错误类型
//!
//! 任何未恢复的错误都带上来源阶段（以及失败的 step_id），由 Orchestrator 统一收敛为 Escalated。

use thiserror::Error;

use crate::core::ArtifactError;
use crate::pipeline::StructuredOutputError;
use crate::schema::ToolKind;

/// 错误来源阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Planning,
    Executing,
    Reflecting,
    Persisting,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Planning => "planning",
            Stage::Executing => "executing",
            Stage::Reflecting => "reflecting",
            Stage::Persisting => "persisting",
        };
        f.write_str(s)
    }
}

/// 一次 run 中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// Planner 在内部重试后仍无法得到合法计划
    #[error("Planning failed: {0}")]
    PlanningFailure(#[source] StructuredOutputError),

    /// 计划引用了未注册的工具（配置缺陷，不触发质量重试）
    #[error("Step {step_id}: unsupported tool {name}")]
    UnsupportedTool { step_id: u32, name: String },

    #[error("Step {step_id}: {tool} is missing {missing}")]
    MissingPrecondition {
        step_id: u32,
        tool: ToolKind,
        missing: &'static str,
    },

    /// 工具调用失败（搜索 / LLM / 超时）
    #[error("Step {step_id} ({tool}) failed: {message}")]
    ExecutionFailure {
        step_id: u32,
        tool: String,
        message: String,
    },

    /// 执行完成但没有任何 llm_generation 产出
    #[error("Execution produced no final output")]
    MissingArtifact,

    #[error("Reflection failed: {0}")]
    ReflectionFailure(#[source] StructuredOutputError),

    #[error("Artifact write failed: {0}")]
    ArtifactWrite(#[from] ArtifactError),

    #[error("Run cancelled during {0}")]
    Cancelled(Stage),
}

impl AgentError {
    /// 错误来源阶段
    pub fn stage(&self) -> Stage {
        match self {
            AgentError::PlanningFailure(_) => Stage::Planning,
            AgentError::UnsupportedTool { .. }
            | AgentError::MissingPrecondition { .. }
            | AgentError::ExecutionFailure { .. }
            | AgentError::MissingArtifact => Stage::Executing,
            AgentError::ReflectionFailure(_) => Stage::Reflecting,
            AgentError::ArtifactWrite(_) => Stage::Persisting,
            AgentError::Cancelled(stage) => *stage,
        }
    }

    /// 失败步骤（仅执行阶段的步骤错误）
    pub fn step_id(&self) -> Option<u32> {
        match self {
            AgentError::UnsupportedTool { step_id, .. }
            | AgentError::MissingPrecondition { step_id, .. }
            | AgentError::ExecutionFailure { step_id, .. } => Some(*step_id),
            _ => None,
        }
    }
}
