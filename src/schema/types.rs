//! 计划与反思的数据形状
//!
//! PlanStep / ExecutionPlan 由 Planner 产出，ReflectionVerdict 由 Reflector 产出；
//! 字段名与结构化输出的 JSON 完全一致。

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 计划中允许出现的三种工具
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// 网络搜索，结果写入 search_results
    WebSearch,
    /// 基于搜索结果的分析，结果写入 analysis
    LlmAnalysis,
    /// 基于分析的最终文档生成，结果写入 final_output
    LlmGeneration,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [
        ToolKind::WebSearch,
        ToolKind::LlmAnalysis,
        ToolKind::LlmGeneration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => "web_search",
            ToolKind::LlmAnalysis => "llm_analysis",
            ToolKind::LlmGeneration => "llm_generation",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 计划中的单个步骤
///
/// `tool` 保留原始名称：结构化输出经 Schema 校验后只会是三种之一，
/// 但手工构造或从文件载入的计划可能带未知工具，由 Dispatcher 报 UnsupportedTool。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlanStep {
    /// 计划内唯一，升序（允许不连续）
    pub step_id: u32,
    /// 步骤描述；web_search 时作为查询词
    pub action: String,
    /// 工具名：web_search / llm_analysis / llm_generation
    #[schemars(with = "ToolKind")]
    pub tool: String,
    /// 预期产出描述
    pub expected_output: String,
}

impl PlanStep {
    pub fn new(
        step_id: u32,
        action: impl Into<String>,
        tool: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            step_id,
            action: action.into(),
            tool: tool.into(),
            expected_output: expected_output.into(),
        }
    }

    pub fn tool_kind(&self) -> Option<ToolKind> {
        ToolKind::from_name(&self.tool)
    }
}

/// 执行计划：目标、有序步骤、产物路径
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExecutionPlan {
    pub objective: String,
    /// 执行顺序即声明顺序，非空
    pub steps: Vec<PlanStep>,
    /// Markdown 产物的相对路径，如 report.md
    pub output_artifact: String,
}

/// 反思给出的最终决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Retry,
    Escalate,
}

impl Decision {
    pub const ALL: [Decision; 3] = [Decision::Accept, Decision::Retry, Decision::Escalate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Accept => "accept",
            Decision::Retry => "retry",
            Decision::Escalate => "escalate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 质量门结论：三项 1–5 评分、格式合规、决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReflectionVerdict {
    #[schemars(range(min = 1, max = 5))]
    pub completeness_score: u8,
    #[schemars(range(min = 1, max = 5))]
    pub clarity_score: u8,
    #[schemars(range(min = 1, max = 5))]
    pub actionability_score: u8,
    /// 是否符合 Markdown 格式要求
    pub format_compliance: bool,
    pub decision: Decision,
}
