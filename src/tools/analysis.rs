//! llm_analysis / llm_generation 工具
//!
//! 两者都以固定提示词模板调用 LLM 自由文本生成：
//! 分析嵌入当前 search_results，生成嵌入当前 analysis。前置缺失时按 MissingContextPolicy 处理。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::LlmClient;
use crate::schema::{PlanStep, ToolKind};
use crate::tools::{MissingContextPolicy, StepTool, ToolError, ToolOutput, WorkingState};

const NO_SEARCH_RESULTS: &str = "(no search results available)";
const NO_ANALYSIS: &str = "(no analysis available)";

/// 分析提示词：提取与企业相关的洞察
pub fn analysis_prompt(search_results: Option<&[Value]>) -> String {
    let data = match search_results {
        Some(results) => {
            serde_json::to_string_pretty(results).unwrap_or_else(|_| NO_SEARCH_RESULTS.to_string())
        }
        None => NO_SEARCH_RESULTS.to_string(),
    };
    format!("Extract enterprise-relevant insights from the following data:\n\n{data}")
}

/// 生成提示词：面向管理层的 Markdown 摘要
pub fn generation_prompt(analysis: Option<&str>) -> String {
    format!(
        "Create an executive-ready summary in Markdown format.\n\n\
         Requirements:\n\
         - Clear section headers\n\
         - Enterprise focus\n\
         - Concise and factual\n\n\
         Analysis:\n{}",
        analysis.unwrap_or(NO_ANALYSIS)
    )
}

pub struct LlmAnalysisTool {
    llm: Arc<dyn LlmClient>,
    policy: MissingContextPolicy,
}

impl LlmAnalysisTool {
    pub fn new(llm: Arc<dyn LlmClient>, policy: MissingContextPolicy) -> Self {
        Self { llm, policy }
    }
}

#[async_trait]
impl StepTool for LlmAnalysisTool {
    fn name(&self) -> &str {
        ToolKind::LlmAnalysis.as_str()
    }

    fn description(&self) -> &str {
        "Extract insights from the latest search_results; stores text as analysis"
    }

    async fn run(&self, _step: &PlanStep, working: &WorkingState) -> Result<ToolOutput, ToolError> {
        if working.search_results.is_none() {
            if self.policy == MissingContextPolicy::Fail {
                return Err(ToolError::MissingPrecondition {
                    tool: ToolKind::LlmAnalysis,
                    missing: "search_results",
                });
            }
            tracing::warn!("llm_analysis without search results, using placeholder context");
        }
        let prompt = analysis_prompt(working.search_results.as_deref());
        let text = self.llm.generate_text(&prompt).await?;
        Ok(ToolOutput::Analysis(text))
    }
}

pub struct LlmGenerationTool {
    llm: Arc<dyn LlmClient>,
    policy: MissingContextPolicy,
}

impl LlmGenerationTool {
    pub fn new(llm: Arc<dyn LlmClient>, policy: MissingContextPolicy) -> Self {
        Self { llm, policy }
    }
}

#[async_trait]
impl StepTool for LlmGenerationTool {
    fn name(&self) -> &str {
        ToolKind::LlmGeneration.as_str()
    }

    fn description(&self) -> &str {
        "Write the markdown deliverable from the latest analysis; stores text as final_output"
    }

    async fn run(&self, _step: &PlanStep, working: &WorkingState) -> Result<ToolOutput, ToolError> {
        if working.analysis.is_none() {
            if self.policy == MissingContextPolicy::Fail {
                return Err(ToolError::MissingPrecondition {
                    tool: ToolKind::LlmGeneration,
                    missing: "analysis",
                });
            }
            tracing::warn!("llm_generation without analysis, using placeholder context");
        }
        let prompt = generation_prompt(working.analysis.as_deref());
        let text = self.llm.generate_text(&prompt).await?;
        Ok(ToolOutput::FinalOutput(text))
    }
}
