//! 单次执行的工作状态
//!
//! 每次 Executor 遍历计划时从空状态开始，步骤产出按工具种类覆盖对应字段；
//! 重试时整体丢弃重建，不跨遍历保留任何字段。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 一次执行遍历内累积的中间结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkingState {
    /// 最近一次 web_search 的原始结果（对核心不透明）
    pub search_results: Option<Vec<Value>>,
    /// 最近一次 llm_analysis 的文本
    pub analysis: Option<String>,
    /// 最近一次 llm_generation 的文本，即最终产物
    pub final_output: Option<String>,
}

/// 单个步骤的产出
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    SearchResults(Vec<Value>),
    Analysis(String),
    FinalOutput(String),
}

impl WorkingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.search_results.is_none() && self.analysis.is_none() && self.final_output.is_none()
    }

    /// 将步骤产出写入对应字段（覆盖旧值）
    pub fn apply(&mut self, output: ToolOutput) {
        match output {
            ToolOutput::SearchResults(results) => self.search_results = Some(results),
            ToolOutput::Analysis(text) => self.analysis = Some(text),
            ToolOutput::FinalOutput(text) => self.final_output = Some(text),
        }
    }
}

/// 前置结果缺失时的策略（llm_analysis 无搜索结果 / llm_generation 无分析）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingContextPolicy {
    /// 以占位文本代替缺失上下文继续执行
    #[default]
    Degrade,
    /// 直接报 MissingPrecondition，终止本次执行
    Fail,
}
