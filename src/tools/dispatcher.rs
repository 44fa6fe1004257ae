//! 工具分发器
//!
//! 持有 ToolRegistry 与单步超时，dispatch(step, working) 按 step.tool 查找工具并在超时内执行，
//! 把产出写回工作状态后返回；未知工具返回 Unsupported。每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::llm::LlmClient;
use crate::schema::PlanStep;
use crate::tools::{
    LlmAnalysisTool, LlmGenerationTool, MissingContextPolicy, SearchClient, ToolError,
    ToolRegistry, WebSearchTool, WorkingState,
};

/// 工具分发器：对每个步骤施加超时，并将结果合并进 WorkingState
pub struct ToolDispatcher {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 注册三种标准工具：web_search / llm_analysis / llm_generation
    pub fn with_standard_tools(
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SearchClient>,
        max_results: usize,
        policy: MissingContextPolicy,
        timeout_secs: u64,
    ) -> Self {
        let mut registry = ToolRegistry::new();
        registry.register(WebSearchTool::new(search, max_results));
        registry.register(LlmAnalysisTool::new(llm.clone(), policy));
        registry.register(LlmGenerationTool::new(llm, policy));
        Self::new(registry, timeout_secs)
    }

    /// 执行单个步骤；输出 JSON 审计日志
    pub async fn dispatch(
        &self,
        step: &PlanStep,
        mut working: WorkingState,
    ) -> Result<WorkingState, ToolError> {
        let tool = self
            .registry
            .get(&step.tool)
            .ok_or_else(|| ToolError::Unsupported(step.tool.clone()))?;

        let start = Instant::now();
        let result = timeout(self.timeout, tool.run(step, &working)).await;

        let outcome = match &result {
            Ok(Ok(_)) => "ok",
            Ok(Err(_)) => "error",
            Err(_) => "timeout",
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "step_id": step.step_id,
            "tool": step.tool,
            "ok": outcome == "ok",
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        tracing::info!(audit = %audit, "tool");

        let output = result.map_err(|_| ToolError::Timeout {
            tool: step.tool.clone(),
            secs: self.timeout.as_secs(),
        })??;
        working.apply(output);
        Ok(working)
    }

    pub fn tool_descriptions(&self) -> Vec<(String, String)> {
        self.registry.describe()
    }
}
