//! Mock LLM 客户端（无需 API，便于本地跑通 Plan → Execute → Reflect 流程）
//!
//! 规划请求返回固定三步计划（web_search → llm_analysis → llm_generation），
//! 反思请求恒为 accept，文本请求回显提示词首行为 Markdown。

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm::{LlmClient, LlmError};
use crate::schema::{SchemaDescriptor, PLAN_SCHEMA_NAME, VERDICT_SCHEMA_NAME};

#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        let first_line = prompt.lines().next().unwrap_or("(empty prompt)");
        Ok(format!(
            "# Mock Output\n\n## Summary\n\n- {}\n",
            first_line.trim()
        ))
    }

    async fn generate_structured(
        &self,
        _system: &str,
        user: &str,
        schema: &SchemaDescriptor,
    ) -> Result<Value, LlmError> {
        match schema.name.as_str() {
            PLAN_SCHEMA_NAME => Ok(json!({
                "objective": user,
                "steps": [
                    {"step_id": 1, "action": user, "tool": "web_search", "expected_output": "Search results"},
                    {"step_id": 2, "action": "Extract key insights", "tool": "llm_analysis", "expected_output": "Insights"},
                    {"step_id": 3, "action": "Write markdown summary", "tool": "llm_generation", "expected_output": "Markdown report"}
                ],
                "output_artifact": "report.md"
            })),
            VERDICT_SCHEMA_NAME => Ok(json!({
                "completeness_score": 4,
                "clarity_score": 4,
                "actionability_score": 4,
                "format_compliance": true,
                "decision": "accept"
            })),
            other => Err(LlmError::Request(format!("mock has no response for schema {other}"))),
        }
    }
}
