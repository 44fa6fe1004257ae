//! Planner：目标 -> 经过校验的 ExecutionPlan
//!
//! 只做一次结构化生成（temperature=0），不执行任何工具。

use std::sync::Arc;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::pipeline::structured::generate_validated;
use crate::schema::{parse_plan, ExecutionPlan, SchemaDescriptor};

pub const PLANNER_SYSTEM_PROMPT: &str = "You are a Planning Agent.\n\
Create a step-by-step execution plan.\n\n\
Rules:\n\
- Do NOT execute tools\n\
- Do NOT explain reasoning\n\
- Use only these tools: web_search, llm_analysis, llm_generation\n\
- Specify a markdown output file (relative path ending in .md)\n\
- Output must strictly match the JSON schema";

pub struct Planner {
    llm: Arc<dyn LlmClient>,
    schema: SchemaDescriptor,
    schema_retries: u32,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, schema_retries: u32) -> Self {
        Self {
            llm,
            schema: SchemaDescriptor::plan(),
            schema_retries,
        }
    }

    pub async fn plan(&self, objective: &str) -> Result<ExecutionPlan, AgentError> {
        let plan = generate_validated(
            self.llm.as_ref(),
            PLANNER_SYSTEM_PROMPT,
            objective,
            &self.schema,
            self.schema_retries,
            parse_plan,
        )
        .await
        .map_err(AgentError::PlanningFailure)?;

        tracing::info!(
            steps = plan.steps.len(),
            output_artifact = %plan.output_artifact,
            "plan produced"
        );
        Ok(plan)
    }

    /// 底层 LLM 句柄的累计 token 用量 (prompt, completion, total)
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }
}
