//! Reflector：对最终产物打分并给出 accept / retry / escalate
//!
//! 只评估、不改写内容；结构化生成失败时返回 ReflectionFailure。

use std::sync::Arc;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::pipeline::structured::generate_validated;
use crate::schema::{parse_verdict, ReflectionVerdict, SchemaDescriptor};

pub const REFLECTOR_SYSTEM_PROMPT: &str = "You are a Quality Evaluation Agent.\n\
Evaluate the document strictly against the criteria.\n\
Do NOT rewrite the content.\n\
Do NOT explain reasoning.\n\
Return structured evaluation only.";

/// 评估请求：文档 + 固定评估维度
pub fn reflection_input(document: &str) -> String {
    format!(
        "Document:\n{document}\n\n\
         Evaluation criteria:\n\
         - Completeness (1-5)\n\
         - Clarity (1-5)\n\
         - Actionability (1-5)\n\
         - Markdown format compliance (true/false)\n\
         - Final decision: accept, retry, or escalate"
    )
}

pub struct Reflector {
    llm: Arc<dyn LlmClient>,
    schema: SchemaDescriptor,
    schema_retries: u32,
}

impl Reflector {
    pub fn new(llm: Arc<dyn LlmClient>, schema_retries: u32) -> Self {
        Self {
            llm,
            schema: SchemaDescriptor::verdict(),
            schema_retries,
        }
    }

    pub async fn reflect(&self, artifact: &str) -> Result<ReflectionVerdict, AgentError> {
        let verdict = generate_validated(
            self.llm.as_ref(),
            REFLECTOR_SYSTEM_PROMPT,
            &reflection_input(artifact),
            &self.schema,
            self.schema_retries,
            parse_verdict,
        )
        .await
        .map_err(AgentError::ReflectionFailure)?;

        tracing::info!(
            completeness = verdict.completeness_score,
            clarity = verdict.clarity_score,
            actionability = verdict.actionability_score,
            format_compliance = verdict.format_compliance,
            decision = %verdict.decision,
            "reflection verdict"
        );
        Ok(verdict)
    }
}
