//! 结构化生成 + Schema 校验 + 内部重试
//!
//! 校验失败时把错误作为修正提示追加到下一次请求，最多重试 schema_retries 次；
//! 仍失败则把最后一次错误交给调用方（Planner / Reflector 各自包装为阶段错误）。

use serde_json::Value;
use thiserror::Error;

use crate::llm::{LlmClient, LlmError};
use crate::schema::{SchemaDescriptor, SchemaValidationError};

/// 重试用尽后最后一次失败的原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuredOutputError {
    /// 输出成型但不符合 Schema
    #[error("schema validation failed: {0}")]
    Schema(#[from] SchemaValidationError),

    /// 协作方调用本身失败（请求、超时、非 JSON）
    #[error(transparent)]
    Llm(#[from] LlmError),
}

pub(crate) async fn generate_validated<T>(
    llm: &dyn LlmClient,
    system: &str,
    user: &str,
    schema: &SchemaDescriptor,
    schema_retries: u32,
    parse: fn(Value) -> Result<T, SchemaValidationError>,
) -> Result<T, StructuredOutputError> {
    let mut prompt = user.to_string();
    let mut last_error = StructuredOutputError::Llm(LlmError::EmptyResponse);

    for attempt in 0..=schema_retries {
        let raw = match llm.generate_structured(system, &prompt, schema).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(schema = %schema.name, attempt, error = %e, "structured call failed");
                last_error = e.into();
                continue;
            }
        };
        match parse(raw) {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(schema = %schema.name, attempt, error = %e, "schema validation failed");
                prompt = format!(
                    "{user}\n\nYour previous output was rejected: {e}. \
                     Return only a JSON object that strictly matches the schema."
                );
                last_error = e.into();
            }
        }
    }

    Err(last_error)
}
