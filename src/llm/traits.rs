//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient：
//! generate_text（自由文本，供分析 / 生成工具）、generate_structured（Schema 约束输出，供 Planner / Reflector）。

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::schema::SchemaDescriptor;

/// LLM 调用错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    #[error("LLM returned empty content")]
    EmptyResponse,

    #[error("LLM returned non-JSON content: {0}")]
    InvalidJson(String),
}

/// LLM 客户端 trait；实现需可重入（多个 run 可共享同一句柄）
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 自由文本生成
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError>;

    /// 确定性（temperature=0）的结构化生成，返回未经校验的原始 JSON
    async fn generate_structured(
        &self,
        system: &str,
        user: &str,
        schema: &SchemaDescriptor,
    ) -> Result<Value, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 从模型回复中提取 JSON（兼容 ```json ... ``` 包裹）
pub fn extract_json(output: &str) -> Result<Value, LlmError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim())
    } else if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            &trimmed[start..=end]
        } else {
            trimmed
        }
    } else {
        trimmed
    };
    serde_json::from_str(json_str).map_err(|e| LlmError::InvalidJson(format!("{e}: {json_str}")))
}
