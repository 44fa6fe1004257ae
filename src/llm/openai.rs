//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；支持 DeepSeek、OpenAI、自建代理等。
//! 所有请求 temperature=0；结构化请求附带 json_schema response_format，每次调用有独立超时。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    ResponseFormatJsonSchema,
};
use async_openai::Client;
use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{extract_json, LlmClient, LlmError, Message, Role};
use crate::schema::SchemaDescriptor;

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容客户端：持有 Client、model 名与单次请求超时
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
    /// 只支持 json_object 的端点（如 DeepSeek）：Schema 放进系统提示词
    json_object_mode: bool,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

/// 结构化请求的系统提示词与 response_format
fn structured_request(
    system: &str,
    schema: &SchemaDescriptor,
    json_object_mode: bool,
) -> (String, ResponseFormat) {
    if json_object_mode {
        let system = format!(
            "{system}\n\nRespond with a single JSON object that conforms to this JSON schema ({}):\n{}",
            schema.name, schema.schema
        );
        return (system, ResponseFormat::JsonObject);
    }
    let format = ResponseFormat::JsonSchema {
        json_schema: ResponseFormatJsonSchema {
            description: Some(schema.description.clone()),
            name: schema.name.clone(),
            schema: Some(schema.schema.clone()),
            strict: Some(false),
        },
    };
    (system.to_string(), format)
}

impl OpenAiClient {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            timeout: Duration::from_secs(timeout_secs),
            json_object_mode: false,
            usage: TokenUsage::new(),
        }
    }

    /// 结构化请求改用 json_object，Schema 随系统提示词发送
    pub fn with_json_object_mode(mut self) -> Self {
        self.json_object_mode = true;
        self
    }

    pub fn json_object_mode(&self) -> bool {
        self.json_object_mode
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn to_openai_messages(
        &self,
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        messages
            .iter()
            .map(|m| {
                let built = match m.role {
                    Role::System => ChatCompletionRequestSystemMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map(ChatCompletionRequestMessage::System),
                    Role::User => ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map(ChatCompletionRequestMessage::User),
                };
                built.map_err(|e| LlmError::Request(e.to_string()))
            })
            .collect()
    }

    async fn chat(
        &self,
        messages: &[Message],
        response_format: Option<ResponseFormat>,
    ) -> Result<String, LlmError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(self.to_openai_messages(messages)?)
            .temperature(0.0);
        if let Some(format) = response_format {
            args.response_format(format);
        }
        let request = args.build().map_err(|e| LlmError::Request(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        self.chat(&[Message::user(prompt)], None).await
    }

    async fn generate_structured(
        &self,
        system: &str,
        user: &str,
        schema: &SchemaDescriptor,
    ) -> Result<Value, LlmError> {
        let (system, format) = structured_request(system, schema, self.json_object_mode);
        let messages = [Message::system(system), Message::user(user)];
        let content = self.chat(&messages, Some(format)).await?;
        extract_json(&content)
    }
}
