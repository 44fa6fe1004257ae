//! Bee Reflect - Plan → Execute → Reflect 任务编排
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 状态机、决策路由、错误、产物与升级、构建器
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **observability**: 日志初始化
//! - **pipeline**: Planner、Executor、Reflector
//! - **schema**: 计划与反思结论的结构、JSON Schema 与校验
//! - **tools**: web_search / llm_analysis / llm_generation 与分发器

pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod pipeline;
pub mod schema;
pub mod tools;

pub use crate::core::{Orchestrator, OrchestratorBuilder, RunObserver};
