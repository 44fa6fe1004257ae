//! 结构化输出的 Schema 描述（schemars 从数据类型自动生成）
//!
//! 描述会随请求发给 LLM，约束其只输出合法的 ExecutionPlan / ReflectionVerdict JSON。

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

use crate::schema::{ExecutionPlan, ReflectionVerdict};

pub const PLAN_SCHEMA_NAME: &str = "execution_plan";
pub const VERDICT_SCHEMA_NAME: &str = "reflection_verdict";

/// 结构化生成请求所需的 Schema：名称、描述、JSON Schema 本体
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

impl SchemaDescriptor {
    fn of<T: JsonSchema>(name: &str, description: &str) -> Self {
        let schema = serde_json::to_value(schema_for!(T)).unwrap_or_default();
        Self {
            name: name.to_string(),
            description: description.to_string(),
            schema,
        }
    }

    pub fn plan() -> Self {
        Self::of::<ExecutionPlan>(
            PLAN_SCHEMA_NAME,
            "Step-by-step execution plan with a markdown output artifact",
        )
    }

    pub fn verdict() -> Self {
        Self::of::<ReflectionVerdict>(
            VERDICT_SCHEMA_NAME,
            "Quality evaluation of a generated document",
        )
    }
}
