//! Schema 层：计划 / 步骤 / 反思结论的类型、结构化输出描述与校验

pub mod descriptor;
pub mod types;
pub mod validate;

pub use descriptor::{SchemaDescriptor, PLAN_SCHEMA_NAME, VERDICT_SCHEMA_NAME};
pub use types::{Decision, ExecutionPlan, PlanStep, ReflectionVerdict, ToolKind};
pub use validate::{parse_plan, parse_verdict, validate_plan, SchemaValidationError};
