//! 结构化输出校验
//!
//! LLM 返回的原始 JSON 先检查必填字段，再反序列化，最后做语义校验
//! （工具名、步骤非空、step_id 唯一升序、评分 1–5、decision 取值）。

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::schema::{Decision, ExecutionPlan, ReflectionVerdict};

const PLAN_FIELDS: [&str; 3] = ["objective", "steps", "output_artifact"];
const STEP_FIELDS: [&str; 4] = ["step_id", "action", "tool", "expected_output"];
const VERDICT_FIELDS: [&str; 5] = [
    "completeness_score",
    "clarity_score",
    "actionability_score",
    "format_compliance",
    "decision",
];

/// 结构化输出不符合形状时的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaValidationError {
    #[error("expected a JSON object for {0}")]
    NotAnObject(&'static str),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("field has the wrong type: {0}")]
    WrongType(String),

    #[error("plan has no steps")]
    EmptySteps,

    #[error("step {step_id} uses unsupported tool: {tool}")]
    UnsupportedTool { step_id: u32, tool: String },

    #[error("step_id {step_id} is duplicated or not ascending")]
    StepOrder { step_id: u32 },

    #[error("output_artifact is empty")]
    EmptyOutputArtifact,

    #[error("{field} out of range 1-5: {value}")]
    ScoreOutOfRange { field: &'static str, value: u8 },

    #[error("unknown decision: {0}")]
    UnknownDecision(String),
}

fn require_fields(
    value: &Value,
    what: &'static str,
    prefix: &str,
    fields: &[&str],
) -> Result<(), SchemaValidationError> {
    let obj = value
        .as_object()
        .ok_or(SchemaValidationError::NotAnObject(what))?;
    for field in fields {
        match obj.get(*field) {
            None | Some(Value::Null) => {
                return Err(SchemaValidationError::MissingField(format!("{prefix}{field}")))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, SchemaValidationError> {
    serde_json::from_value(value).map_err(|e| SchemaValidationError::WrongType(e.to_string()))
}

/// 校验并解析执行计划
pub fn parse_plan(value: Value) -> Result<ExecutionPlan, SchemaValidationError> {
    require_fields(&value, "plan", "", &PLAN_FIELDS)?;
    let steps = value
        .get("steps")
        .and_then(Value::as_array)
        .ok_or_else(|| SchemaValidationError::WrongType("steps must be an array".to_string()))?;
    for (i, step) in steps.iter().enumerate() {
        require_fields(step, "step", &format!("steps[{i}]."), &STEP_FIELDS)?;
    }

    let plan: ExecutionPlan = decode(value)?;
    validate_plan(&plan)?;
    Ok(plan)
}

/// 对已成型的计划做语义校验（也用于从文件载入的计划）
pub fn validate_plan(plan: &ExecutionPlan) -> Result<(), SchemaValidationError> {
    if plan.steps.is_empty() {
        return Err(SchemaValidationError::EmptySteps);
    }
    if plan.output_artifact.trim().is_empty() {
        return Err(SchemaValidationError::EmptyOutputArtifact);
    }
    let mut last: Option<u32> = None;
    for step in &plan.steps {
        if step.tool_kind().is_none() {
            return Err(SchemaValidationError::UnsupportedTool {
                step_id: step.step_id,
                tool: step.tool.clone(),
            });
        }
        if last.is_some_and(|prev| step.step_id <= prev) {
            return Err(SchemaValidationError::StepOrder {
                step_id: step.step_id,
            });
        }
        last = Some(step.step_id);
    }
    Ok(())
}

/// 校验并解析反思结论
pub fn parse_verdict(value: Value) -> Result<ReflectionVerdict, SchemaValidationError> {
    require_fields(&value, "verdict", "", &VERDICT_FIELDS)?;
    if let Some(raw) = value.get("decision").and_then(Value::as_str) {
        if Decision::from_name(raw).is_none() {
            return Err(SchemaValidationError::UnknownDecision(raw.to_string()));
        }
    }

    let verdict: ReflectionVerdict = decode(value)?;
    for (field, score) in [
        ("completeness_score", verdict.completeness_score),
        ("clarity_score", verdict.clarity_score),
        ("actionability_score", verdict.actionability_score),
    ] {
        if !(1..=5).contains(&score) {
            return Err(SchemaValidationError::ScoreOutOfRange {
                field,
                value: score,
            });
        }
    }
    Ok(verdict)
}
