//! 决策路由：(decision, retry_count, max_retries) -> Persist / ReExecute / Escalate
//!
//! 纯函数，不读取工作状态、计划或任何协作方。

use serde::Serialize;

use crate::schema::{Decision, ReflectionVerdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    /// 写出产物
    Persist,
    /// 重新执行；调用方须先将 retry_count 加一
    ReExecute,
    /// 交给人工
    Escalate,
}

pub fn route_decision(decision: Decision, retry_count: u32, max_retries: u32) -> RouteAction {
    match decision {
        Decision::Accept => RouteAction::Persist,
        Decision::Retry if retry_count < max_retries => RouteAction::ReExecute,
        Decision::Retry | Decision::Escalate => RouteAction::Escalate,
    }
}

pub fn route(verdict: &ReflectionVerdict, retry_count: u32, max_retries: u32) -> RouteAction {
    route_decision(verdict.decision, retry_count, max_retries)
}
