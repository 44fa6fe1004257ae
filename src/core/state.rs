//! 运行状态：阶段与 RunState
//!
//! RunState 由 Orchestrator 独占；retry_count 是唯一跨循环保留的字段，
//! 工作状态在每次执行前重建。

use serde::Serialize;

use crate::schema::{ExecutionPlan, ReflectionVerdict};
use crate::tools::WorkingState;

/// 状态机阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Planning,
    Executing,
    Reflecting,
    Persisting,
    Escalated,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Persisting | RunPhase::Escalated)
    }
}

/// 单次 run 的完整状态
#[derive(Clone, Debug, Serialize)]
pub struct RunState {
    pub run_id: String,
    pub objective: String,
    pub phase: RunPhase,
    pub plan: Option<ExecutionPlan>,
    pub working: WorkingState,
    pub verdict: Option<ReflectionVerdict>,
    pub retry_count: u32,
    /// 进入 Executing 的次数
    pub attempts: u32,
}

impl RunState {
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            objective: objective.into(),
            phase: RunPhase::Planning,
            plan: None,
            working: WorkingState::default(),
            verdict: None,
            retry_count: 0,
            attempts: 0,
        }
    }

    /// 进入 Executing：工作状态清空重建
    pub fn begin_attempt(&mut self) {
        self.phase = RunPhase::Executing;
        self.working = WorkingState::default();
        self.attempts += 1;
    }

    /// 路由选择重新执行：retry_count 加一
    pub fn record_retry(&mut self, max_retries: u32) {
        debug_assert!(self.retry_count < max_retries);
        self.retry_count += 1;
    }
}
