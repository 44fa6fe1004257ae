//! 运行过程事件：供 CLI / 前端展示计划、步骤、反思与最终结果

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::core::RunPhase;
use crate::schema::{ExecutionPlan, ReflectionVerdict};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    PhaseChanged { phase: RunPhase },
    PlanReady { plan: ExecutionPlan },
    /// 第几次执行（从 1 开始）
    AttemptStarted { attempt: u32, retry_count: u32 },
    StepStarted { step_id: u32, tool: String, action: String },
    StepCompleted { step_id: u32 },
    Verdict { verdict: ReflectionVerdict },
    Persisted { path: String },
    Escalated { reason: String },
}

/// 运行观察者：事件通道与取消令牌；各阶段只读使用
#[derive(Debug, Clone, Default)]
pub struct RunObserver {
    events: Option<UnboundedSender<RunEvent>>,
    cancel: CancellationToken,
}

impl RunObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, tx: UnboundedSender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// 推送事件；接收端已关闭时忽略
    pub fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
