//! 升级（人工复核）
//!
//! 任何未走到 Persist 的 run 都以 EscalationReport 结束：目标、计划、最后一次结论、原因。
//! EscalationSink 决定报告去向；LogEscalationSink 记录日志并可选落盘为 JSON。

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::{AgentError, RunState};
use crate::schema::{ExecutionPlan, ReflectionVerdict};

/// 升级原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EscalationReason {
    /// 反思结论为 escalate
    ReviewerEscalated,
    /// 反思要求重试，但重试预算已用完
    RetryBudgetExhausted { max_retries: u32 },
    /// 未恢复的错误（规划失败、不支持的工具、反思失败、写入失败、取消等）
    Fatal {
        stage: String,
        step_id: Option<u32>,
        message: String,
    },
}

impl EscalationReason {
    pub fn from_error(err: &AgentError) -> Self {
        EscalationReason::Fatal {
            stage: err.stage().to_string(),
            step_id: err.step_id(),
            message: err.to_string(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, EscalationReason::Fatal { .. })
    }
}

impl std::fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscalationReason::ReviewerEscalated => write!(f, "reviewer requested escalation"),
            EscalationReason::RetryBudgetExhausted { max_retries } => {
                write!(f, "retry budget exhausted after {max_retries} retries")
            }
            EscalationReason::Fatal { stage, message, .. } => write!(f, "{stage}: {message}"),
        }
    }
}

/// 结构化升级报告
#[derive(Debug, Clone, Serialize)]
pub struct EscalationReport {
    pub run_id: String,
    pub objective: String,
    pub plan: Option<ExecutionPlan>,
    pub last_verdict: Option<ReflectionVerdict>,
    pub retry_count: u32,
    pub reason: EscalationReason,
    pub created_at: DateTime<Utc>,
}

impl EscalationReport {
    pub fn from_state(state: &RunState, reason: EscalationReason) -> Self {
        Self {
            run_id: state.run_id.clone(),
            objective: state.objective.clone(),
            plan: state.plan.clone(),
            last_verdict: state.verdict,
            retry_count: state.retry_count,
            reason,
            created_at: Utc::now(),
        }
    }

    /// 触发升级的阶段；质量门结论均来自反思阶段
    pub fn stage(&self) -> &str {
        match &self.reason {
            EscalationReason::Fatal { stage, .. } => stage,
            _ => "reflecting",
        }
    }
}

/// 升级接收方；是否阻塞等待人工由实现决定
#[async_trait]
pub trait EscalationSink: Send + Sync {
    async fn escalate(&self, report: &EscalationReport);
}

/// 记录 warn 日志；配置了 report_dir 时写出 escalation-<run_id>.json
#[derive(Debug, Clone, Default)]
pub struct LogEscalationSink {
    report_dir: Option<PathBuf>,
}

impl LogEscalationSink {
    pub fn new(report_dir: Option<PathBuf>) -> Self {
        Self { report_dir }
    }

    fn report_path(&self, run_id: &str) -> Option<PathBuf> {
        self.report_dir
            .as_ref()
            .map(|dir| dir.join(format!("escalation-{run_id}.json")))
    }
}

#[async_trait]
impl EscalationSink for LogEscalationSink {
    async fn escalate(&self, report: &EscalationReport) {
        tracing::warn!(
            run_id = %report.run_id,
            retry_count = report.retry_count,
            reason = %report.reason,
            "run escalated for human review"
        );
        let Some(path) = self.report_path(&report.run_id) else {
            return;
        };
        let json = match serde_json::to_string_pretty(report) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize escalation report");
                return;
            }
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::error!(error = %e, "failed to create escalation dir");
                return;
            }
        }
        if let Err(e) = tokio::fs::write(&path, json).await {
            tracing::error!(path = %path.display(), error = %e, "failed to write escalation report");
        }
    }
}
