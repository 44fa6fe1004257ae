//! 编排器：Plan → Execute → Reflect 主控循环
//!
//! 状态机：Planning → Executing → Reflecting → {Persisting | Escalated}。
//! Reflecting → Executing 的回边由 [`route`] 决定，Executing 最多进入 max_retries + 1 次。
//! 阶段之间检查取消；任何未恢复的错误都收敛为 [`EscalationReport`]，只有 Persisting 会写产物。

use std::sync::Arc;

use serde::Deserialize;

use crate::core::{
    route, AgentError, Artifact, ArtifactSink, EscalationReason, EscalationReport,
    EscalationSink, RouteAction, RunEvent, RunObserver, RunPhase, RunState, Stage,
};
use crate::pipeline::{PlanExecutor, Planner, Reflector};
use crate::schema::{Decision, ExecutionPlan, ReflectionVerdict};

/// 反思要求重试时如何处理计划
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// 沿用同一份计划重新执行
    #[default]
    ReusePlan,
    /// 先重新规划再执行；重新规划失败视为 PlanningFailure
    Replan,
}

/// 单次 run 的重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPolicy {
    pub max_retries: u32,
    pub retry_strategy: RetryStrategy,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            retry_strategy: RetryStrategy::ReusePlan,
        }
    }
}

/// 循环结束的两种终态（错误另走 Err 分支）
enum Terminal {
    Persisted(Artifact),
    Escalated(EscalationReason),
}

fn checkpoint(observer: &RunObserver, stage: Stage) -> Result<(), AgentError> {
    if observer.is_cancelled() {
        return Err(AgentError::Cancelled(stage));
    }
    Ok(())
}

/// 反思结论走到 Escalate 时的原因
fn escalation_reason(verdict: &ReflectionVerdict, max_retries: u32) -> EscalationReason {
    match verdict.decision {
        Decision::Retry => EscalationReason::RetryBudgetExhausted { max_retries },
        _ => EscalationReason::ReviewerEscalated,
    }
}

pub struct Orchestrator {
    planner: Planner,
    executor: PlanExecutor,
    reflector: Reflector,
    artifacts: Arc<dyn ArtifactSink>,
    escalation: Arc<dyn EscalationSink>,
    policy: RunPolicy,
}

impl Orchestrator {
    pub fn new(
        planner: Planner,
        executor: PlanExecutor,
        reflector: Reflector,
        artifacts: Arc<dyn ArtifactSink>,
        escalation: Arc<dyn EscalationSink>,
    ) -> Self {
        Self {
            planner,
            executor,
            reflector,
            artifacts,
            escalation,
            policy: RunPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RunPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RunPolicy {
        self.policy
    }

    /// 运行一个目标直到终态：成功返回写入的产物，否则返回升级报告（已交给 EscalationSink）
    pub async fn run(
        &self,
        objective: &str,
        observer: &RunObserver,
    ) -> Result<Artifact, EscalationReport> {
        let mut state = RunState::new(objective);
        tracing::info!(
            run_id = %state.run_id,
            max_retries = self.policy.max_retries,
            "run started"
        );

        let reason = match self.drive(&mut state, observer).await {
            Ok(Terminal::Persisted(artifact)) => {
                let (prompt_tokens, completion_tokens, total_tokens) = self.token_usage();
                tracing::info!(
                    run_id = %state.run_id,
                    attempts = state.attempts,
                    path = %artifact.path.display(),
                    prompt_tokens,
                    completion_tokens,
                    total_tokens,
                    "run persisted"
                );
                return Ok(artifact);
            }
            Ok(Terminal::Escalated(reason)) => reason,
            Err(e) => {
                tracing::error!(run_id = %state.run_id, stage = %e.stage(), error = %e, "run failed");
                EscalationReason::from_error(&e)
            }
        };

        Err(self.escalate(&mut state, reason, observer).await)
    }

    /// LLM 累计 token 用量 (prompt, completion, total)；句柄共享时包含工具调用
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.planner.token_usage()
    }

    fn enter(&self, state: &mut RunState, phase: RunPhase, observer: &RunObserver) {
        state.phase = phase;
        tracing::info!(run_id = %state.run_id, phase = ?phase, retry_count = state.retry_count, "phase");
        observer.emit(RunEvent::PhaseChanged { phase });
    }

    async fn make_plan(
        &self,
        state: &mut RunState,
        observer: &RunObserver,
    ) -> Result<ExecutionPlan, AgentError> {
        checkpoint(observer, Stage::Planning)?;
        let plan = self.planner.plan(&state.objective).await?;
        observer.emit(RunEvent::PlanReady { plan: plan.clone() });
        state.plan = Some(plan.clone());
        Ok(plan)
    }

    async fn drive(
        &self,
        state: &mut RunState,
        observer: &RunObserver,
    ) -> Result<Terminal, AgentError> {
        self.enter(state, RunPhase::Planning, observer);
        let mut plan = self.make_plan(state, observer).await?;

        loop {
            checkpoint(observer, Stage::Executing)?;
            state.begin_attempt();
            self.enter(state, RunPhase::Executing, observer);
            observer.emit(RunEvent::AttemptStarted {
                attempt: state.attempts,
                retry_count: state.retry_count,
            });

            state.working = self.executor.execute(&plan, observer).await?;
            let output = state
                .working
                .final_output
                .clone()
                .ok_or(AgentError::MissingArtifact)?;

            checkpoint(observer, Stage::Reflecting)?;
            self.enter(state, RunPhase::Reflecting, observer);
            let verdict = self.reflector.reflect(&output).await?;
            state.verdict = Some(verdict);
            observer.emit(RunEvent::Verdict { verdict });

            match route(&verdict, state.retry_count, self.policy.max_retries) {
                RouteAction::Persist => {
                    checkpoint(observer, Stage::Persisting)?;
                    // 写入成功后才进入 Persisting
                    let path = self.artifacts.write(&plan.output_artifact, &output).await?;
                    self.enter(state, RunPhase::Persisting, observer);
                    observer.emit(RunEvent::Persisted {
                        path: path.display().to_string(),
                    });
                    return Ok(Terminal::Persisted(Artifact {
                        run_id: state.run_id.clone(),
                        path,
                        content: output,
                        plan,
                        verdict,
                        retry_count: state.retry_count,
                    }));
                }
                RouteAction::ReExecute => {
                    state.record_retry(self.policy.max_retries);
                    tracing::info!(
                        run_id = %state.run_id,
                        retry_count = state.retry_count,
                        strategy = ?self.policy.retry_strategy,
                        "reflection requested retry"
                    );
                    if self.policy.retry_strategy == RetryStrategy::Replan {
                        plan = self.make_plan(state, observer).await?;
                    }
                }
                RouteAction::Escalate => {
                    return Ok(Terminal::Escalated(escalation_reason(
                        &verdict,
                        self.policy.max_retries,
                    )));
                }
            }
        }
    }

    async fn escalate(
        &self,
        state: &mut RunState,
        reason: EscalationReason,
        observer: &RunObserver,
    ) -> EscalationReport {
        self.enter(state, RunPhase::Escalated, observer);
        let (_, _, total_tokens) = self.token_usage();
        tracing::info!(run_id = %state.run_id, attempts = state.attempts, total_tokens, "run escalated");
        observer.emit(RunEvent::Escalated {
            reason: reason.to_string(),
        });
        let report = EscalationReport::from_state(state, reason);
        self.escalation.escalate(&report).await;
        report
    }
}
