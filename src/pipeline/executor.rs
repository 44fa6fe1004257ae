//! Executor：按声明顺序逐步执行计划
//!
//! 每次调用从空 WorkingState 开始，逐步交给 ToolDispatcher；任一步失败即中止整次执行，
//! 错误带上 step_id。单步不重试，整次重试由 Orchestrator 决定。

use crate::core::{AgentError, RunEvent, RunObserver, Stage};
use crate::schema::{ExecutionPlan, PlanStep};
use crate::tools::{ToolDispatcher, ToolError, WorkingState};

pub struct PlanExecutor {
    dispatcher: ToolDispatcher,
}

fn tag_step_error(step: &PlanStep, err: ToolError) -> AgentError {
    match err {
        ToolError::Unsupported(name) => AgentError::UnsupportedTool {
            step_id: step.step_id,
            name,
        },
        ToolError::MissingPrecondition { tool, missing } => AgentError::MissingPrecondition {
            step_id: step.step_id,
            tool,
            missing,
        },
        other => AgentError::ExecutionFailure {
            step_id: step.step_id,
            tool: step.tool.clone(),
            message: other.to_string(),
        },
    }
}

impl PlanExecutor {
    pub fn new(dispatcher: ToolDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        observer: &RunObserver,
    ) -> Result<WorkingState, AgentError> {
        let mut working = WorkingState::new();

        for step in &plan.steps {
            if observer.is_cancelled() {
                return Err(AgentError::Cancelled(Stage::Executing));
            }
            tracing::info!(step_id = step.step_id, tool = %step.tool, "Executing Step {}: {}", step.step_id, step.action);
            observer.emit(RunEvent::StepStarted {
                step_id: step.step_id,
                tool: step.tool.clone(),
                action: step.action.clone(),
            });

            working = self
                .dispatcher
                .dispatch(step, working)
                .await
                .map_err(|e| tag_step_error(step, e))?;

            observer.emit(RunEvent::StepCompleted {
                step_id: step.step_id,
            });
        }

        Ok(working)
    }
}
