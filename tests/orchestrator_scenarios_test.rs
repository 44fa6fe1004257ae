//! 编排器集成测试：用脚本化的 LLM / 搜索协作方驱动完整的 Plan → Execute → Reflect 流程

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use bee_reflect::config::AppConfig;
    use bee_reflect::core::{
        EscalationReason, EscalationReport, EscalationSink, FsArtifactSink, LogEscalationSink,
        Orchestrator, OrchestratorBuilder, RetryStrategy, RunEvent, RunObserver, RunPhase,
    };
    use bee_reflect::llm::{LlmClient, LlmError};
    use bee_reflect::pipeline::{PlanExecutor, Planner, Reflector};
    use bee_reflect::schema::{Decision, SchemaDescriptor, PLAN_SCHEMA_NAME, VERDICT_SCHEMA_NAME};
    use bee_reflect::tools::{
        LlmAnalysisTool, MissingContextPolicy, SearchClient, SearchError, ToolDispatcher,
        ToolRegistry, WebSearchTool,
    };
    use serde_json::{json, Value};
    use tokio_util::sync::CancellationToken;

    /// 按脚本依次返回计划与结论；llm_generation 返回带序号的文档
    #[derive(Default)]
    struct ScriptedLlm {
        plans: Mutex<VecDeque<Value>>,
        verdicts: Mutex<VecDeque<Value>>,
        plan_calls: AtomicUsize,
        verdict_calls: AtomicUsize,
        generations: AtomicUsize,
    }

    impl ScriptedLlm {
        fn new(plans: Vec<Value>, verdicts: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                plans: Mutex::new(plans.into()),
                verdicts: Mutex::new(verdicts.into()),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
            if prompt.starts_with("Create an executive-ready summary") {
                let n = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(format!("# Report v{n}\n\n- insight\n"))
            } else {
                Ok("key insights".to_string())
            }
        }

        async fn generate_structured(
            &self,
            _system: &str,
            _user: &str,
            schema: &SchemaDescriptor,
        ) -> Result<Value, LlmError> {
            let queue = match schema.name.as_str() {
                PLAN_SCHEMA_NAME => {
                    self.plan_calls.fetch_add(1, Ordering::SeqCst);
                    &self.plans
                }
                VERDICT_SCHEMA_NAME => {
                    self.verdict_calls.fetch_add(1, Ordering::SeqCst);
                    &self.verdicts
                }
                other => return Err(LlmError::Request(format!("unexpected schema {other}"))),
            };
            queue
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::Request("script exhausted".to_string()))
        }
    }

    /// 记录调用次数；可选在调用时触发取消
    #[derive(Default)]
    struct CountingSearch {
        calls: AtomicUsize,
        cancel_on_call: Option<CancellationToken>,
    }

    #[async_trait]
    impl SearchClient for CountingSearch {
        async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<Value>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(token) = &self.cancel_on_call {
                token.cancel();
            }
            Ok(vec![json!({"title": query, "content": "result"})])
        }
    }

    #[derive(Default)]
    struct RecordingEscalations {
        reports: Mutex<Vec<EscalationReport>>,
    }

    #[async_trait]
    impl EscalationSink for RecordingEscalations {
        async fn escalate(&self, report: &EscalationReport) {
            self.reports.lock().unwrap().push(report.clone());
        }
    }

    fn plan_with(output: &str, tools: &[&str]) -> Value {
        let steps: Vec<Value> = tools
            .iter()
            .enumerate()
            .map(|(i, tool)| {
                json!({
                    "step_id": i + 1,
                    "action": format!("step {} action", i + 1),
                    "tool": tool,
                    "expected_output": "output"
                })
            })
            .collect();
        json!({
            "objective": "Summarize the latest AI developer tooling announcements",
            "steps": steps,
            "output_artifact": output
        })
    }

    fn standard_plan() -> Value {
        plan_with("report.md", &["web_search", "llm_analysis", "llm_generation"])
    }

    fn verdict(decision: &str) -> Value {
        json!({
            "completeness_score": 4,
            "clarity_score": 4,
            "actionability_score": 3,
            "format_compliance": true,
            "decision": decision
        })
    }

    struct Harness {
        llm: Arc<ScriptedLlm>,
        search: Arc<CountingSearch>,
        escalations: Arc<RecordingEscalations>,
        orchestrator: Orchestrator,
    }

    fn harness(
        root: &Path,
        llm: Arc<ScriptedLlm>,
        max_retries: u32,
        strategy: RetryStrategy,
    ) -> Harness {
        harness_with_search(root, llm, Arc::new(CountingSearch::default()), max_retries, strategy)
    }

    fn harness_with_search(
        root: &Path,
        llm: Arc<ScriptedLlm>,
        search: Arc<CountingSearch>,
        max_retries: u32,
        strategy: RetryStrategy,
    ) -> Harness {
        let mut cfg = AppConfig::default();
        cfg.llm.schema_retries = 0;
        let escalations = Arc::new(RecordingEscalations::default());
        let orchestrator = OrchestratorBuilder::new(cfg)
            .with_llm(llm.clone())
            .with_search(search.clone())
            .with_artifact_sink(Arc::new(FsArtifactSink::new(root)))
            .with_escalation_sink(escalations.clone())
            .with_max_retries(max_retries)
            .with_retry_strategy(strategy)
            .build()
            .unwrap();
        Harness {
            llm,
            search,
            escalations,
            orchestrator,
        }
    }

    async fn run_collecting(
        orchestrator: &Orchestrator,
        observer: RunObserver,
    ) -> (Result<bee_reflect::core::Artifact, EscalationReport>, Vec<RunEvent>) {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let observer = observer.with_events(tx);
        let outcome = orchestrator
            .run("Summarize the latest AI developer tooling announcements", &observer)
            .await;
        drop(observer);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (outcome, events)
    }

    fn attempts(events: &[RunEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, RunEvent::AttemptStarted { .. }))
            .count()
    }

    #[tokio::test]
    async fn test_accept_writes_final_output() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(vec![standard_plan()], vec![verdict("accept")]);
        let h = harness(dir.path(), llm, 1, RetryStrategy::ReusePlan);

        let (outcome, events) = run_collecting(&h.orchestrator, RunObserver::new()).await;
        let artifact = outcome.unwrap();

        let written = std::fs::read_to_string(dir.path().join("report.md")).unwrap();
        assert_eq!(written, "# Report v1\n\n- insight\n");
        assert_eq!(artifact.content, written);
        assert_eq!(artifact.verdict.decision, Decision::Accept);
        assert_eq!(artifact.retry_count, 0);
        assert_eq!(attempts(&events), 1);
        assert!(events.iter().any(|e| matches!(
            e,
            RunEvent::PhaseChanged { phase: RunPhase::Persisting }
        )));
        assert_eq!(h.search.calls.load(Ordering::SeqCst), 1);
        assert!(h.escalations.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retry_with_budget_reexecutes_with_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(vec![standard_plan()], vec![verdict("retry"), verdict("accept")]);
        let h = harness(dir.path(), llm, 1, RetryStrategy::ReusePlan);

        let (outcome, events) = run_collecting(&h.orchestrator, RunObserver::new()).await;
        let artifact = outcome.unwrap();

        assert_eq!(artifact.retry_count, 1);
        assert_eq!(artifact.content, "# Report v2\n\n- insight\n");
        assert_eq!(attempts(&events), 2);
        assert!(events.iter().any(|e| matches!(
            e,
            RunEvent::AttemptStarted { attempt: 2, retry_count: 1 }
        )));
        // 同一计划重新执行，搜索重新发起
        assert_eq!(h.search.calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.llm.plan_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_with_budget_exhausted_escalates() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(vec![standard_plan()], vec![verdict("retry"), verdict("retry")]);
        let h = harness(dir.path(), llm, 1, RetryStrategy::ReusePlan);

        let (outcome, events) = run_collecting(&h.orchestrator, RunObserver::new()).await;
        let report = outcome.unwrap_err();

        assert_eq!(
            report.reason,
            EscalationReason::RetryBudgetExhausted { max_retries: 1 }
        );
        assert_eq!(report.retry_count, 1);
        assert_eq!(report.last_verdict.map(|v| v.decision), Some(Decision::Retry));
        assert!(report.plan.is_some());
        assert_eq!(attempts(&events), 2);
        assert!(!dir.path().join("report.md").exists());
        assert_eq!(h.escalations.reports.lock().unwrap().len(), 1);
        assert!(matches!(events.last(), Some(RunEvent::Escalated { .. })));
    }

    #[tokio::test]
    async fn test_execution_bounded_by_retry_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let verdicts = (0..10).map(|_| verdict("retry")).collect();
        let llm = ScriptedLlm::new(vec![standard_plan()], verdicts);
        let h = harness(dir.path(), llm, 3, RetryStrategy::ReusePlan);

        let (outcome, events) = run_collecting(&h.orchestrator, RunObserver::new()).await;
        let report = outcome.unwrap_err();

        assert_eq!(attempts(&events), 4);
        assert_eq!(h.llm.verdict_calls.load(Ordering::SeqCst), 4);
        assert_eq!(report.retry_count, 3);
        assert_eq!(
            report.reason,
            EscalationReason::RetryBudgetExhausted { max_retries: 3 }
        );
    }

    #[tokio::test]
    async fn test_zero_retry_budget_escalates_first_retry() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(vec![standard_plan()], vec![verdict("retry")]);
        let h = harness(dir.path(), llm, 0, RetryStrategy::ReusePlan);

        let (outcome, events) = run_collecting(&h.orchestrator, RunObserver::new()).await;
        assert!(outcome.is_err());
        assert_eq!(attempts(&events), 1);
    }

    #[tokio::test]
    async fn test_reviewer_escalation_keeps_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.md"), "previous").unwrap();
        let llm = ScriptedLlm::new(vec![standard_plan()], vec![verdict("escalate")]);
        let h = harness(dir.path(), llm, 1, RetryStrategy::ReusePlan);

        let (outcome, _) = run_collecting(&h.orchestrator, RunObserver::new()).await;
        let report = outcome.unwrap_err();

        assert_eq!(report.reason, EscalationReason::ReviewerEscalated);
        assert_eq!(report.stage(), "reflecting");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("report.md")).unwrap(),
            "previous"
        );
    }

    #[tokio::test]
    async fn test_unregistered_tool_is_fatal_without_reflection() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(vec![standard_plan()], vec![verdict("accept")]);
        let search: Arc<dyn SearchClient> = Arc::new(CountingSearch::default());

        // llm_generation 未注册：计划合法，但分发时找不到工具
        let mut registry = ToolRegistry::new();
        registry.register(WebSearchTool::new(search, 5));
        registry.register(LlmAnalysisTool::new(llm.clone(), MissingContextPolicy::Degrade));
        let escalations = Arc::new(RecordingEscalations::default());
        let orchestrator = Orchestrator::new(
            Planner::new(llm.clone(), 0),
            PlanExecutor::new(ToolDispatcher::new(registry, 30)),
            Reflector::new(llm.clone(), 0),
            Arc::new(FsArtifactSink::new(dir.path())),
            escalations.clone(),
        );

        let (outcome, events) = run_collecting(&orchestrator, RunObserver::new()).await;
        let report = outcome.unwrap_err();

        match &report.reason {
            EscalationReason::Fatal {
                stage,
                step_id,
                message,
            } => {
                assert_eq!(stage, "executing");
                assert_eq!(*step_id, Some(3));
                assert!(message.contains("llm_generation"));
            }
            other => panic!("unexpected reason: {other:?}"),
        }
        assert_eq!(llm.verdict_calls.load(Ordering::SeqCst), 0);
        assert_eq!(attempts(&events), 1);
        assert_eq!(escalations.reports.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_plan_missing_output_artifact_is_planning_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad_plan = standard_plan();
        bad_plan.as_object_mut().unwrap().remove("output_artifact");
        let llm = ScriptedLlm::new(vec![bad_plan], vec![verdict("accept")]);
        let h = harness(dir.path(), llm, 1, RetryStrategy::ReusePlan);

        let (outcome, events) = run_collecting(&h.orchestrator, RunObserver::new()).await;
        let report = outcome.unwrap_err();

        assert_eq!(report.stage(), "planning");
        assert!(report.reason.to_string().contains("output_artifact"));
        assert!(report.plan.is_none());
        assert_eq!(attempts(&events), 0);
        assert_eq!(h.search.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.llm.verdict_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_schema_retry_recovers_planner_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad_plan = standard_plan();
        bad_plan["steps"][0]["tool"] = json!("shell");
        let llm = ScriptedLlm::new(vec![bad_plan, standard_plan()], vec![verdict("accept")]);

        let mut cfg = AppConfig::default();
        cfg.llm.schema_retries = 1;
        let orchestrator = OrchestratorBuilder::new(cfg)
            .with_llm(llm.clone())
            .with_search(Arc::new(CountingSearch::default()))
            .with_artifact_sink(Arc::new(FsArtifactSink::new(dir.path())))
            .with_escalation_sink(Arc::new(RecordingEscalations::default()))
            .build()
            .unwrap();

        let (outcome, _) = run_collecting(&orchestrator, RunObserver::new()).await;
        assert!(outcome.is_ok());
        assert_eq!(llm.plan_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reflection_failure_escalates() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(
            vec![standard_plan()],
            vec![json!({"decision": "accept"})],
        );
        let h = harness(dir.path(), llm, 1, RetryStrategy::ReusePlan);

        let (outcome, _) = run_collecting(&h.orchestrator, RunObserver::new()).await;
        let report = outcome.unwrap_err();

        assert!(report.reason.is_fatal());
        assert_eq!(report.stage(), "reflecting");
        assert!(report.last_verdict.is_none());
        assert!(!dir.path().join("report.md").exists());
    }

    #[tokio::test]
    async fn test_plan_without_generation_is_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan_with("report.md", &["web_search", "llm_analysis"]);
        let llm = ScriptedLlm::new(vec![plan], vec![verdict("accept")]);
        let h = harness(dir.path(), llm, 1, RetryStrategy::ReusePlan);

        let (outcome, _) = run_collecting(&h.orchestrator, RunObserver::new()).await;
        let report = outcome.unwrap_err();

        assert_eq!(report.stage(), "executing");
        assert!(report.reason.to_string().contains("no final output"));
        assert_eq!(h.llm.verdict_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_replan_strategy_uses_fresh_plan() {
        let dir = tempfile::tempdir().unwrap();
        let second = plan_with("second.md", &["web_search", "llm_analysis", "llm_generation"]);
        let llm = ScriptedLlm::new(
            vec![standard_plan(), second],
            vec![verdict("retry"), verdict("accept")],
        );
        let h = harness(dir.path(), llm, 1, RetryStrategy::Replan);

        let (outcome, events) = run_collecting(&h.orchestrator, RunObserver::new()).await;
        let artifact = outcome.unwrap();

        assert_eq!(artifact.path, dir.path().join("second.md"));
        assert_eq!(artifact.plan.output_artifact, "second.md");
        assert!(!dir.path().join("report.md").exists());
        assert_eq!(h.llm.plan_calls.load(Ordering::SeqCst), 2);
        let plans = events
            .iter()
            .filter(|e| matches!(e, RunEvent::PlanReady { .. }))
            .count();
        assert_eq!(plans, 2);
    }

    #[tokio::test]
    async fn test_replan_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::new(vec![standard_plan()], vec![verdict("retry")]);
        let h = harness(dir.path(), llm, 2, RetryStrategy::Replan);

        let (outcome, events) = run_collecting(&h.orchestrator, RunObserver::new()).await;
        let report = outcome.unwrap_err();

        assert_eq!(report.stage(), "planning");
        assert_eq!(report.retry_count, 1);
        assert_eq!(report.plan.map(|p| p.output_artifact), Some("report.md".to_string()));
        assert_eq!(attempts(&events), 1);
    }

    #[tokio::test]
    async fn test_steps_run_in_declared_order() {
        let dir = tempfile::tempdir().unwrap();
        let plan = json!({
            "objective": "objective",
            "steps": [
                {"step_id": 1, "action": "search", "tool": "web_search", "expected_output": "results"},
                {"step_id": 4, "action": "draft", "tool": "llm_generation", "expected_output": "draft"},
                {"step_id": 9, "action": "analyze", "tool": "llm_analysis", "expected_output": "insights"},
                {"step_id": 12, "action": "final", "tool": "llm_generation", "expected_output": "final"}
            ],
            "output_artifact": "ordered.md"
        });
        let llm = ScriptedLlm::new(vec![plan], vec![verdict("accept")]);
        let h = harness(dir.path(), llm, 1, RetryStrategy::ReusePlan);

        let (outcome, events) = run_collecting(&h.orchestrator, RunObserver::new()).await;
        let artifact = outcome.unwrap();

        let started: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::StepStarted { step_id, .. } => Some(*step_id),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec![1, 4, 9, 12]);
        // 最后一次 llm_generation 的产出生效
        assert_eq!(artifact.content, "# Report v2\n\n- insight\n");
    }

    #[tokio::test]
    async fn test_cancel_between_steps_escalates() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let search = Arc::new(CountingSearch {
            calls: AtomicUsize::new(0),
            cancel_on_call: Some(token.clone()),
        });
        let llm = ScriptedLlm::new(vec![standard_plan()], vec![verdict("accept")]);
        let h = harness_with_search(dir.path(), llm, search, 1, RetryStrategy::ReusePlan);

        let (outcome, events) =
            run_collecting(&h.orchestrator, RunObserver::new().with_cancel(token)).await;
        let report = outcome.unwrap_err();

        assert_eq!(report.stage(), "executing");
        assert!(report.reason.to_string().contains("cancelled"));
        let completed = events
            .iter()
            .filter(|e| matches!(e, RunEvent::StepCompleted { .. }))
            .count();
        assert_eq!(completed, 1);
        assert_eq!(h.llm.generations.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("report.md").exists());
    }

    #[tokio::test]
    async fn test_escalation_report_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let reports_dir = dir.path().join("escalations");
        let llm = ScriptedLlm::new(vec![standard_plan()], vec![verdict("escalate")]);

        let mut cfg = AppConfig::default();
        cfg.llm.schema_retries = 0;
        let orchestrator = OrchestratorBuilder::new(cfg)
            .with_llm(llm)
            .with_search(Arc::new(CountingSearch::default()))
            .with_artifact_sink(Arc::new(FsArtifactSink::new(dir.path())))
            .with_escalation_sink(Arc::new(LogEscalationSink::new(Some(reports_dir.clone()))))
            .build()
            .unwrap();

        let (outcome, _) = run_collecting(&orchestrator, RunObserver::new()).await;
        let report = outcome.unwrap_err();

        let path = reports_dir.join(format!("escalation-{}.json", report.run_id));
        let saved: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(saved["reason"]["kind"], "reviewer_escalated");
        assert_eq!(saved["last_verdict"]["decision"], "escalate");
        assert_eq!(saved["plan"]["output_artifact"], "report.md");
    }

    #[tokio::test]
    async fn test_artifact_path_escape_escalates_at_persist() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("out");
        let plan = plan_with("../escape.md", &["web_search", "llm_analysis", "llm_generation"]);
        let llm = ScriptedLlm::new(vec![plan], vec![verdict("accept")]);
        let h = harness(&root, llm, 1, RetryStrategy::ReusePlan);

        let (outcome, events) = run_collecting(&h.orchestrator, RunObserver::new()).await;
        let report = outcome.unwrap_err();

        assert_eq!(report.stage(), "persisting");
        assert!(report.reason.is_fatal());
        assert!(report.reason.to_string().contains("escape"));
        assert_eq!(report.last_verdict.map(|v| v.decision), Some(Decision::Accept));
        assert!(!dir.path().join("escape.md").exists());
        assert!(!root.join("escape.md").exists());

        let phases: Vec<RunPhase> = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::PhaseChanged { phase } => Some(*phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                RunPhase::Planning,
                RunPhase::Executing,
                RunPhase::Reflecting,
                RunPhase::Escalated
            ]
        );
        assert!(!events.iter().any(|e| matches!(e, RunEvent::Persisted { .. })));
        assert_eq!(h.escalations.reports.lock().unwrap().len(), 1);
    }
}
