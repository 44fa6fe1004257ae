//! Bee Reflect 命令行入口
//!
//! 初始化日志、加载配置、构建 Orchestrator 并运行一个目标；
//! 运行事件实时打印到 stdout。退出码：0 产物已写入，2 已升级（打印报告 JSON），1 初始化失败。

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use bee_reflect::config::load_config;
use bee_reflect::core::{
    EscalationReport, OrchestratorBuilder, RetryStrategy, RunEvent, RunObserver,
    SessionSupervisor,
};
use clap::Parser;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(
    name = "bee-reflect",
    version,
    about = "Plan, execute and reflect on an objective with bounded retries"
)]
struct Cli {
    /// Extra TOML config file, layered over config/default.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of reflection-driven re-executions.
    #[arg(long)]
    max_retries: Option<u32>,

    /// Ask the planner for a fresh plan before each retry.
    #[arg(long)]
    replan: bool,

    /// The objective to accomplish.
    #[arg(required = true, num_args = 1..)]
    objective: Vec<String>,
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// 把运行事件渲染到 stdout
fn render(event: RunEvent) {
    match event {
        RunEvent::PlanReady { plan } => {
            println!("\n=== PLAN ===");
            println!("{}", pretty(&plan));
        }
        RunEvent::AttemptStarted { attempt, retry_count } if retry_count > 0 => {
            println!("\n=== RETRY {retry_count} (attempt {attempt}) ===");
        }
        RunEvent::StepStarted { step_id, action, .. } => {
            println!("Executing Step {step_id}: {action}");
        }
        RunEvent::Verdict { verdict } => {
            println!("\n=== REFLECTION ===");
            println!("{}", pretty(&verdict));
        }
        RunEvent::Persisted { path } => {
            println!("\nArtifact written to {path}");
        }
        _ => {}
    }
}

async fn run(cli: Cli) -> anyhow::Result<Result<(), EscalationReport>> {
    let cfg = load_config(cli.config.clone()).context("Failed to load config")?;

    let mut builder = OrchestratorBuilder::new(cfg);
    if let Some(max_retries) = cli.max_retries {
        builder = builder.with_max_retries(max_retries);
    }
    if cli.replan {
        builder = builder.with_retry_strategy(RetryStrategy::Replan);
    }
    let orchestrator = builder.build().context("Failed to build orchestrator")?;

    let supervisor = SessionSupervisor::new();
    supervisor.install_ctrl_c();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            render(event);
        }
    });

    let observer = RunObserver::new()
        .with_events(tx)
        .with_cancel(supervisor.child_token());
    let objective = cli.objective.join(" ");
    let outcome = orchestrator.run(&objective, &observer).await;

    // 关闭发送端后等待打印完剩余事件
    drop(observer);
    let _ = printer.await;

    Ok(outcome.map(|_| ()))
}

#[tokio::main]
async fn main() -> ExitCode {
    bee_reflect::observability::init();

    match run(Cli::parse()).await {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(report)) => {
            println!("\n=== ESCALATED ===");
            println!("{}", pretty(&report));
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::from(1)
        }
    }
}
