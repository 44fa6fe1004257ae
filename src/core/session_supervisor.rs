//! 会话监管：取消管理
//!
//! 持有 CancellationToken；Orchestrator 在阶段与步骤之间检查取消，
//! 每个 run 使用子 token，用户 Ctrl+C 时整体取消。

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct SessionSupervisor {
    cancel_token: CancellationToken,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 触发取消（用户 Ctrl+C）
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// 创建子 token（用于单个 run）
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    /// 安装 Ctrl+C 处理器：收到信号后取消所有 run
    pub fn install_ctrl_c(&self) {
        let supervisor = self.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                tracing::info!("Received Ctrl+C, cancelling run...");
                supervisor.cancel();
            }
        });
    }
}
