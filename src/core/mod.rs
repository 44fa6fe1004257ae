//! 核心编排层：状态机、路由、错误、产物与升级、会话监管、构建器

pub mod artifact;
pub mod builder;
pub mod error;
pub mod escalation;
pub mod events;
pub mod orchestrator;
pub mod router;
pub mod session_supervisor;
pub mod state;

pub use artifact::{Artifact, ArtifactError, ArtifactSink, FsArtifactSink};
pub use builder::{create_llm_from_config, create_search_from_config, OrchestratorBuilder};
pub use error::{AgentError, Stage};
pub use escalation::{EscalationReason, EscalationReport, EscalationSink, LogEscalationSink};
pub use events::{RunEvent, RunObserver};
pub use orchestrator::{Orchestrator, RetryStrategy, RunPolicy};
pub use router::{route, route_decision, RouteAction};
pub use session_supervisor::SessionSupervisor;
pub use state::{RunPhase, RunState};
