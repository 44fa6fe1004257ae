//! 流水线阶段：Planner（规划）、PlanExecutor（执行）、Reflector（反思）

pub mod executor;
pub mod planner;
pub mod reflector;
mod structured;

pub use executor::PlanExecutor;
pub use planner::{Planner, PLANNER_SYSTEM_PROMPT};
pub use reflector::{reflection_input, Reflector, REFLECTOR_SYSTEM_PROMPT};
pub use structured::StructuredOutputError;
