//! 工具分发层：web_search / llm_analysis / llm_generation 与分发器

pub mod analysis;
pub mod dispatcher;
pub mod registry;
pub mod search;
pub mod working;

pub use analysis::{analysis_prompt, generation_prompt, LlmAnalysisTool, LlmGenerationTool};
pub use dispatcher::ToolDispatcher;
pub use registry::{StepTool, ToolError, ToolRegistry};
pub use search::{
    MockSearchClient, SearchClient, SearchError, TavilySearchClient, WebSearchTool,
    TAVILY_ENDPOINT,
};
pub use working::{MissingContextPolicy, ToolOutput, WorkingState};
