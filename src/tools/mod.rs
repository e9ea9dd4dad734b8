//! Tool definitions and batch execution.

pub mod arguments;
pub mod executor;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use executor::{execute_tool_call, ConcurrentToolExecutor, ToolExecutor, ToolOutcome};
pub use tool::{FnTool, Tool, ToolDefinition, ToolExecutionContext};
pub use types::{SchemaBuilder, ToolParameters};
