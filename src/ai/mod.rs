//! LLM Client, Response Resolution, and Tooling

pub mod client;
pub mod resolver;
pub mod timeout;
pub mod tools;

pub use client::{
    ChatMessage, CompletionRequest, CompletionResponse, FunctionCall, LlmClient, OpenAiClient,
    SharedClient, ToolCallRequest, ToolSpec,
};
pub use resolver::{ResolvedResponse, detect_known_technologies, extract_structured, resolve};
pub use timeout::with_timeout;
pub use tools::{FileReadTool, READ_FILE_TOOL, ToolExecution, ToolFileError};
