//! Stage 1 Tool Execution
//!
//! Exactly one tool is declared toward the remote model: a file-content
//! reader for workspace-relative or absolute paths. It returns either file
//! text (size-capped, truncation noted) or a typed error; tool execution
//! itself never fails the pipeline.

use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::client::ToolSpec;
use crate::constants::tools::{BINARY_SNIFF_BYTES, MAX_TOOL_FILE_BYTES};

pub const READ_FILE_TOOL: &str = "read_file";

/// Typed failure modes surfaced back to the model as tool output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolFileError {
    NotFound,
    BinaryFile,
    OutsideWorkspace,
    NotAFile,
}

impl ToolFileError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::BinaryFile => "binary_file",
            Self::OutsideWorkspace => "path_outside_workspace",
            Self::NotAFile => "not_a_file",
        }
    }
}

impl std::fmt::Display for ToolFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "file not found"),
            Self::BinaryFile => write!(f, "binary file, content not readable as text"),
            Self::OutsideWorkspace => write!(f, "path is outside the workspace"),
            Self::NotAFile => write!(f, "path is not a regular file"),
        }
    }
}

/// Result of one tool execution, kept for cache persistence
#[derive(Debug, Clone)]
pub struct ToolExecution {
    /// Workspace-relative path as resolved, when the read succeeded
    pub resolved_path: Option<String>,
    /// File content snapshot (possibly truncated)
    pub content: Option<String>,
    /// JSON payload appended to the conversation as the tool result
    pub output: String,
}

#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    path: String,
}

/// The declared file-content reader
pub struct FileReadTool {
    workspace_root: PathBuf,
    max_bytes: usize,
}

impl FileReadTool {
    pub fn new<P: AsRef<Path>>(workspace_root: P) -> Self {
        Self {
            workspace_root: workspace_root.as_ref().to_path_buf(),
            max_bytes: MAX_TOOL_FILE_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Tool schema declared in Stage 1 completion requests
    pub fn spec() -> ToolSpec {
        ToolSpec::function(
            READ_FILE_TOOL,
            "Read the text content of a file in the workspace by relative or absolute path",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Workspace-relative or absolute file path"
                    }
                },
                "required": ["path"]
            }),
        )
    }

    /// Execute with the raw JSON argument string the wire delivered.
    /// Malformed arguments become a typed error payload, never a panic.
    pub async fn execute(&self, arguments: &str) -> ToolExecution {
        let args: ReadFileArgs = match serde_json::from_str(arguments) {
            Ok(args) => args,
            Err(e) => {
                return ToolExecution {
                    resolved_path: None,
                    content: None,
                    output: error_payload("invalid_arguments", &format!("bad arguments: {}", e)),
                };
            }
        };

        match self.read(&args.path).await {
            Ok((rel_path, content, truncated)) => {
                let mut payload = json!({
                    "path": rel_path,
                    "content": content,
                });
                if truncated {
                    payload["truncated"] = Value::Bool(true);
                    payload["note"] =
                        json!(format!("content truncated to {} bytes", self.max_bytes));
                }
                ToolExecution {
                    resolved_path: Some(rel_path),
                    content: Some(content),
                    output: payload.to_string(),
                }
            }
            Err(err) => {
                debug!("read_file('{}') failed: {}", args.path, err);
                ToolExecution {
                    resolved_path: None,
                    content: None,
                    output: error_payload(err.code(), &err.to_string()),
                }
            }
        }
    }

    async fn read(&self, requested: &str) -> std::result::Result<(String, String, bool), ToolFileError> {
        let candidate = {
            let p = Path::new(requested);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                self.workspace_root.join(p)
            }
        };

        let canonical = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| ToolFileError::NotFound)?;
        let root = tokio::fs::canonicalize(&self.workspace_root)
            .await
            .map_err(|_| ToolFileError::NotFound)?;

        let rel = canonical
            .strip_prefix(&root)
            .map_err(|_| ToolFileError::OutsideWorkspace)?
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");

        let metadata = tokio::fs::metadata(&canonical)
            .await
            .map_err(|_| ToolFileError::NotFound)?;
        if !metadata.is_file() {
            return Err(ToolFileError::NotAFile);
        }

        let bytes = tokio::fs::read(&canonical)
            .await
            .map_err(|_| ToolFileError::NotFound)?;

        let sniff_len = bytes.len().min(BINARY_SNIFF_BYTES);
        if bytes[..sniff_len].contains(&0) {
            return Err(ToolFileError::BinaryFile);
        }

        let truncated = bytes.len() > self.max_bytes;
        let slice = if truncated { &bytes[..self.max_bytes] } else { &bytes[..] };
        let content = String::from_utf8_lossy(slice).into_owned();

        Ok((rel, content, truncated))
    }
}

fn error_payload(code: &str, message: &str) -> String {
    json!({ "error": code, "message": message }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(path: &str) -> String {
        json!({ "path": path }).to_string()
    }

    #[tokio::test]
    async fn test_read_relative_path() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("main.rs"), "fn main() {}").unwrap();

        let tool = FileReadTool::new(tmp.path());
        let exec = tool.execute(&args("main.rs")).await;

        assert_eq!(exec.resolved_path.as_deref(), Some("main.rs"));
        assert_eq!(exec.content.as_deref(), Some("fn main() {}"));
        assert!(exec.output.contains("fn main"));
    }

    #[tokio::test]
    async fn test_not_found() {
        let tmp = TempDir::new().unwrap();
        let tool = FileReadTool::new(tmp.path());
        let exec = tool.execute(&args("missing.rs")).await;

        assert!(exec.content.is_none());
        assert!(exec.output.contains("not_found"));
    }

    #[tokio::test]
    async fn test_outside_workspace() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();

        let tool = FileReadTool::new(tmp.path());
        let exec = tool
            .execute(&args(&outside.path().join("secret.txt").to_string_lossy()))
            .await;

        assert!(exec.content.is_none());
        assert!(exec.output.contains("path_outside_workspace"));
    }

    #[tokio::test]
    async fn test_binary_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("blob.bin"), [0u8, 159, 146, 150]).unwrap();

        let tool = FileReadTool::new(tmp.path());
        let exec = tool.execute(&args("blob.bin")).await;

        assert!(exec.output.contains("binary_file"));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("src")).unwrap();

        let tool = FileReadTool::new(tmp.path());
        let exec = tool.execute(&args("src")).await;

        assert!(exec.output.contains("not_a_file"));
    }

    #[tokio::test]
    async fn test_truncation_noted() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("big.txt"), "x".repeat(100)).unwrap();

        let tool = FileReadTool::new(tmp.path()).with_max_bytes(10);
        let exec = tool.execute(&args("big.txt")).await;

        assert_eq!(exec.content.as_deref(), Some("xxxxxxxxxx"));
        assert!(exec.output.contains("truncated"));
    }

    #[tokio::test]
    async fn test_malformed_arguments() {
        let tmp = TempDir::new().unwrap();
        let tool = FileReadTool::new(tmp.path());
        let exec = tool.execute("not json").await;

        assert!(exec.output.contains("invalid_arguments"));
    }
}
