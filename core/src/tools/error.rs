use thiserror::Error;

use crate::Error as RunError;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Tool unavailable: {0}")]
    Unavailable(String),
}

impl ToolError {
    /// The model's own mistake; reported back to it as a tool result
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ToolError::UnknownTool(_) | ToolError::InvalidArguments(_))
    }

    /// Convert into the run-level error for the tool that raised it
    pub fn into_run_error(self, tool: &str) -> RunError {
        RunError::ToolExecution {
            tool: tool.to_string(),
            message: self.to_string(),
        }
    }
}

pub type ToolResult<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_become_run_errors_for_the_tool() {
        let err = ToolError::ExecutionFailed("status 500".into());
        assert!(!err.is_recoverable());
        match err.into_run_error("web_search") {
            RunError::ToolExecution { tool, message } => {
                assert_eq!(tool, "web_search");
                assert_eq!(message, "Execution failed: status 500");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(ToolError::UnknownTool("x".into()).is_recoverable());
    }
}
