use std::path::PathBuf;

use mapforge_tree::{ConfigError, WorkspaceValidationError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid workspace: {0}")]
    Workspace(#[from] WorkspaceValidationError),

    #[error("required path does not exist: {path}")]
    MissingPath { path: PathBuf },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("{message}")]
    Exit { code: i32, message: String },
}

impl CliError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exit { code, .. } => *code,
            Self::Workspace(_) | Self::Config(ConfigError::Validation(_)) => 2,
            _ => 1,
        }
    }

    #[must_use]
    pub fn exit(code: i32, message: impl Into<String>) -> Self {
        Self::Exit {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CliError;
    use mapforge_tree::WorkspaceValidationError;

    #[test]
    fn exit_constructor_preserves_code_and_message() {
        let error = CliError::exit(42, "boom");
        assert_eq!(error.exit_code(), 42);
        assert_eq!(error.to_string(), "boom");
    }

    #[test]
    fn validation_failures_exit_with_two() {
        let error = CliError::from(WorkspaceValidationError::EmptyWorkspaceName);
        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.to_string(),
            "invalid workspace: workspace name must not be empty"
        );
        assert_eq!(CliError::invalid("x").exit_code(), 1);
    }
}
