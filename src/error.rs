//! Error taxonomy for the analysis engine.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Project root not found: {path}")]
    ProjectRootMissing { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] ignore::Error),

    #[error("File too large: {path} ({bytes} bytes, limit {limit})")]
    FileTooLarge { path: PathBuf, bytes: u64, limit: u64 },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to spawn analyzer `{command}`: {source}")]
    AnalyzerSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Analyzer `{command}` timed out after {timeout_secs}s")]
    AnalyzerTimeout { command: String, timeout_secs: u64 },

    #[error("Analyzer `{command}` exited with {status}: {stderr}")]
    AnalyzerExit {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Malformed analyzer output: {0}")]
    AnalyzerOutput(#[from] serde_json::Error),

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Every active backend failed: {}", failures.join("; "))]
    AllBackendsFailed { failures: Vec<String> },
}

impl AnalysisError {
    /// Per-file errors are recovered locally: the file is excluded, the run goes on.
    pub fn is_file_level(&self) -> bool {
        matches!(
            self,
            Self::FileTooLarge { .. } | Self::Parse { .. } | Self::Io(_)
        )
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_level_errors_are_recoverable() {
        assert!(AnalysisError::parse("a.ts", "syntax").is_file_level());
        assert!(!AnalysisError::AnalyzerTimeout {
            command: "go-analyzer".into(),
            timeout_secs: 3
        }
        .is_file_level());
    }

    #[test]
    fn all_failed_lists_every_reason() {
        let err = AnalysisError::AllBackendsFailed {
            failures: vec!["java: boom".into(), "go: timeout".into()],
        };
        assert_eq!(
            err.to_string(),
            "Every active backend failed: java: boom; go: timeout"
        );
    }
}
