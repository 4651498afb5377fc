//! Error types for CourseForge.
//!
//! Library crates use [`CourseForgeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::StageKind;

/// Top-level error type for all CourseForge operations.
#[derive(Debug, thiserror::Error)]
pub enum CourseForgeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP failure talking to a capability provider.
    #[error("transport error ({provider}): {message}")]
    Transport { provider: String, message: String },

    /// A capability call exceeded its time budget.
    #[error("{provider} call timed out after {secs}s")]
    Timeout { provider: String, secs: u64 },

    /// Structured-extraction output could not be parsed into module records.
    #[error("decomposition error: {0}")]
    Decomposition(String),

    /// Writing to the artifact store failed.
    #[error("cache write error at {path:?}: {message}")]
    CacheWrite { path: PathBuf, message: String },

    /// Reading a declared cache hit failed.
    #[error("cache read error at {path:?}: {message}")]
    CacheRead { path: PathBuf, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A background task or runtime could not run to completion.
    #[error("task error: {0}")]
    Task(String),

    /// A fatal error annotated with the stage and course/module being processed.
    #[error("{stage} stage failed for '{subject}': {source}")]
    Stage {
        stage: StageKind,
        subject: String,
        #[source]
        source: Box<CourseForgeError>,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CourseForgeError>;

impl CourseForgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a transport error for the named provider.
    pub fn transport(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach stage and subject context. Already-annotated errors are kept as-is
    /// so the innermost stage wins.
    pub fn in_stage(self, stage: StageKind, subject: impl Into<String>) -> Self {
        match self {
            Self::Stage { .. } => self,
            other => Self::Stage {
                stage,
                subject: subject.into(),
                source: Box::new(other),
            },
        }
    }

    /// Whether a retry of the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Stage { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CourseForgeError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = CourseForgeError::transport("openai", "HTTP 502");
        assert_eq!(err.to_string(), "transport error (openai): HTTP 502");
    }

    #[test]
    fn stage_context_names_stage_and_subject() {
        let err = CourseForgeError::Timeout {
            provider: "research".into(),
            secs: 30,
        }
        .in_stage(StageKind::Develop, "Module 2: Sprints");

        let msg = err.to_string();
        assert!(msg.starts_with("develop stage failed for 'Module 2: Sprints'"));
        assert!(msg.contains("timed out after 30s"));
        assert!(err.is_transient());
    }

    #[test]
    fn innermost_stage_wins() {
        let err = CourseForgeError::Decomposition("not a list".into())
            .in_stage(StageKind::Decompose, "Agile")
            .in_stage(StageKind::Develop, "Agile");

        match err {
            CourseForgeError::Stage { stage, .. } => assert_eq!(stage, StageKind::Decompose),
            other => panic!("expected Stage, got {other:?}"),
        }
    }

    #[test]
    fn decomposition_is_not_transient() {
        let err = CourseForgeError::Decomposition("bad json".into());
        assert!(!err.is_transient());
    }
}
