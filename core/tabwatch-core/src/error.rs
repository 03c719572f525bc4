//! Error types for tabwatch-core operations.
//! Collaborator failures are mostly absorbed at the call site; these variants
//! cover what still has to travel up to a caller.

use std::path::PathBuf;

/// All errors that can occur in tabwatch-core operations.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Invalid session target: {0}")]
    InvalidTarget(String),

    // ─────────────────────────────────────────────────────────────────────
    // Ingestion Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Session listing failed: {0}")]
    ListingFailed(String),

    #[error("Command execution failed: {command}: {details}")]
    CommandFailed { command: String, details: String },

    #[error("Command timed out after {timeout_ms}ms: {command}")]
    CommandTimedOut { command: String, timeout_ms: u64 },

    // ─────────────────────────────────────────────────────────────────────
    // Summarization Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Summarizer returned no text")]
    EmptySummary,

    #[error("Summarizer failed: {0}")]
    SummarizerFailed(String),

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using MonitorError.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_carry_context_for_callers() {
        let err = MonitorError::CommandTimedOut {
            command: "tmux list-panes".to_string(),
            timeout_ms: 5000,
        };
        assert_eq!(err.to_string(), "Command timed out after 5000ms: tmux list-panes");
    }

    #[test]
    fn io_errors_keep_their_source() {
        let err = MonitorError::Io {
            context: "reading config".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().starts_with("I/O error: reading config"));
        assert!(err.source().is_some());
    }
}
