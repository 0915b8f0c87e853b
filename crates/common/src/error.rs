//! Error types for Vigil
//!
//! Failures the orchestrator tells apart. Agent-side failures are opaque to
//! the orchestrator and arrive as `anyhow::Error` through `AuditInvoker`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VigilError {
    /// Fatal before any worker starts: missing target list, bad pool size.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Target list not found: {}", .0.display())]
    TargetsMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A task's result could not be collected (panic or abort inside the task).
    #[error("collection error: {0}")]
    Collection(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_error_message_prefix() {
        let e = VigilError::Collection("task panicked".into());
        assert_eq!(e.to_string(), "collection error: task panicked");
    }

    #[test]
    fn targets_missing_names_path() {
        let e = VigilError::TargetsMissing(PathBuf::from("/tmp/gits.txt"));
        assert!(e.to_string().contains("/tmp/gits.txt"));
    }
}
