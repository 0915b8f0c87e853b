//! Vigil Common - Shared types and traits
//!
//! This crate provides the data model, error taxonomy, and the agent seam
//! used across the Vigil audit orchestrator.
//!
//! Key pieces:
//! - `Target`, `TaskResult`, `Stats` and `RunSummary` describe a run
//! - `AuditInvoker` is the boundary every agent implementation sits behind
//! - `VigilError` covers the failures the orchestrator distinguishes

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::VigilError;
pub use traits::AuditInvoker;
pub use types::{
    AuditJob, AuditReport, DurationStats, FailedTarget, RunSummary, Stats, Target, TaskOutcome,
    TaskResult,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
