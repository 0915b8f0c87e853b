//! Agent - client for the remote audit agent service
//!
//! Provides the HTTP client for the session/prompt API and an
//! `AuditInvoker` that runs one security audit per target:
//! - create a session titled after the repository
//! - send the audit prompt and extract the payload from the reply
//! - ask the agent to clean up, then write the result file

pub mod auditor;
pub mod client;
pub mod error;
pub mod response;

pub use auditor::{AuditRecord, GitTarget, OpencodeAuditor};
pub use client::{AgentConfig, OpencodeClient};
pub use error::AgentError;
pub use response::{parse_response, AgentResponse, AuditPayload};
