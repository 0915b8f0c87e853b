//! Core traits for Vigil components

use crate::types::{AuditReport, Target};
use anyhow::Result;
use async_trait::async_trait;

/// Performs one audit for one target.
///
/// This is the boundary between the orchestrator and the remote agent. Every
/// error returned here is treated the same way by the retry policy, so
/// implementations should not try to classify failures themselves.
#[async_trait]
pub trait AuditInvoker: Send + Sync {
    /// Audit a single target, returning once the audit fully succeeded.
    async fn audit(&self, target: &Target) -> Result<AuditReport>;

    /// Invoker name/identifier, used in logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoInvoker;

    #[async_trait]
    impl AuditInvoker for EchoInvoker {
        async fn audit(&self, target: &Target) -> Result<AuditReport> {
            Ok(AuditReport::new(format!("ses_{}", target.as_str())))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn invoker_is_object_safe() {
        let invoker: Box<dyn AuditInvoker> = Box::new(EchoInvoker);
        let report = invoker.audit(&Target::new("repo-a")).await.unwrap();
        assert_eq!(report.session_id, "ses_repo-a");
        assert_eq!(invoker.name(), "echo");
    }
}
