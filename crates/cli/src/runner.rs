// runner.rs
use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tracing::info;
use vigil_agent::{AgentConfig, OpencodeAuditor, OpencodeClient};
use vigil_common::{AuditJob, RunSummary};
use vigil_orchestrator::{CompletionLedger, Orchestrator, RetryPolicy};
use vigil_target_resolver::TargetLoader;

use crate::args::RunArgs;

pub async fn run_audit(args: RunArgs) -> Result<RunSummary> {
    // Fatal checks happen before any worker starts
    let ledger = Arc::new(CompletionLedger::new(&args.ledger));
    let completed = ledger.load_all().await?;
    let pending = TargetLoader::load(&args.targets, &completed).await?;

    if pending.is_empty() {
        info!("All targets have already been processed");
        return Ok(RunSummary::empty());
    }

    info!("{:=<80}", "");
    info!("Configuration:");
    info!("  Pending targets: {}", pending.len());
    info!("  Completed targets: {}", completed.len());
    info!("  Worker pool size: {}", args.max_workers);
    info!("  Attempts per target: {}", args.max_retries);
    info!("  Agent: {}", args.base_url);
    info!("{:=<80}", "");

    let config = AgentConfig::new(args.base_url)
        .with_credentials(args.username, args.password)
        .with_model(args.provider_id, args.model_id)
        .with_directory(args.directory)
        .with_request_timeout(Duration::from_secs(args.request_timeout_secs));
    let client = OpencodeClient::new(config).context("Failed to build agent HTTP client")?;
    let auditor = OpencodeAuditor::new(client, args.results_dir).with_prompt_file(args.prompt_file);

    let orchestrator = Orchestrator::new(Arc::new(auditor), ledger)
        .with_max_workers(args.max_workers as usize)
        .with_retry_policy(RetryPolicy::new(
            args.max_retries,
            Duration::from_secs(args.backoff_secs),
        ));

    orchestrator.run(AuditJob::new(pending)).await
}
