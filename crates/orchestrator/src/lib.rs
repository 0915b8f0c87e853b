//! Orchestrator - bounded worker pool, retries, completion ledger and stats

mod ledger;
mod orchestrator;
mod retry;
mod stats;

pub use ledger::CompletionLedger;
pub use orchestrator::Orchestrator;
pub use retry::RetryPolicy;
pub use stats::StatsAggregator;
