use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(version = "0.1.0")]
#[command(about = "Resumable batch security audits through a remote agent", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log format: compact or json
    #[arg(long, default_value = "compact", value_parser = ["compact", "json"], global = true)]
    pub log_format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Audit every target that is not in the ledger yet
    Run(RunArgs),

    /// Flatten saved audit result files into a CSV report
    Report {
        /// Directory holding audit_result_*.json files
        #[arg(long, env = "VIGIL_RESULTS_DIR", default_value = "audit_results")]
        results_dir: PathBuf,

        /// CSV file to write
        #[arg(short, long, default_value = "audit_results.csv")]
        output: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// File listing every target, one per line
    #[arg(short = 't', long, env = "VIGIL_TARGETS_FILE", default_value = "gits.txt")]
    pub targets: PathBuf,

    /// Ledger of completed targets, appended after each success
    #[arg(long, env = "VIGIL_LEDGER_FILE", default_value = "gits_completed.txt")]
    pub ledger: PathBuf,

    /// Directory for per-target audit result files
    #[arg(long, env = "VIGIL_RESULTS_DIR", default_value = "audit_results")]
    pub results_dir: PathBuf,

    /// Audit instructions; a built-in prompt is used when missing
    #[arg(long, env = "VIGIL_PROMPT_FILE", default_value = "prompt_git.txt")]
    pub prompt_file: PathBuf,

    /// Max concurrent workers
    #[arg(short = 'w', long, env = "MAX_WORKERS", default_value = "3",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub max_workers: u32,

    /// Attempts per target before it is marked failed
    #[arg(long, env = "VIGIL_MAX_RETRIES", default_value = "2",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub max_retries: u32,

    /// Backoff unit in seconds; attempt k waits k * unit
    #[arg(long, env = "VIGIL_BACKOFF_SECS", default_value = "2")]
    pub backoff_secs: u64,

    /// Agent service base URL
    #[arg(long, env = "OPENCODE_BASE_URL", default_value = "http://127.0.0.1:4096")]
    pub base_url: String,

    /// Basic auth user
    #[arg(long, env = "OPENCODE_USERNAME", default_value = "opencode")]
    pub username: String,

    /// Basic auth password; no auth header is sent when empty
    #[arg(long, env = "OPENCODE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Model provider id
    #[arg(long, default_value = "deepseek")]
    pub provider_id: String,

    /// Model id
    #[arg(long, default_value = "deepseek-v3.1")]
    pub model_id: String,

    /// Project directory passed to the agent
    #[arg(long)]
    pub directory: Option<String>,

    /// Upper bound on a single agent call, in seconds
    #[arg(long, default_value = "300")]
    pub request_timeout_secs: u64,

    /// Summary format: text, json
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    pub output_format: String,

    /// Exit with an error when any target failed
    #[arg(long)]
    pub strict: bool,
}
