mod args;
mod output;
mod report;
mod runner;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use args::{Cli, Commands};
use output::print_summary;
use report::build_report;
use runner::run_audit;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, &cli.log_format);

    match cli.command {
        Commands::Run(args) => {
            let strict = args.strict;
            let output_format = args.output_format.clone();
            let summary = run_audit(args).await?;
            print_summary(&summary, &output_format)?;
            if strict && summary.has_failures() {
                bail!("{} of {} targets failed", summary.failed, summary.total);
            }
        }
        Commands::Report { results_dir, output } => {
            let rows = build_report(&results_dir, &output).await?;
            info!("Report finished: {} rows", rows);
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, format: &str) {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let builder = fmt().with_env_filter(filter);
    if format == "json" {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
