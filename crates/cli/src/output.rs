//! Output formatting for run summaries

use anyhow::Result;
use std::fmt::Write as _;
use std::time::Duration;
use vigil_common::{DurationStats, RunSummary};

/// Print the run summary in the specified format
pub fn print_summary(summary: &RunSummary, format: &str) -> Result<()> {
    // Normalize format string
    let format = format.trim().to_lowercase();
    match format.as_str() {
        "json" | "j" => println!("{}", serde_json::to_string_pretty(summary)?),
        "text" | "t" | "" => print!("{}", render_text(summary)),
        _ => {
            eprintln!("Warning: Unknown format '{}', using default text format", format);
            print!("{}", render_text(summary));
        }
    }
    Ok(())
}

/// Render the summary as a human-readable report.
fn render_text(summary: &RunSummary) -> String {
    let mut out = String::new();
    let elapsed = Duration::from_secs_f64(summary.elapsed_secs);

    let _ = writeln!(out, "\n{:=<80}", "");
    let _ = writeln!(out, "📊 Run summary:");
    let _ = writeln!(out, "  Total tasks: {}", summary.total);
    let _ = writeln!(out, "  ✓ Completed: {}", summary.completed);
    let _ = writeln!(out, "  ✗ Failed: {}", summary.failed);
    let _ = writeln!(
        out,
        "  ⏱️  Elapsed: {} ({:.2} min)",
        format_duration(elapsed),
        summary.elapsed_secs / 60.0
    );
    if let Some(s) = &summary.success {
        write_duration_stats(&mut out, "Successful", s);
    }
    if let Some(f) = &summary.failure {
        write_duration_stats(&mut out, "Failed", f);
    }
    if summary.completed > 0 {
        let _ = writeln!(out, "  Throughput: {:.2} tasks/s", summary.throughput);
    }
    let _ = writeln!(out, "{:=<80}", "");

    if !summary.failures.is_empty() {
        let _ = writeln!(out, "\nFailed targets ({}):", summary.failures.len());
        for f in &summary.failures {
            let _ = writeln!(out, "  - {}: {}", f.target, f.error);
        }
    }
    out.push('\n');
    out
}

fn write_duration_stats(out: &mut String, label: &str, stats: &DurationStats) {
    let _ = writeln!(
        out,
        "  {} tasks: avg {:.2}s, min {:.2}s, max {:.2}s",
        label, stats.average_secs, stats.min_secs, stats.max_secs
    );
}

/// Format duration in a human-readable way
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs == 0 {
        format!("{}ms", millis)
    } else if total_secs < 60 {
        if millis > 0 {
            format!("{}.{:03}s", total_secs, millis)
        } else {
            format!("{}s", total_secs)
        }
    } else {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    }
}
