//! Offline report: saved audit result files -> one CSV row per finding

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

static FENCED_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(\[.*?\])\s*```").expect("valid regex"));
static LAZY_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)(\[.*?\])").expect("valid regex"));
static GREEDY_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)(\[.*\])").expect("valid regex"));

/// Columns copied from the result file itself.
const RECORD_COLUMNS: [&str; 5] = ["target", "branch", "session_id", "session_title", "timestamp"];

/// Columns copied from each finding of `audit_result`.
const FINDING_COLUMNS: [&str; 7] = [
    "annotation",
    "language",
    "application_type",
    "project_description",
    "project_name",
    "git_addr",
    "branch",
];

/// The finding's own `branch` column is renamed to keep headers unique.
const CSV_HEADER: &str = "target,branch,session_id,session_title,timestamp,annotation,language,\
application_type,project_description,project_name,git_addr,finding_branch";

/// Findings of one result file, each as an ordered list of cell values.
pub fn extract_rows(record: &Value) -> Vec<Vec<String>> {
    let Some(items) = record.get("audit_result").and_then(audit_items) else {
        return Vec::new();
    };

    items
        .iter()
        .map(|item| {
            RECORD_COLUMNS
                .iter()
                .map(|k| cell(record.get(*k)))
                .chain(FINDING_COLUMNS.iter().map(|k| cell(item.get(*k))))
                .collect()
        })
        .collect()
}

/// The findings array: the value itself, or an array embedded in a text reply.
fn audit_items(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::String(text) => [&*FENCED_ARRAY, &*LAZY_ARRAY, &*GREEDY_ARRAY]
            .iter()
            .filter_map(|re| re.captures(text))
            .find_map(|caps| serde_json::from_str::<Vec<Value>>(&caps[1]).ok()),
        _ => None,
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn render_csv(rows: &[Vec<String>]) -> String {
    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');
    for row in rows {
        let line: Vec<String> = row.iter().map(|v| csv_field(v)).collect();
        csv.push_str(&line.join(","));
        csv.push('\n');
    }
    csv
}

/// Read every `*.json` file in `results_dir` and write the CSV to `output`.
///
/// Returns the number of rows written. Unreadable files are logged and
/// skipped; nothing is written when no finding was extracted.
pub async fn build_report(results_dir: &Path, output: &Path) -> Result<usize> {
    let mut entries = tokio::fs::read_dir(results_dir)
        .await
        .with_context(|| format!("Failed to read {}", results_dir.display()))?;

    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "json") {
            files.push(path);
        }
    }
    files.sort();
    info!("Found {} JSON files", files.len());

    let mut rows = Vec::new();
    for file in &files {
        let parsed = tokio::fs::read_to_string(file)
            .await
            .map_err(anyhow::Error::from)
            .and_then(|s| serde_json::from_str::<Value>(&s).map_err(anyhow::Error::from));
        match parsed {
            Ok(record) => {
                let extracted = extract_rows(&record);
                info!("Processed {}: {} findings", file.display(), extracted.len());
                rows.extend(extracted);
            }
            Err(e) => warn!("Skipping {}: {:#}", file.display(), e),
        }
    }

    if rows.is_empty() {
        warn!("No findings extracted, report not written");
        return Ok(0);
    }

    tokio::fs::write(output, render_csv(&rows))
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote {} rows to {}", rows.len(), output.display());
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(audit_result: Value) -> Value {
        json!({
            "target": "https://h/app.git",
            "branch": null,
            "session_id": "ses_1",
            "session_title": "security-audit-https://h/app.git#default",
            "audit_result": audit_result,
            "timestamp": "2024-01-02 03:04:05"
        })
    }

    #[test]
    fn test_direct_array() {
        let rows = extract_rows(&record(json!([
            { "annotation": "sql injection", "language": "java", "branch": "main" },
            { "annotation": "xss" }
        ])));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "https://h/app.git");
        assert_eq!(rows[0][1], "");
        assert_eq!(rows[0][5], "sql injection");
        assert_eq!(rows[0][6], "java");
        assert_eq!(rows[0][11], "main");
        assert_eq!(rows[1][6], "");
    }

    #[test]
    fn test_fenced_block_in_text() {
        let text = "Findings:\n```json\n[{\"annotation\": \"rce\", \"project_name\": \"app\"}]\n```\nDone.";
        let rows = extract_rows(&record(json!(text)));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][5], "rce");
        assert_eq!(rows[0][9], "app");
    }

    #[test]
    fn test_nested_array_in_text() {
        let text = "result: [{\"annotation\": \"a\", \"tags\": [1, 2]}] end";
        let rows = extract_rows(&record(json!(text)));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][5], "a");
    }

    #[test]
    fn test_no_findings() {
        assert!(extract_rows(&record(json!("nothing to report"))).is_empty());
        assert!(extract_rows(&record(json!({ "x": 1 }))).is_empty());
        assert!(extract_rows(&json!({ "target": "t" })).is_empty());
    }

    #[test]
    fn test_csv_quotes_fields() {
        let csv = render_csv(&[vec!["a \"b\"".into(), "c,d".into()]]);
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("target,branch,session_id"));
        assert!(header.ends_with(",git_addr,finding_branch"));
        assert_eq!(lines.next().unwrap(), "\"a \"\"b\"\"\",\"c,d\"");
    }

    #[tokio::test]
    async fn test_build_report_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("audit_result_app_default_1.json"),
            serde_json::to_string(&record(json!([{ "annotation": "x" }]))).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let out = dir.path().join("report.csv");
        let rows = build_report(dir.path(), &out).await.unwrap();
        assert_eq!(rows, 1);
        let csv = std::fs::read_to_string(&out).unwrap();
        assert_eq!(csv.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_build_report_nothing_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report.csv");
        assert_eq!(build_report(dir.path(), &out).await.unwrap(), 0);
        assert!(!out.exists());
    }
}
