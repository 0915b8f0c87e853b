//! Security audit of one git repository through the agent

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use vigil_common::{AuditInvoker, AuditReport, Target};
use crate::client::OpencodeClient;
use crate::error::AgentError;
use crate::response::{parse_response, AuditPayload};

/// Used when no prompt file is present.
pub const DEFAULT_PROMPT: &str =
    "Perform a full security audit of the current project and identify potential vulnerabilities and risks.";

/// Sent after the audit so the agent removes its working copy.
pub const CLEANUP_PROMPT: &str = "The review is finished, please delete the cloned code directory.";

/// A repository address with an optional branch, written as `url#branch`.
///
/// The branch starts after the first `#`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitTarget {
    pub url: String,
    pub branch: Option<String>,
}

impl GitTarget {
    pub fn parse(target: &Target) -> Self {
        match target.as_str().split_once('#') {
            Some((url, branch)) if !url.is_empty() && !branch.is_empty() => Self {
                url: url.to_string(),
                branch: Some(branch.to_string()),
            },
            _ => Self {
                url: target.as_str().to_string(),
                branch: None,
            },
        }
    }

    pub fn branch_label(&self) -> &str {
        self.branch.as_deref().unwrap_or("default")
    }

    /// Last path segment of the URL without the `.git` suffix.
    pub fn repo_name(&self) -> &str {
        let trimmed = self.url.trim_end_matches('/');
        let last = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
        last.strip_suffix(".git").unwrap_or(last)
    }

    pub fn clone_command(&self) -> String {
        match &self.branch {
            Some(branch) => format!("git clone -b {} --depth 1 {}", branch, self.url),
            None => format!("git clone --depth 1 {}", self.url),
        }
    }

    pub fn session_title(&self) -> String {
        format!("security-audit-{}#{}", self.url, self.branch_label())
    }
}

/// Contents of one result file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub target: String,
    pub branch: Option<String>,
    pub session_id: String,
    pub session_title: String,
    pub audit_result: Option<AuditPayload>,
    pub timestamp: String,
}

impl AuditRecord {
    /// `target` is kept verbatim, matching the line the ledger records.
    pub fn new(
        target: &Target,
        git: &GitTarget,
        session_id: &str,
        audit_result: Option<AuditPayload>,
        at: &DateTime<Local>,
    ) -> Self {
        Self {
            target: target.as_str().to_string(),
            branch: git.branch.clone(),
            session_id: session_id.to_string(),
            session_title: git.session_title(),
            audit_result,
            timestamp: at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// `audit_result_<repo>_<branch>_<YYYYmmdd_HHMMSS>.json`
pub fn result_file_name(git: &GitTarget, at: &DateTime<Local>) -> String {
    format!(
        "audit_result_{}_{}_{}.json",
        sanitize(git.repo_name()),
        sanitize(git.branch_label()),
        at.format("%Y%m%d_%H%M%S")
    )
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

/// Preamble naming the repository, followed by the audit instructions.
pub fn compose_prompt(git: &GitTarget, instructions: &str) -> String {
    let clone = git.clone_command();
    format!(
        "You are an experienced information security expert reviewing the Git project ({url}).\n\
         \n\
         Context:\n\
         - Git project URL: {url}\n\
         - Branch: {branch}\n\
         - Clone command: {clone}\n\
         \n\
         !{clone}\n\
         \n\
         Run the clone command first, then review the code and identify potential security vulnerabilities and risks.\n\
         \n\
         {instructions}",
        url = git.url,
        branch = git.branch_label(),
        clone = clone,
        instructions = instructions,
    )
}

/// `AuditInvoker` backed by the agent service.
pub struct OpencodeAuditor {
    client: OpencodeClient,
    results_dir: PathBuf,
    prompt_file: Option<PathBuf>,
}

impl OpencodeAuditor {
    pub fn new<P: Into<PathBuf>>(client: OpencodeClient, results_dir: P) -> Self {
        Self {
            client,
            results_dir: results_dir.into(),
            prompt_file: None,
        }
    }

    /// Read audit instructions from this file when it exists.
    pub fn with_prompt_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.prompt_file = Some(path.into());
        self
    }

    /// Prompt file content, or `DEFAULT_PROMPT` when the file is absent.
    pub async fn load_instructions(&self) -> Result<String> {
        let Some(path) = &self.prompt_file else {
            return Ok(DEFAULT_PROMPT.to_string());
        };
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DEFAULT_PROMPT.to_string()),
            Err(e) => Err(e).with_context(|| format!("Failed to read prompt file {}", path.display())),
        }
    }

    /// Write `record` as pretty JSON under the results directory.
    pub async fn write_record(
        &self,
        git: &GitTarget,
        record: &AuditRecord,
        at: &DateTime<Local>,
    ) -> Result<PathBuf, AgentError> {
        tokio::fs::create_dir_all(&self.results_dir).await?;
        let path = self.results_dir.join(result_file_name(git, at));
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}

#[async_trait]
impl AuditInvoker for OpencodeAuditor {
    async fn audit(&self, target: &Target) -> Result<AuditReport> {
        let git = GitTarget::parse(target);
        let session_title = git.session_title();

        let session_id = self
            .client
            .create_session(&session_title)
            .await
            .context("create session failed")?;
        info!("    session created: {}", session_id);

        let prompt = compose_prompt(&git, &self.load_instructions().await?);
        let response = self
            .client
            .send_prompt(&session_id, &prompt)
            .await
            .context("send audit prompt failed")?;
        let audit_result = parse_response(&response);
        if audit_result.is_none() {
            debug!("Session {} returned no text payload", session_id);
        }

        self.client
            .send_prompt(&session_id, CLEANUP_PROMPT)
            .await
            .context("send cleanup prompt failed")?;

        let now = Local::now();
        let record = AuditRecord::new(target, &git, &session_id, audit_result, &now);
        let path = self
            .write_record(&git, &record, &now)
            .await
            .context("write audit result failed")?;
        info!("    audit result saved to: {}", path.display());

        Ok(AuditReport::new(session_id).with_result_path(path))
    }

    fn name(&self) -> &str {
        "opencode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AgentConfig;
    use chrono::TimeZone;

    fn git(s: &str) -> GitTarget {
        GitTarget::parse(&Target::new(s))
    }

    #[test]
    fn parse_branch_suffix() {
        let g = git("https://github.com/org/app.git#release/1.2");
        assert_eq!(g.url, "https://github.com/org/app.git");
        assert_eq!(g.branch.as_deref(), Some("release/1.2"));

        let g = git("https://github.com/org/app.git");
        assert_eq!(g.branch, None);
        assert_eq!(g.branch_label(), "default");

        // a trailing '#' is not a branch
        assert_eq!(git("https://h/r.git#").branch, None);
    }

    #[test]
    fn branch_starts_at_first_hash() {
        let g = git("https://h/r.git#fix#123");
        assert_eq!(g.url, "https://h/r.git");
        assert_eq!(g.branch.as_deref(), Some("fix#123"));
        assert_eq!(g.clone_command(), "git clone -b fix#123 --depth 1 https://h/r.git");
    }

    #[test]
    fn repo_name_variants() {
        assert_eq!(git("https://github.com/org/app.git").repo_name(), "app");
        assert_eq!(git("https://github.com/org/app/").repo_name(), "app");
        assert_eq!(git("git@github.com:app.git").repo_name(), "app");
    }

    #[test]
    fn clone_command_with_and_without_branch() {
        assert_eq!(git("u").clone_command(), "git clone --depth 1 u");
        assert_eq!(git("u#dev").clone_command(), "git clone -b dev --depth 1 u");
    }

    #[test]
    fn session_title_format() {
        assert_eq!(git("https://h/r.git").session_title(), "security-audit-https://h/r.git#default");
    }

    #[test]
    fn file_name_is_sanitized() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            result_file_name(&git("https://h/org/app.git#feature/x"), &at),
            "audit_result_app_feature_x_20240309_140507.json"
        );
    }

    #[test]
    fn prompt_mentions_repository_and_clone() {
        let p = compose_prompt(&git("https://h/r.git#dev"), "CHECK EVERYTHING");
        assert!(p.contains("(https://h/r.git)"));
        assert!(p.contains("!git clone -b dev --depth 1 https://h/r.git"));
        assert!(p.ends_with("CHECK EVERYTHING"));
    }

    #[tokio::test]
    async fn instructions_fall_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let client = OpencodeClient::new(AgentConfig::default()).unwrap();
        let auditor = OpencodeAuditor::new(client, dir.path())
            .with_prompt_file(dir.path().join("missing.txt"));
        assert_eq!(auditor.load_instructions().await.unwrap(), DEFAULT_PROMPT);

        let prompt = dir.path().join("prompt.txt");
        std::fs::write(&prompt, "custom").unwrap();
        let client = OpencodeClient::new(AgentConfig::default()).unwrap();
        let auditor = OpencodeAuditor::new(client, dir.path()).with_prompt_file(prompt);
        assert_eq!(auditor.load_instructions().await.unwrap(), "custom");
    }

    #[tokio::test]
    async fn record_written_as_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let client = OpencodeClient::new(AgentConfig::default()).unwrap();
        let auditor = OpencodeAuditor::new(client, dir.path().join("results"));

        let g = git("https://h/r.git");
        let at = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let record = AuditRecord::new(
            &Target::new("https://h/r.git"),
            &g,
            "ses_1",
            Some(AuditPayload::Text("fine".into())),
            &at,
        );
        let path = auditor.write_record(&g, &record, &at).await.unwrap();
        assert!(path.ends_with("results/audit_result_r_default_20240102_030405.json"));

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["session_id"], "ses_1");
        assert_eq!(value["audit_result"], "fine");
        assert_eq!(value["timestamp"], "2024-01-02 03:04:05");
        assert!(value["branch"].is_null());
    }

    #[test]
    fn record_keeps_full_target_line() {
        let target = Target::new("https://h/r.git#dev");
        let at = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let record = AuditRecord::new(&target, &GitTarget::parse(&target), "ses_2", None, &at);
        assert_eq!(record.target, "https://h/r.git#dev");
        assert_eq!(record.branch.as_deref(), Some("dev"));
        assert_eq!(record.session_title, "security-audit-https://h/r.git#dev");
    }
}
