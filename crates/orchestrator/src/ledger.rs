//! Completion ledger - durable record of targets that finished successfully

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use vigil_common::Target;

#[derive(Default)]
struct LedgerState {
    /// Targets appended by this process.
    appended: HashSet<Target>,
    /// The file on disk does not end with a newline yet. `None` until known.
    needs_newline: Option<bool>,
}

/// Append-only file of completed targets, one per line.
///
/// Every append goes through a single lock and is flushed and synced before
/// the lock is released, so concurrent workers never interleave bytes and a
/// crash right after `append` returns cannot lose the record. The file is
/// never truncated or rewritten.
pub struct CompletionLedger {
    path: PathBuf,
    state: Mutex<LedgerState>,
}

impl CompletionLedger {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Read every completed target. A missing file means nothing completed yet.
    ///
    /// Called once at startup, before any worker runs.
    pub async fn load_all(&self) -> Result<HashSet<Target>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read ledger {}", self.path.display()))
            }
        };

        let mut state = self.state.lock().await;
        state.needs_newline = Some(!content.is_empty() && !content.ends_with('\n'));

        let completed: HashSet<Target> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(Target::from)
            .collect();
        debug!("Ledger {} holds {} targets", self.path.display(), completed.len());
        Ok(completed)
    }

    /// Durably record `target` as completed.
    ///
    /// Returns `false` without touching the file when this process already
    /// recorded the same target.
    pub async fn append(&self, target: &Target) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.appended.contains(target) {
            warn!("Ledger already records {} for this run, skipping", target);
            return Ok(false);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open ledger {}", self.path.display()))?;

        let needs_newline = match state.needs_newline {
            Some(known) => known,
            None => missing_trailing_newline(&self.path)
                .await
                .with_context(|| format!("Failed to inspect ledger {}", self.path.display()))?,
        };

        let mut line = String::with_capacity(target.as_str().len() + 2);
        if needs_newline {
            line.push('\n');
        }
        line.push_str(target.as_str());
        line.push('\n');

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;

        state.needs_newline = Some(false);
        state.appended.insert(target.clone());
        Ok(true)
    }

}

/// Whether a non-empty file at `path` ends without `\n`. A missing file does not.
async fn missing_trailing_newline(path: &Path) -> std::io::Result<bool> {
    let mut file = match File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}
