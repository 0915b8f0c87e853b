//! Target Resolver - pending target computation
//!
//! Reads the full target list (one target per line) and filters out every
//! target already recorded in the completion ledger. Accepted line forms:
//! - any non-empty line, trimmed: "https://host/org/repo.git"
//! - blank or whitespace-only lines are skipped
//!
//! Input order is preserved. Duplicates in the input are not collapsed; only
//! ledger membership removes a target.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;
use vigil_common::{Target, VigilError};

pub struct TargetLoader;

impl TargetLoader {
    pub fn new() -> Self { Self }

    /// Load every target listed in `path`, in file order.
    ///
    /// A missing or unreadable file is fatal: the run must abort before any
    /// worker starts.
    pub async fn load_all(path: &Path) -> Result<Vec<Target>> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(VigilError::TargetsMissing(path.to_path_buf()).into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(VigilError::from)
            .with_context(|| format!("Failed to read target list {}", path.display()))?;

        Ok(parse_targets(&content))
    }

    /// Compute the pending list: all targets minus the completed ones.
    pub async fn load(path: &Path, completed: &HashSet<Target>) -> Result<Vec<Target>> {
        let all = Self::load_all(path).await?;
        let total = all.len();
        let pending = filter_pending(all, completed);
        debug!(
            "Loaded {} targets from {}, {} pending",
            total,
            path.display(),
            pending.len()
        );
        Ok(pending)
    }
}

/// Split file content into targets, skipping blank lines.
pub fn parse_targets(content: &str) -> Vec<Target> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(Target::from)
        .collect()
}

/// Drop targets present in `completed`, keeping the relative order of the rest.
pub fn filter_pending(all: Vec<Target>, completed: &HashSet<Target>) -> Vec<Target> {
    all.into_iter().filter(|t| !completed.contains(t)).collect()
}

impl Default for TargetLoader { fn default() -> Self { Self::new() } }


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn targets(items: &[&str]) -> Vec<Target> {
        items.iter().map(|s| Target::new(*s)).collect()
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let parsed = parse_targets("  a  \n\n\t\nb\r\nc");
        assert_eq!(parsed, targets(&["a", "b", "c"]));
    }

    #[test]
    fn test_filter_preserves_order() {
        let all = targets(&["t1", "t2", "t3", "t4", "t5"]);
        let completed: HashSet<Target> = targets(&["t2", "t4"]).into_iter().collect();
        assert_eq!(filter_pending(all, &completed), targets(&["t1", "t3", "t5"]));
    }

    #[test]
    fn test_duplicates_not_collapsed() {
        let all = targets(&["a", "b", "a"]);
        assert_eq!(filter_pending(all, &HashSet::new()), targets(&["a", "b", "a"]));
    }

    #[tokio::test]
    async fn test_load_excludes_completed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gits.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "https://h/r1.git\nhttps://h/r2.git\nhttps://h/r3.git\nhttps://h/r4.git\nhttps://h/r5.git").unwrap();

        let completed: HashSet<Target> =
            targets(&["https://h/r4.git", "https://h/r1.git"]).into_iter().collect();
        let pending = TargetLoader::load(&path, &completed).await.unwrap();
        assert_eq!(
            pending,
            targets(&["https://h/r2.git", "https://h/r3.git", "https://h/r5.git"])
        );
    }

    #[tokio::test]
    async fn test_load_everything_completed_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gits.txt");
        std::fs::write(&path, "a\nb\n").unwrap();

        let completed: HashSet<Target> = targets(&["a", "b"]).into_iter().collect();
        let pending = TargetLoader::load(&path, &completed).await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = TargetLoader::load(&dir.path().join("nope.txt"), &HashSet::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VigilError>(),
            Some(VigilError::TargetsMissing(_))
        ));
    }
}
