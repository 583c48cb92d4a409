// src/services/vcs.rs

//! Version-control client.
//!
//! The publisher only depends on [`VersionControlClient`]; [`GitClient`] is
//! the implementation that shells out to `git`.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{AppError, Result};

/// Result of a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Staged content matched the last commit
    NoOp,
}

/// Narrow interface over the version-control tool.
#[async_trait]
pub trait VersionControlClient: Send + Sync {
    /// Stage exactly `paths`.
    async fn stage(&self, paths: &[PathBuf]) -> Result<()>;

    /// Commit staged changes. "Nothing to commit" is `NoOp`, not an error.
    async fn commit(&self, message: &str) -> Result<CommitOutcome>;

    /// Push to the configured remote and branch.
    async fn push(&self) -> Result<()>;
}

/// `git` invoked as a subprocess inside a working tree.
#[derive(Debug, Clone)]
pub struct GitClient {
    repo_path: PathBuf,
    remote: Option<String>,
    branch: Option<String>,
}

impl GitClient {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            remote: None,
            branch: None,
        }
    }

    pub fn with_remote(mut self, remote: Option<String>, branch: Option<String>) -> Self {
        self.remote = remote;
        self.branch = branch;
        self
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Arguments after `git push`. A branch without a remote pushes to `origin`.
    fn push_args(&self) -> Vec<String> {
        match (&self.remote, &self.branch) {
            (Some(remote), Some(branch)) => vec![remote.clone(), branch.clone()],
            (Some(remote), None) => vec![remote.clone()],
            (None, Some(branch)) => vec!["origin".to_string(), branch.clone()],
            (None, None) => Vec::new(),
        }
    }

    async fn run<I, S>(&self, stage: &str, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .await
            .map_err(|e| AppError::vcs(stage, e))
    }
}

#[async_trait]
impl VersionControlClient for GitClient {
    async fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        let mut args: Vec<OsString> = vec!["add".into(), "--".into()];
        args.extend(paths.iter().map(|p| p.as_os_str().to_os_string()));

        let output = self.run("add", args).await?;
        if !output.status.success() {
            return Err(AppError::vcs("add", failure_text(&output)));
        }
        log::debug!("Staged {} path(s)", paths.len());
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<CommitOutcome> {
        let output = self.run("commit", ["commit", "-m", message]).await?;
        if output.status.success() {
            return Ok(CommitOutcome::Committed);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_nothing_to_commit(&stdout, &stderr) {
            return Ok(CommitOutcome::NoOp);
        }
        Err(AppError::vcs("commit", failure_text(&output)))
    }

    async fn push(&self) -> Result<()> {
        let mut args = vec!["push".to_string()];
        args.extend(self.push_args());

        let output = self.run("push", args).await?;
        if !output.status.success() {
            return Err(AppError::vcs("push", failure_text(&output)));
        }
        Ok(())
    }
}

/// Whether git's output says there was nothing to commit.
pub fn is_nothing_to_commit(stdout: &str, stderr: &str) -> bool {
    [stdout, stderr].iter().any(|text| {
        let text = text.to_ascii_lowercase();
        text.contains("nothing to commit") || text.contains("nothing added to commit")
    })
}

fn failure_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout)
    } else {
        stderr
    };
    let text = text.trim();
    if text.is_empty() {
        format!("exited with {}", output.status)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_nothing_to_commit() {
        assert!(is_nothing_to_commit(
            "On branch main\nnothing to commit, working tree clean\n",
            ""
        ));
        assert!(is_nothing_to_commit(
            "",
            "nothing added to commit but untracked files present"
        ));
        assert!(!is_nothing_to_commit(
            "",
            "fatal: unable to auto-detect email address"
        ));
    }

    #[test]
    fn push_args_follow_remote_and_branch() {
        let git = GitClient::new(".");
        assert!(git.push_args().is_empty());

        let git = GitClient::new(".").with_remote(Some("upstream".into()), Some("main".into()));
        assert_eq!(git.push_args(), vec!["upstream", "main"]);

        let git = GitClient::new(".").with_remote(None, Some("deploy".into()));
        assert_eq!(git.push_args(), vec!["origin", "deploy"]);
    }

    #[tokio::test]
    async fn missing_working_tree_is_vcs_error() {
        let git = GitClient::new("/nonexistent/linkwatch/repo");
        let err = git.push().await.unwrap_err();
        assert!(matches!(err, AppError::Vcs { ref stage, .. } if stage == "push"));
    }
}
