// src/services/publisher.rs

//! Source-file patcher and publisher.
//!
//! Rewrites the old link to the new one across the configured files, records
//! the new link in the link configuration, then commits and pushes.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::PublishConfig;
use crate::services::vcs::{CommitOutcome, VersionControlClient};
use crate::storage::{LinkConfigRepository, SourceFiles};

/// Result of the file-rewrite pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// This many files were rewritten and the config now names the new link
    Updated(usize),
    /// No configured file contained the old link; nothing was written
    NoOpNoFilesMatched,
    /// Old and new link are identical
    Unchanged,
}

/// Result of commit-and-push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    /// The commit was empty, so nothing was pushed
    NothingToCommit,
}

/// Patches source files and publishes them through version control.
pub struct LinkPublisher {
    files: Box<dyn SourceFiles>,
    link_config: Box<dyn LinkConfigRepository>,
    vcs: Box<dyn VersionControlClient>,
    settings: PublishConfig,
}

impl LinkPublisher {
    pub fn new(
        files: Box<dyn SourceFiles>,
        link_config: Box<dyn LinkConfigRepository>,
        vcs: Box<dyn VersionControlClient>,
        settings: PublishConfig,
    ) -> Self {
        Self {
            files,
            link_config,
            vcs,
            settings,
        }
    }

    pub fn settings(&self) -> &PublishConfig {
        &self.settings
    }

    /// Configured file paths, relative ones resolved against the repository.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.settings.repo_path.join(path)
        }
    }

    /// Map existing paths to paths relative to the repository root, which is
    /// where the version-control client runs. Paths outside it are left out.
    async fn repo_relative(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let repo_path = &self.settings.repo_path;
        let root = absolute(repo_path)
            .await
            .map_err(|e| AppError::file_io(repo_path, e))?;

        let mut relative = Vec::with_capacity(paths.len());
        for path in paths {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                log::warn!("Not staging missing file {}", path.display());
                continue;
            }
            let full = absolute(path)
                .await
                .map_err(|e| AppError::file_io(path, e))?;
            match full.strip_prefix(&root) {
                Ok(inside) => relative.push(inside.to_path_buf()),
                Err(_) => log::warn!(
                    "{} is outside {}, not staging it",
                    path.display(),
                    root.display()
                ),
            }
        }
        Ok(relative)
    }

    /// Replace every occurrence of `old_link` with `new_link` in the
    /// configured files, then record `new_link` in the link config.
    ///
    /// Missing files and files without `old_link` are skipped. A failed write
    /// aborts the batch: files already written stay written and the config is
    /// left untouched.
    pub async fn publish(&self, old_link: &str, new_link: &str) -> Result<PublishOutcome> {
        if old_link == new_link {
            return Ok(PublishOutcome::Unchanged);
        }
        if old_link.is_empty() {
            return Err(AppError::validation("old link is empty, nothing to replace"));
        }

        let mut config = self.link_config.load().await?;
        let mut updated = 0;

        for file in &config.files {
            let path = self.resolve(file);
            let content = match self.files.read(&path).await {
                Ok(Some(content)) => content,
                Ok(None) => {
                    log::warn!("File not found, skipping: {}", path.display());
                    continue;
                }
                Err(e) => return Err(AppError::file_io(&path, e)),
            };

            if !content.contains(old_link) {
                log::info!("Old link not present in {}", path.display());
                continue;
            }

            let patched = content.replace(old_link, new_link);
            if let Err(e) = self.files.write(&path, &patched).await {
                log::error!(
                    "Write failed for {} after {updated} file(s) were rewritten",
                    path.display()
                );
                return Err(AppError::file_io(&path, e));
            }
            log::info!("Updated {}", path.display());
            updated += 1;
        }

        if updated == 0 {
            log::info!("No file contained {old_link}");
            return Ok(PublishOutcome::NoOpNoFilesMatched);
        }

        config.current_link = new_link.to_string();
        config.last_updated = Some(Utc::now().to_rfc3339());
        self.link_config.save(&config).await?;

        log::info!("Rewrote {updated} file(s): {old_link} -> {new_link}");
        Ok(PublishOutcome::Updated(updated))
    }

    /// Stage the configured files plus the link config, commit with a
    /// message naming `new_link`, and push.
    ///
    /// A failed push leaves the local commit in place.
    pub async fn commit_and_push(&self, new_link: &str) -> Result<PushOutcome> {
        let config = self.link_config.load().await?;
        let mut candidates: Vec<PathBuf> = config.files.iter().map(|f| self.resolve(f)).collect();
        candidates.push(self.link_config.location());

        let paths = self.repo_relative(&candidates).await?;
        self.vcs.stage(&paths).await?;

        let message = self.settings.render_commit_message(new_link);
        match self.vcs.commit(&message).await? {
            CommitOutcome::NoOp => {
                log::info!("Nothing to commit");
                return Ok(PushOutcome::NothingToCommit);
            }
            CommitOutcome::Committed => log::info!("Committed: {message}"),
        }

        self.vcs.push().await?;
        log::info!("Pushed {new_link}");
        Ok(PushOutcome::Pushed)
    }
}

/// Canonical form of `path`, or its plain absolute form when it cannot be
/// canonicalized.
async fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    match tokio::fs::canonicalize(path).await {
        Ok(full) => Ok(full),
        Err(_) => std::path::absolute(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::models::LinkConfig;
    use crate::services::vcs::GitClient;
    use crate::storage::{LinkConfigFile, LocalFiles};

    const OLD: &str = "https://old.example.com/join/1";
    const NEW: &str = "https://new.example.com/join/1";

    /// Local files that refuse to write one particular file.
    struct FailingWrites {
        fail_on: PathBuf,
    }

    #[async_trait]
    impl SourceFiles for FailingWrites {
        async fn read(&self, path: &Path) -> io::Result<Option<String>> {
            LocalFiles.read(path).await
        }

        async fn write(&self, path: &Path, content: &str) -> io::Result<()> {
            if path == self.fail_on {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            LocalFiles.write(path, content).await
        }
    }

    /// Records calls; the commit result is scripted.
    #[derive(Clone, Default)]
    struct RecordingVcs {
        calls: Arc<Mutex<Vec<String>>>,
        nothing_to_commit: bool,
        push_fails: bool,
    }

    impl RecordingVcs {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VersionControlClient for RecordingVcs {
        async fn stage(&self, paths: &[PathBuf]) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("add {}", paths.len()));
            Ok(())
        }

        async fn commit(&self, message: &str) -> Result<CommitOutcome> {
            self.calls.lock().unwrap().push(format!("commit {message}"));
            if self.nothing_to_commit {
                Ok(CommitOutcome::NoOp)
            } else {
                Ok(CommitOutcome::Committed)
            }
        }

        async fn push(&self) -> Result<()> {
            self.calls.lock().unwrap().push("push".to_string());
            if self.push_fails {
                Err(AppError::vcs("push", "rejected"))
            } else {
                Ok(())
            }
        }
    }

    struct Fixture {
        dir: TempDir,
        config_path: PathBuf,
    }

    impl Fixture {
        /// Three source files in a temp repo; the first and last contain the old link.
        async fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let files = vec![
                PathBuf::from("app/page.tsx"),
                PathBuf::from("app/about/page.tsx"),
                PathBuf::from("app/okx/page.tsx"),
            ];
            LocalFiles
                .write(
                    &dir.path().join(&files[0]),
                    &format!("<a href=\"{OLD}\">join</a> <a href=\"{OLD}\">again</a>"),
                )
                .await
                .unwrap();
            LocalFiles
                .write(&dir.path().join(&files[1]), "<p>about us</p>")
                .await
                .unwrap();
            LocalFiles
                .write(&dir.path().join(&files[2]), &format!("const LINK = \"{OLD}\";"))
                .await
                .unwrap();

            let config_path = dir.path().join("storage/link_config.json");
            LinkConfigFile::new(&config_path)
                .save(&LinkConfig {
                    notion_url: None,
                    invite_code: "1".into(),
                    current_link: OLD.into(),
                    last_updated: None,
                    files,
                })
                .await
                .unwrap();

            Self { dir, config_path }
        }

        fn publisher(&self, files: Box<dyn SourceFiles>, vcs: RecordingVcs) -> LinkPublisher {
            let settings = PublishConfig {
                enabled: true,
                repo_path: self.dir.path().to_path_buf(),
                ..PublishConfig::default()
            };
            LinkPublisher::new(
                files,
                Box::new(LinkConfigFile::new(&self.config_path)),
                Box::new(vcs),
                settings,
            )
        }

        async fn read(&self, relative: &str) -> String {
            LocalFiles
                .read(&self.dir.path().join(relative))
                .await
                .unwrap()
                .unwrap()
        }

        async fn config(&self) -> LinkConfig {
            LinkConfigFile::new(&self.config_path).load().await.unwrap()
        }
    }

    #[tokio::test]
    async fn publish_replaces_every_occurrence() {
        let fixture = Fixture::new().await;
        let publisher = fixture.publisher(Box::new(LocalFiles), RecordingVcs::default());

        let outcome = publisher.publish(OLD, NEW).await.unwrap();
        assert_eq!(outcome, PublishOutcome::Updated(2));

        let page = fixture.read("app/page.tsx").await;
        assert!(!page.contains(OLD));
        assert_eq!(page.matches(NEW).count(), 2);
        assert_eq!(fixture.read("app/about/page.tsx").await, "<p>about us</p>");
        assert_eq!(
            fixture.read("app/okx/page.tsx").await,
            format!("const LINK = \"{NEW}\";")
        );

        let config = fixture.config().await;
        assert_eq!(config.current_link, NEW);
        assert!(config.last_updated.is_some());
    }

    #[tokio::test]
    async fn missing_files_are_skipped() {
        let fixture = Fixture::new().await;
        tokio::fs::remove_file(fixture.dir.path().join("app/page.tsx"))
            .await
            .unwrap();
        let publisher = fixture.publisher(Box::new(LocalFiles), RecordingVcs::default());

        assert_eq!(
            publisher.publish(OLD, NEW).await.unwrap(),
            PublishOutcome::Updated(1)
        );
    }

    #[tokio::test]
    async fn no_matching_file_leaves_config_alone() {
        let fixture = Fixture::new().await;
        let publisher = fixture.publisher(Box::new(LocalFiles), RecordingVcs::default());

        let outcome = publisher
            .publish("https://absent.example.com/join/1", NEW)
            .await
            .unwrap();
        assert_eq!(outcome, PublishOutcome::NoOpNoFilesMatched);
        assert_eq!(fixture.config().await.current_link, OLD);
    }

    #[tokio::test]
    async fn identical_links_are_unchanged() {
        let fixture = Fixture::new().await;
        let publisher = fixture.publisher(Box::new(LocalFiles), RecordingVcs::default());

        assert_eq!(
            publisher.publish(OLD, OLD).await.unwrap(),
            PublishOutcome::Unchanged
        );
    }

    #[tokio::test]
    async fn failed_write_aborts_batch_without_config_update() {
        let fixture = Fixture::new().await;
        LocalFiles
            .write(
                &fixture.dir.path().join("app/about/page.tsx"),
                &format!("<p>about us</p> <a href=\"{OLD}\">join</a>"),
            )
            .await
            .unwrap();
        let failing = FailingWrites {
            fail_on: fixture.dir.path().join("app/about/page.tsx"),
        };
        let publisher = fixture.publisher(Box::new(failing), RecordingVcs::default());

        let err = publisher.publish(OLD, NEW).await.unwrap_err();
        assert!(matches!(err, AppError::FileIo { .. }));

        // Earlier file stays rewritten; the failing file and everything after it are untouched.
        let page = fixture.read("app/page.tsx").await;
        assert!(page.contains(NEW) && !page.contains(OLD));
        assert!(fixture.read("app/about/page.tsx").await.contains(OLD));
        assert_eq!(
            fixture.read("app/okx/page.tsx").await,
            format!("const LINK = \"{OLD}\";")
        );

        let config = fixture.config().await;
        assert_eq!(config.current_link, OLD);
        assert!(config.last_updated.is_none());
    }

    #[tokio::test]
    async fn commit_and_push_stages_files_and_config() {
        let fixture = Fixture::new().await;
        let vcs = RecordingVcs::default();
        let publisher = fixture.publisher(Box::new(LocalFiles), vcs.clone());

        let outcome = publisher.commit_and_push(NEW).await.unwrap();
        assert_eq!(outcome, PushOutcome::Pushed);
        assert_eq!(
            vcs.calls(),
            vec![
                "add 4".to_string(),
                format!("commit chore: update referral link to {NEW}"),
                "push".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn nothing_to_commit_skips_push() {
        let fixture = Fixture::new().await;
        let vcs = RecordingVcs {
            nothing_to_commit: true,
            ..RecordingVcs::default()
        };
        let publisher = fixture.publisher(Box::new(LocalFiles), vcs.clone());

        let outcome = publisher.commit_and_push(NEW).await.unwrap();
        assert_eq!(outcome, PushOutcome::NothingToCommit);
        assert!(!vcs.calls().contains(&"push".to_string()));
    }

    #[tokio::test]
    async fn push_failure_is_reported() {
        let fixture = Fixture::new().await;
        let vcs = RecordingVcs {
            push_fails: true,
            ..RecordingVcs::default()
        };
        let publisher = fixture.publisher(Box::new(LocalFiles), vcs);

        let err = publisher.commit_and_push(NEW).await.unwrap_err();
        assert!(matches!(err, AppError::Vcs { ref stage, .. } if stage == "push"));
    }

    #[tokio::test]
    async fn missing_and_outside_paths_are_not_staged() {
        let fixture = Fixture::new().await;
        tokio::fs::remove_file(fixture.dir.path().join("app/page.tsx"))
            .await
            .unwrap();
        let outside = TempDir::new().unwrap();
        let config_path = outside.path().join("link_config.json");
        tokio::fs::copy(&fixture.config_path, &config_path)
            .await
            .unwrap();

        let vcs = RecordingVcs::default();
        let settings = PublishConfig {
            enabled: true,
            repo_path: fixture.dir.path().to_path_buf(),
            ..PublishConfig::default()
        };
        let publisher = LinkPublisher::new(
            Box::new(LocalFiles),
            Box::new(LinkConfigFile::new(&config_path)),
            Box::new(vcs.clone()),
            settings,
        );

        publisher.commit_and_push(NEW).await.unwrap();
        assert_eq!(vcs.calls()[0], "add 2");
    }

    fn git(dir: &Path, args: &[&str]) -> std::process::Output {
        std::process::Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap()
    }

    #[tokio::test]
    async fn commits_through_git_with_relative_repo_path() {
        if std::process::Command::new("git")
            .arg("--version")
            .output()
            .is_err()
        {
            eprintln!("git not installed, skipping");
            return;
        }

        // Repository under the working directory so its path can be relative.
        let repo = tempfile::Builder::new()
            .prefix("linkwatch-repo")
            .tempdir_in(".")
            .unwrap();
        let cwd = std::env::current_dir().unwrap();
        let repo_path = repo
            .path()
            .strip_prefix(&cwd)
            .unwrap_or(repo.path())
            .to_path_buf();
        assert!(repo_path.is_relative());

        git(repo.path(), &["init", "-q"]);
        git(repo.path(), &["config", "user.email", "bot@example.com"]);
        git(repo.path(), &["config", "user.name", "bot"]);
        LocalFiles
            .write(
                &repo.path().join("app/page.tsx"),
                &format!("<a href=\"{NEW}\">join</a>"),
            )
            .await
            .unwrap();

        // Link config lives outside the repository.
        let outside = TempDir::new().unwrap();
        let config_path = outside.path().join("link_config.json");
        LinkConfigFile::new(&config_path)
            .save(&LinkConfig {
                notion_url: None,
                invite_code: "1".into(),
                current_link: NEW.into(),
                last_updated: None,
                files: vec![PathBuf::from("app/page.tsx")],
            })
            .await
            .unwrap();

        let settings = PublishConfig {
            enabled: true,
            repo_path: repo_path.clone(),
            ..PublishConfig::default()
        };
        let publisher = LinkPublisher::new(
            Box::new(LocalFiles),
            Box::new(LinkConfigFile::new(&config_path)),
            Box::new(GitClient::new(repo_path.clone())),
            settings,
        );

        // No remote is configured, so the commit lands and the push fails.
        let err = publisher.commit_and_push(NEW).await.unwrap_err();
        assert!(matches!(err, AppError::Vcs { ref stage, .. } if stage == "push"));

        let log = git(repo.path(), &["log", "--format=%s", "--name-only"]);
        let log = String::from_utf8_lossy(&log.stdout);
        assert!(log.contains(&format!("chore: update referral link to {NEW}")));
        assert!(log.contains("app/page.tsx"));

        assert_eq!(
            publisher.commit_and_push(NEW).await.unwrap(),
            PushOutcome::NothingToCommit
        );
    }
}
