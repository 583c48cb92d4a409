// src/pipeline/cycle.rs

//! One extract → detect → propagate cycle.
//!
//! The two sinks are independent: either may fail without affecting the
//! other, and no failure here ever reaches the polling loop.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{Config, EdgeConfig, LinkConfig};
use crate::pipeline::detect::{ChangeDetector, Detection};
use crate::services::{
    DomainExtractor, GitClient, LinkPublisher, PublishOutcome, PushOutcome, RedirectUpdater,
};
use crate::storage::{
    HistoryFile, LinkConfigFile, LinkConfigRepository, LocalFiles, load_edge_config,
};

/// What one sink did during a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SinkStatus {
    /// Sink disabled, or nothing was detected
    #[default]
    Skipped,
    /// The new value was applied
    Applied,
    /// The sink already matched, nothing was written
    Unchanged,
    Failed(String),
}

/// Summary of a single cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Extracted canonical domain, if extraction succeeded
    pub domain: Option<String>,
    pub detection: Option<Detection>,
    pub rule: SinkStatus,
    pub publish: SinkStatus,
}

/// Redirect-rule sink with the settings it needs per cycle.
pub struct RuleSink {
    pub updater: RedirectUpdater,
    pub edge: EdgeConfig,
    pub rule_name: String,
}

/// Source-file sink with the settings it needs per cycle.
pub struct PublishSink {
    pub publisher: LinkPublisher,
    pub invite_code: String,
}

/// The watcher: an extractor, a detector and up to two sinks.
pub struct Monitor {
    extractor: DomainExtractor,
    detector: ChangeDetector,
    rules: Option<RuleSink>,
    publish: Option<PublishSink>,
}

impl Monitor {
    pub fn new(
        extractor: DomainExtractor,
        detector: ChangeDetector,
        rules: Option<RuleSink>,
        publish: Option<PublishSink>,
    ) -> Self {
        Self {
            extractor,
            detector,
            rules,
            publish,
        }
    }

    /// Assemble the watcher from configuration in `storage_dir`.
    ///
    /// Fails with `ConfigNotFound` when an enabled sink's config file is
    /// missing, and with `Config` when no source URL is configured.
    pub async fn from_config(config: &Config, storage_dir: &Path) -> Result<Self> {
        let link_repo = LinkConfigFile::new(config.link_config_path(storage_dir));
        let link_config = if config.publish.enabled {
            Some(link_repo.load().await?)
        } else {
            match link_repo.load().await {
                Ok(link_config) => Some(link_config),
                Err(e) if e.is_config_not_found() => None,
                Err(e) => {
                    log::warn!("Ignoring unreadable link config: {e}");
                    None
                }
            }
        };

        let source_url = config
            .extractor
            .source_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| {
                link_config
                    .as_ref()
                    .and_then(LinkConfig::source_url)
                    .map(str::to_string)
            })
            .ok_or_else(|| {
                AppError::config(
                    "no source URL: set extractor.source_url in config.toml or notion_url in the link config",
                )
            })?;
        let extractor = DomainExtractor::new(&config.extractor, source_url)?;

        let rules = if config.rules.enabled {
            let edge = load_edge_config(&config.edge_config_path(storage_dir)).await?;
            let updater =
                RedirectUpdater::from_config(&edge, &config.rules.phase, config.rules.timeout_secs)?;
            log::info!("Redirect-rule sink enabled for zone {}", edge.zone_id);
            Some(RuleSink {
                updater,
                edge,
                rule_name: config.rules.rule_name.clone(),
            })
        } else {
            None
        };

        let publish = match (&link_config, config.publish.enabled) {
            (Some(link_config), true) => {
                let settings = config.publish.clone();
                let vcs = GitClient::new(&settings.repo_path)
                    .with_remote(settings.remote.clone(), settings.branch.clone());
                log::info!(
                    "File sink enabled for {} file(s) in {}",
                    link_config.files.len(),
                    settings.repo_path.display()
                );
                Some(PublishSink {
                    publisher: LinkPublisher::new(
                        Box::new(LocalFiles),
                        Box::new(link_repo),
                        Box::new(vcs),
                        settings,
                    ),
                    invite_code: link_config.invite_code.clone(),
                })
            }
            _ => None,
        };

        let history = HistoryFile::new(config.history_path(storage_dir));
        let detector = ChangeDetector::open(Box::new(history), link_config.as_ref()).await;

        Ok(Self::new(extractor, detector, rules, publish))
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    /// Run one cycle. Errors are logged and summarized, never returned.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        let domain = match self.extractor.extract().await {
            Ok(domain) => domain,
            Err(e) => {
                log::warn!("Extraction failed, skipping this cycle: {e}");
                return report;
            }
        };
        report.domain = Some(domain.clone());

        let detection = match self.detector.observe(&domain).await {
            Ok(detection) => detection,
            Err(e) => {
                log::error!("Could not record detection, skipping this cycle: {e}");
                return report;
            }
        };
        let changed = detection.is_change();
        report.detection = Some(detection);
        if !changed {
            return report;
        }

        report.rule = self.propagate_rule(&domain).await;
        report.publish = self.propagate_files(&domain).await;
        report
    }

    async fn propagate_rule(&mut self, domain: &str) -> SinkStatus {
        let Some(sink) = &self.rules else {
            return SinkStatus::Skipped;
        };

        let target = sink.edge.redirect_target(domain);
        let result = sink
            .updater
            .upsert(&sink.edge.source_pattern, &target, &sink.rule_name)
            .await;
        match result {
            Ok(outcome) => {
                log::info!("Redirect rule now points at {target} ({outcome:?})");
                self.note_propagation(&target).await;
                SinkStatus::Applied
            }
            Err(e) => {
                log::error!("Redirect rule update failed: {e}");
                SinkStatus::Failed(e.to_string())
            }
        }
    }

    async fn propagate_files(&mut self, domain: &str) -> SinkStatus {
        let Some(sink) = &self.publish else {
            return SinkStatus::Skipped;
        };

        let new_link = sink
            .publisher
            .settings()
            .render_link(domain, &sink.invite_code);
        let Some(old_link) = self.detector.state().current_link.clone() else {
            log::error!("No current link on record, cannot patch files");
            return SinkStatus::Failed("no current link on record".to_string());
        };

        let result = sink.publisher.publish(&old_link, &new_link).await;
        match result {
            Ok(PublishOutcome::Unchanged) => {
                log::info!("Files already carry {new_link}");
                SinkStatus::Unchanged
            }
            Ok(PublishOutcome::NoOpNoFilesMatched) => {
                log::warn!("No configured file contains {old_link}");
                SinkStatus::Unchanged
            }
            Ok(PublishOutcome::Updated(count)) => {
                let pushed = sink.publisher.commit_and_push(&new_link).await;
                self.detector.advance_link(&new_link);
                self.note_propagation(&new_link).await;
                match pushed {
                    Ok(PushOutcome::Pushed) => {
                        log::info!("Published {new_link} to {count} file(s)");
                        SinkStatus::Applied
                    }
                    Ok(PushOutcome::NothingToCommit) => SinkStatus::Applied,
                    Err(e) => {
                        log::error!("Files updated but publishing failed: {e}");
                        SinkStatus::Failed(e.to_string())
                    }
                }
            }
            Err(e) => {
                log::error!("File update failed: {e}");
                SinkStatus::Failed(e.to_string())
            }
        }
    }

    async fn note_propagation(&mut self, applied: &str) {
        if let Err(e) = self.detector.record_propagation(applied).await {
            log::error!("Could not record propagation of {applied}: {e}");
        }
    }
}
