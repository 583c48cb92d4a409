// src/pipeline/detect.rs

//! Change detection.
//!
//! [`detect`] is the pure comparison; [`ChangeDetector`] owns the live
//! [`MonitorState`] and the history log, and is the only thing that
//! advances either.

use crate::error::Result;
use crate::models::{DomainRecord, LinkConfig, MonitorState};
use crate::storage::HistoryRepository;

/// Outcome of comparing a new value against the last known one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    NoChange,
    /// No prior value; still actionable since sinks may be out of sync
    FirstSeen(String),
    Changed { old: String, new: String },
}

impl Detection {
    /// Whether propagation should run.
    pub fn is_change(&self) -> bool {
        !matches!(self, Detection::NoChange)
    }

    /// The history record for this outcome, if any.
    pub fn record(&self) -> Option<DomainRecord> {
        match self {
            Detection::NoChange => None,
            Detection::FirstSeen(value) => Some(DomainRecord::first_seen(value)),
            Detection::Changed { old, new } => Some(DomainRecord::changed(old, new)),
        }
    }
}

/// Compare `new_value` against the state's current domain and return the
/// advanced state alongside the outcome. Equality is exact string equality.
pub fn detect(state: MonitorState, new_value: &str) -> (MonitorState, Detection) {
    let detection = match state.current_domain.as_deref() {
        None => Detection::FirstSeen(new_value.to_string()),
        Some(current) if current == new_value => Detection::NoChange,
        Some(current) => Detection::Changed {
            old: current.to_string(),
            new: new_value.to_string(),
        },
    };

    let state = match &detection {
        Detection::NoChange => state,
        _ => MonitorState {
            current_domain: Some(new_value.to_string()),
            ..state
        },
    };
    (state, detection)
}

/// Stateful detector backed by a history repository.
pub struct ChangeDetector {
    state: MonitorState,
    history: Vec<DomainRecord>,
    repository: Box<dyn HistoryRepository>,
}

impl ChangeDetector {
    /// Load history and seed state from it. An unreadable log is reported
    /// and replaced by an empty one.
    pub async fn open(
        repository: Box<dyn HistoryRepository>,
        link_config: Option<&LinkConfig>,
    ) -> Self {
        let history = match repository.load().await {
            Ok(history) => history,
            Err(e) => {
                log::warn!("History could not be read, starting empty: {e}");
                Vec::new()
            }
        };
        let state = MonitorState::from_history(&history, link_config);

        match &state.current_domain {
            Some(domain) => log::info!("Last known domain: {domain}"),
            None => log::info!("No previous domain on record"),
        }

        Self {
            state,
            history,
            repository,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn history(&self) -> &[DomainRecord] {
        &self.history
    }

    /// Compare a freshly extracted domain against the last known one.
    ///
    /// Any change is appended to history and the state advanced before this
    /// returns, so it happens ahead of propagation. If the history cannot be
    /// saved nothing is advanced and the error is returned.
    pub async fn observe(&mut self, domain: &str) -> Result<Detection> {
        let (next, detection) = detect(self.state.clone(), domain);

        if let Some(record) = detection.record() {
            self.append(record).await?;
            self.state = next;
        }

        match &detection {
            Detection::NoChange => log::info!("No change: {domain}"),
            Detection::FirstSeen(new) => log::info!("First observation: {new}"),
            Detection::Changed { old, new } => log::info!("Domain changed: {old} -> {new}"),
        }
        Ok(detection)
    }

    /// Append a `PropagationApplied` record for a value a sink accepted.
    pub async fn record_propagation(&mut self, applied: &str) -> Result<()> {
        self.append(DomainRecord::propagation_applied(applied)).await
    }

    /// Remember the link now written into the source files.
    pub fn advance_link(&mut self, link: &str) {
        self.state.current_link = Some(link.to_string());
    }

    async fn append(&mut self, record: DomainRecord) -> Result<()> {
        self.history.push(record);
        if let Err(e) = self.repository.save(&self.history).await {
            self.history.pop();
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::models::ChangeType;
    use crate::storage::HistoryFile;

    #[test]
    fn first_value_is_first_seen() {
        let (state, detection) = detect(MonitorState::default(), "https://a.com");
        assert_eq!(detection, Detection::FirstSeen("https://a.com".into()));
        assert_eq!(state.current_domain.as_deref(), Some("https://a.com"));
    }

    #[test]
    fn equal_value_is_no_change() {
        let state = MonitorState {
            current_domain: Some("https://a.com".into()),
            current_link: Some("https://a.com/join/1".into()),
        };
        let (next, detection) = detect(state.clone(), "https://a.com");
        assert_eq!(detection, Detection::NoChange);
        assert_eq!(next, state);
    }

    #[test]
    fn comparison_is_exact() {
        let state = MonitorState {
            current_domain: Some("https://a.com".into()),
            current_link: None,
        };
        let (_, detection) = detect(state, "https://A.com");
        assert!(detection.is_change());
    }

    #[tokio::test]
    async fn repeated_values_record_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("domain_history.json");
        let mut detector = ChangeDetector::open(Box::new(HistoryFile::new(&path)), None).await;

        assert_eq!(
            detector.observe("A").await.unwrap(),
            Detection::FirstSeen("A".into())
        );
        assert_eq!(detector.observe("A").await.unwrap(), Detection::NoChange);
        assert_eq!(
            detector.observe("B").await.unwrap(),
            Detection::Changed {
                old: "A".into(),
                new: "B".into()
            }
        );

        let stored = HistoryFile::new(&path).load().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].change_type, ChangeType::FirstSeen);
        assert_eq!(stored[0].domain_or_link, "A");
        assert_eq!(stored[1].change_type, ChangeType::Changed);
        assert_eq!(stored[1].previous.as_deref(), Some("A"));
        assert_eq!(stored[1].domain_or_link, "B");
    }

    #[tokio::test]
    async fn reopening_resumes_from_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("domain_history.json");

        let mut detector = ChangeDetector::open(Box::new(HistoryFile::new(&path)), None).await;
        detector.observe("A").await.unwrap();
        detector.record_propagation("A/join/1").await.unwrap();

        let mut reopened = ChangeDetector::open(Box::new(HistoryFile::new(&path)), None).await;
        assert_eq!(reopened.state().current_domain.as_deref(), Some("A"));
        assert_eq!(reopened.observe("A").await.unwrap(), Detection::NoChange);
        assert_eq!(reopened.history().len(), 2);
    }

    #[tokio::test]
    async fn corrupt_history_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("domain_history.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let detector = ChangeDetector::open(Box::new(HistoryFile::new(&path)), None).await;
        assert!(detector.history().is_empty());
        assert!(detector.state().current_domain.is_none());
    }
}
