//! History records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a history record observed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// First value seen with no prior state
    FirstSeen,
    /// Value differs from the last known one
    Changed,
    /// A sink accepted the new value
    PropagationApplied,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeType::FirstSeen => "first seen",
            ChangeType::Changed => "changed",
            ChangeType::PropagationApplied => "propagation applied",
        };
        f.write_str(label)
    }
}

/// A timestamped observation in the history log. Never mutated once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainRecord {
    pub timestamp: DateTime<Utc>,

    /// Canonical domain for detections, full link or redirect URL for propagations
    #[serde(rename = "domain")]
    pub domain_or_link: String,

    pub change_type: ChangeType,

    /// Prior value, set on `Changed` records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

impl DomainRecord {
    pub fn first_seen(domain: impl Into<String>) -> Self {
        Self::new(domain, ChangeType::FirstSeen, None)
    }

    pub fn changed(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self::new(new, ChangeType::Changed, Some(old.into()))
    }

    pub fn propagation_applied(link: impl Into<String>) -> Self {
        Self::new(link, ChangeType::PropagationApplied, None)
    }

    fn new(value: impl Into<String>, change_type: ChangeType, previous: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            domain_or_link: value.into(),
            change_type,
            previous,
        }
    }

    /// Whether this record marks a detected domain (as opposed to a propagation).
    pub fn is_detection(&self) -> bool {
        matches!(self.change_type, ChangeType::FirstSeen | ChangeType::Changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_snake_case_tag() {
        let record = DomainRecord::changed("https://a.com", "https://b.com");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["change_type"], "changed");
        assert_eq!(json["domain"], "https://b.com");
        assert_eq!(json["previous"], "https://a.com");
    }

    #[test]
    fn first_seen_omits_previous() {
        let record = DomainRecord::first_seen("https://a.com");
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("previous").is_none());
        assert!(record.is_detection());
        assert!(!DomainRecord::propagation_applied("https://a.com/join/1").is_detection());
    }
}
