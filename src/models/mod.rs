// src/models/mod.rs

//! Domain models for the link watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod edge;
mod link;
mod record;

// Re-export all public types
pub use config::{Config, ExtractorConfig, MonitorConfig, PublishConfig, RulesConfig};
pub use edge::{
    ActionParameters, ApiMessage, DEFAULT_API_BASE, EDGE_CONFIG_SHAPE, EdgeConfig, Envelope,
    FromValue, Rule, Ruleset, TargetUrl, Zone,
};
pub use link::{LINK_CONFIG_SHAPE, LinkConfig};
pub use record::{ChangeType, DomainRecord};

/// Process-wide watcher state. Only the detector advances it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorState {
    /// Last known canonical domain
    pub current_domain: Option<String>,

    /// Last link written into the source files
    pub current_link: Option<String>,
}

impl MonitorState {
    /// Seed state from the history log and, when present, the link config.
    pub fn from_history(history: &[DomainRecord], link_config: Option<&LinkConfig>) -> Self {
        let current_domain = history
            .iter()
            .rev()
            .find(|record| record.is_detection())
            .map(|record| record.domain_or_link.clone());

        let current_link = link_config
            .map(|config| config.current_link.clone())
            .filter(|link| !link.is_empty());

        Self {
            current_domain,
            current_link,
        }
    }
}
