//! Service layer for the link watcher.
//!
//! This module contains the business logic for:
//! - Domain extraction (`DomainExtractor`, ranked `ExtractionStrategy` list)
//! - Redirect-rule updates (`RuleClient`, `RedirectUpdater`)
//! - Source-file publishing (`LinkPublisher`)
//! - Version control (`VersionControlClient`, `GitClient`)

mod extractor;
mod publisher;
mod rules;
pub mod strategies;
pub mod vcs;

pub use extractor::DomainExtractor;
pub use publisher::{LinkPublisher, PublishOutcome, PushOutcome};
pub use rules::{RedirectUpdater, RuleClient, RuleOutcome};
pub use strategies::{AnchorStrategy, ExtractionStrategy, RegexStrategy};
pub use vcs::{CommitOutcome, GitClient, VersionControlClient};
