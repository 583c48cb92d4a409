//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::fill_template;

/// Root application configuration, read from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Scrape target and extraction strategies
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Polling loop and history settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Redirect-rule sink settings
    #[serde(default)]
    pub rules: RulesConfig,

    /// Source-file sink settings
    #[serde(default)]
    pub publish: PublishConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.extractor.user_agent.trim().is_empty() {
            return Err(AppError::validation("extractor.user_agent is empty"));
        }
        if self.extractor.timeout_secs == 0 {
            return Err(AppError::validation("extractor.timeout_secs must be > 0"));
        }
        if self.extractor.marker.is_empty() {
            return Err(AppError::validation("extractor.marker is empty"));
        }
        if self.extractor.tld_candidates.is_empty() {
            return Err(AppError::validation("extractor.tld_candidates is empty"));
        }
        for pattern in &self.extractor.patterns {
            regex::Regex::new(pattern)?;
        }
        regex::Regex::new(&self.extractor.slug_pattern)?;
        if let Some(selector) = &self.extractor.anchor_selector {
            scraper::Selector::parse(selector)
                .map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        }
        if self.monitor.interval_secs == 0 {
            return Err(AppError::validation("monitor.interval_secs must be > 0"));
        }
        if self.rules.timeout_secs == 0 {
            return Err(AppError::validation("rules.timeout_secs must be > 0"));
        }
        if self.rules.phase.trim().is_empty() {
            return Err(AppError::validation("rules.phase is empty"));
        }
        if !self.publish.link_template.contains("{domain}") {
            return Err(AppError::validation(
                "publish.link_template must contain {domain}",
            ));
        }
        Ok(())
    }

    /// Path of the history log inside the storage directory.
    pub fn history_path(&self, storage_dir: &Path) -> PathBuf {
        storage_dir.join(&self.monitor.history_file)
    }

    /// Path of the edge credential file inside the storage directory.
    pub fn edge_config_path(&self, storage_dir: &Path) -> PathBuf {
        storage_dir.join(&self.rules.config_file)
    }

    /// Path of the link configuration inside the storage directory.
    pub fn link_config_path(&self, storage_dir: &Path) -> PathBuf {
        storage_dir.join(&self.publish.config_file)
    }
}

/// Scrape target and extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Page to watch. Falls back to `notion_url` from the link config.
    #[serde(default)]
    pub source_url: Option<String>,

    /// User-Agent header for the scrape request
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Accept header for the scrape request
    #[serde(default = "defaults::accept")]
    pub accept: String,

    /// Accept-Language header for the scrape request
    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Fetch the page at all; `false` derives the domain from the URL slug only
    #[serde(default = "defaults::fetch_page")]
    pub fetch_page: bool,

    /// CSS selector for anchors whose `href` carries the link
    #[serde(default = "defaults::anchor_selector")]
    pub anchor_selector: Option<String>,

    /// Ordered extraction regexes, matched case-insensitively
    #[serde(default = "defaults::patterns")]
    pub patterns: Vec<String>,

    /// Path segment where the canonical domain ends
    #[serde(default = "defaults::marker")]
    pub marker: String,

    /// Regex whose first group captures the domain slug from the source URL
    #[serde(default = "defaults::slug_pattern")]
    pub slug_pattern: String,

    /// Top-level-domain tokens recognised inside a slug
    #[serde(default = "defaults::tld_candidates")]
    pub tld_candidates: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            source_url: None,
            user_agent: defaults::user_agent(),
            accept: defaults::accept(),
            accept_language: defaults::accept_language(),
            timeout_secs: defaults::timeout(),
            fetch_page: defaults::fetch_page(),
            anchor_selector: defaults::anchor_selector(),
            patterns: defaults::patterns(),
            marker: defaults::marker(),
            slug_pattern: defaults::slug_pattern(),
            tld_candidates: defaults::tld_candidates(),
        }
    }
}

/// Polling loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between cycles
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,

    /// History log file name, relative to the storage directory
    #[serde(default = "defaults::history_file")]
    pub history_file: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
            history_file: defaults::history_file(),
        }
    }
}

/// Redirect-rule sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Propagate to the edge rule API
    #[serde(default)]
    pub enabled: bool,

    /// Credential file name, relative to the storage directory
    #[serde(default = "defaults::edge_config_file")]
    pub config_file: String,

    /// Description given to rules this tool creates
    #[serde(default = "defaults::rule_name")]
    pub rule_name: String,

    /// Rule-set phase that holds redirect rules
    #[serde(default = "defaults::phase")]
    pub phase: String,

    /// API request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            config_file: defaults::edge_config_file(),
            rule_name: defaults::rule_name(),
            phase: defaults::phase(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Source-file sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Rewrite source files and push them
    #[serde(default)]
    pub enabled: bool,

    /// Link configuration file name, relative to the storage directory
    #[serde(default = "defaults::link_config_file")]
    pub config_file: String,

    /// Working tree the files live in; relative file paths resolve against it
    #[serde(default = "defaults::repo_path")]
    pub repo_path: PathBuf,

    /// Remote to push to (git default when unset)
    #[serde(default)]
    pub remote: Option<String>,

    /// Branch to push (git default when unset)
    #[serde(default)]
    pub branch: Option<String>,

    /// Full link template. Supports `{domain}` and `{invite_code}`.
    #[serde(default = "defaults::link_template")]
    pub link_template: String,

    /// Commit message template. Supports `{link}`.
    #[serde(default = "defaults::commit_message")]
    pub commit_message: String,
}

impl PublishConfig {
    /// Build the full outbound link for a canonical domain.
    pub fn render_link(&self, domain: &str, invite_code: &str) -> String {
        fill_template(
            &self.link_template,
            &[
                ("domain", domain.trim_end_matches('/')),
                ("invite_code", invite_code),
            ],
        )
    }

    /// Build the commit message for a newly published link.
    pub fn render_commit_message(&self, link: &str) -> String {
        fill_template(&self.commit_message, &[("link", link)])
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            config_file: defaults::link_config_file(),
            repo_path: defaults::repo_path(),
            remote: None,
            branch: None,
            link_template: defaults::link_template(),
            commit_message: defaults::commit_message(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Extractor defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
    }
    pub fn accept() -> String {
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8".into()
    }
    pub fn accept_language() -> String {
        "zh-CN,zh;q=0.9,en;q=0.8".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn fetch_page() -> bool {
        true
    }
    pub fn anchor_selector() -> Option<String> {
        Some(r#"a[href*="/join"]"#.into())
    }
    pub fn patterns() -> Vec<String> {
        vec![
            r"(https?://(?:www\.)?[a-zA-Z0-9-]+\.com)/join".into(),
            r"(https?://)?(?:www\.)?([a-zA-Z0-9-]+\.com)(?:/join)?".into(),
            r"(?:domain|url|link)[:：\s]*([a-zA-Z0-9-]+\.com)".into(),
        ]
    }
    pub fn marker() -> String {
        "/join".into()
    }
    pub fn slug_pattern() -> String {
        r"APK-([A-Za-z0-9-]+?)(?:-[0-9a-f]{32})?$".into()
    }
    pub fn tld_candidates() -> Vec<String> {
        ["com", "net", "org", "io", "co"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    // Monitor defaults
    pub fn interval() -> u64 {
        300
    }
    pub fn history_file() -> String {
        "domain_history.json".into()
    }

    // Rules defaults
    pub fn edge_config_file() -> String {
        "cloudflare_config.json".into()
    }
    pub fn rule_name() -> String {
        "Domain Auto Redirect".into()
    }
    pub fn phase() -> String {
        "http_request_dynamic_redirect".into()
    }

    // Publish defaults
    pub fn link_config_file() -> String {
        "link_config.json".into()
    }
    pub fn repo_path() -> PathBuf {
        PathBuf::from(".")
    }
    pub fn link_template() -> String {
        "{domain}/join/{invite_code}".into()
    }
    pub fn commit_message() -> String {
        "chore: update referral link to {link}".into()
    }
}
