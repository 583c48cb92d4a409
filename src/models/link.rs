//! Persisted link configuration for the source-file sink.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Expected shape of `link_config.json`, shown when the file is missing.
pub const LINK_CONFIG_SHAPE: &str = r#"{
  "notion_url": "https://example.notion.site/APK-www-example-com-join-<page id>",
  "invite_code": "12345678",
  "current_link": "https://www.example.com/join/12345678",
  "last_updated": null,
  "files": ["src/app/page.tsx"]
}"#;

/// Link configuration, rewritten after every successful file propagation.
///
/// `current_link` always matches the link written into every file in
/// `files` as of `last_updated`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkConfig {
    #[serde(default)]
    pub notion_url: Option<String>,

    pub invite_code: String,

    pub current_link: String,

    #[serde(default)]
    pub last_updated: Option<String>,

    /// Files to patch, in order
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

impl LinkConfig {
    /// The source URL, if set and non-empty.
    pub fn source_url(&self) -> Option<&str> {
        self.notion_url.as_deref().filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_documented_shape() {
        let config: LinkConfig = serde_json::from_str(LINK_CONFIG_SHAPE).unwrap();
        assert_eq!(config.invite_code, "12345678");
        assert_eq!(config.files, vec![PathBuf::from("src/app/page.tsx")]);
        assert!(config.last_updated.is_none());
        assert!(config.source_url().is_some());
    }

    #[test]
    fn blank_notion_url_is_no_source() {
        let config = LinkConfig {
            notion_url: Some("  ".into()),
            invite_code: "1".into(),
            current_link: String::new(),
            last_updated: None,
            files: vec![],
        };
        assert!(config.source_url().is_none());
    }
}
