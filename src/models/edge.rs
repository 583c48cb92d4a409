//! Edge rule API configuration and wire types.
//!
//! Sibling rules have to be sent back exactly as they were read, so every
//! struct here keeps unknown fields in a flattened `extra` map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Expected shape of `cloudflare_config.json`, shown when the file is missing.
pub const EDGE_CONFIG_SHAPE: &str = r#"{
  "api_token": "your_api_token",
  "zone_id": "your_zone_id",
  "rule_id": "existing rule id (optional)",
  "source_pattern": "http.host eq \"short.example\"",
  "redirect_suffix": "/join/12345678"
}"#;

/// Default REST endpoint of the rule API.
pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Credentials and rule settings for the redirect sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeConfig {
    pub api_token: String,

    pub zone_id: String,

    /// Rule to update in place. Empty means "create one".
    #[serde(default)]
    pub rule_id: Option<String>,

    /// Match expression for the redirect (e.g. `http.host eq "short.example"`)
    pub source_pattern: String,

    /// Path appended to the canonical domain to form the redirect target
    #[serde(default)]
    pub redirect_suffix: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl EdgeConfig {
    /// The configured rule id, ignoring blanks.
    pub fn rule_id(&self) -> Option<&str> {
        self.rule_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Redirect target for a canonical domain.
    pub fn redirect_target(&self, domain: &str) -> String {
        format!("{}{}", domain.trim_end_matches('/'), self.redirect_suffix)
    }
}

/// Standard response envelope: `{success, result, errors}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,

    pub result: Option<T>,

    #[serde(default)]
    pub errors: Vec<ApiMessage>,
}

impl<T> Envelope<T> {
    /// Server-side error messages joined with `; `.
    pub fn error_message(&self) -> String {
        if self.errors.is_empty() {
            return "request was not successful".to_string();
        }
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// One entry of an envelope's `errors` array.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: Option<i64>,

    #[serde(default)]
    pub message: String,
}

/// A zone as returned by `GET /zones`.
#[derive(Debug, Clone, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// A named, phase-bound collection of rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ruleset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default)]
    pub phase: String,

    /// Omitted by the list endpoint; present on single-ruleset reads
    #[serde(default)]
    pub rules: Vec<Rule>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A match/action rule inside a rule-set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub expression: String,

    #[serde(default)]
    pub action: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_parameters: Option<ActionParameters>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "enabled_default")]
    pub enabled: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn enabled_default() -> bool {
    true
}

impl Rule {
    /// A new permanent redirect rule.
    pub fn redirect(expression: &str, target_url: &str, description: &str) -> Self {
        Self {
            id: None,
            expression: expression.to_string(),
            action: "redirect".to_string(),
            action_parameters: Some(ActionParameters {
                from_value: Some(FromValue::permanent(target_url)),
                extra: Map::new(),
            }),
            description: Some(description.to_string()),
            enabled: true,
            extra: Map::new(),
        }
    }

    /// Current static redirect target, if any.
    pub fn target_url(&self) -> Option<&str> {
        self.action_parameters
            .as_ref()?
            .from_value
            .as_ref()?
            .target_url
            .value
            .as_deref()
    }

    /// Point the rule at `target_url` as an enabled 301 without query preservation.
    pub fn retarget(&mut self, target_url: &str) {
        let params = self.action_parameters.get_or_insert_with(|| ActionParameters {
            from_value: None,
            extra: Map::new(),
        });
        match params.from_value.as_mut() {
            Some(from_value) => {
                from_value.status_code = 301;
                from_value.preserve_query_string = false;
                from_value.target_url.value = Some(target_url.to_string());
                from_value.target_url.expression = None;
            }
            None => params.from_value = Some(FromValue::permanent(target_url)),
        }
        self.action = "redirect".to_string();
        self.enabled = true;
    }
}

/// `action_parameters` of a redirect rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_value: Option<FromValue>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Static redirect parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FromValue {
    pub status_code: u16,

    pub target_url: TargetUrl,

    #[serde(default)]
    pub preserve_query_string: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FromValue {
    fn permanent(target_url: &str) -> Self {
        Self {
            status_code: 301,
            target_url: TargetUrl {
                value: Some(target_url.to_string()),
                expression: None,
            },
            preserve_query_string: false,
            extra: Map::new(),
        }
    }
}

/// Redirect destination: a literal URL or a dynamic expression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetUrl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}
