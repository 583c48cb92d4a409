// src/services/rules.rs

//! Redirect-rule sink.
//!
//! [`RuleClient`] is a thin wrapper over the edge rule REST API;
//! [`RedirectUpdater`] implements create-or-update of the one redirect rule
//! this tool owns. The API has no partial rule update, so updates resend the
//! full rule collection of the owning rule-set with only the target changed.

use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{EdgeConfig, Envelope, Rule, Ruleset, Zone};
use crate::utils::http::create_api_client;

/// Authenticated client for one zone of the rule API.
#[derive(Clone)]
pub struct RuleClient {
    client: reqwest::Client,
    api_base: String,
    zone_id: String,
    api_token: String,
}

impl RuleClient {
    pub fn new(edge: &EdgeConfig, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: create_api_client(timeout_secs)?,
            api_base: edge.api_base.trim_end_matches('/').to_string(),
            zone_id: edge.zone_id.clone(),
            api_token: edge.api_token.clone(),
        })
    }

    fn zone_url(&self, suffix: &str) -> String {
        format!("{}/zones/{}{}", self.api_base, self.zone_id, suffix)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.api_token)
    }

    /// Send a request and unwrap the `{success, result, errors}` envelope.
    ///
    /// Transport failures stay `Http`; non-2xx statuses and `success=false`
    /// become `Api` with the server's messages.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(AppError::api(
                    Some(status.as_u16()),
                    status.canonical_reason().unwrap_or("request failed"),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        if !status.is_success() {
            return Err(AppError::api(
                Some(status.as_u16()),
                envelope.error_message(),
            ));
        }
        if !envelope.success {
            return Err(AppError::api(None, envelope.error_message()));
        }

        envelope
            .result
            .ok_or_else(|| AppError::api(None, "response carried no result"))
    }

    async fn send_json<T, B>(&self, method: Method, url: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(method, url).json(body)).await
    }

    /// `GET /zones/{zone}/rulesets`. Listed rule-sets carry no rules.
    pub async fn list_rulesets(&self) -> Result<Vec<Ruleset>> {
        let url = self.zone_url("/rulesets");
        self.send(self.request(Method::GET, &url)).await
    }

    /// `GET /zones/{zone}/rulesets/{id}` with its full rule collection.
    pub async fn get_ruleset(&self, ruleset_id: &str) -> Result<Ruleset> {
        let url = self.zone_url(&format!("/rulesets/{ruleset_id}"));
        self.send(self.request(Method::GET, &url)).await
    }

    /// `POST /zones/{zone}/rulesets`.
    pub async fn create_ruleset(&self, ruleset: &Ruleset) -> Result<Ruleset> {
        let url = self.zone_url("/rulesets");
        self.send_json(Method::POST, &url, ruleset).await
    }

    /// `POST /zones/{zone}/rulesets/{id}/rules`, appending one rule.
    pub async fn add_rule(&self, ruleset_id: &str, rule: &Rule) -> Result<Ruleset> {
        let url = self.zone_url(&format!("/rulesets/{ruleset_id}/rules"));
        self.send_json(Method::POST, &url, rule).await
    }

    /// `PUT /zones/{zone}/rulesets/{id}`, replacing the whole rule collection.
    pub async fn replace_rules(&self, ruleset_id: &str, rules: &[Rule]) -> Result<Ruleset> {
        let url = self.zone_url(&format!("/rulesets/{ruleset_id}"));
        self.send_json(Method::PUT, &url, &json!({ "rules": rules }))
            .await
    }

    /// `GET /zones?name=`, used to check a token and find a zone id.
    pub async fn find_zone(&self, name: &str) -> Result<Option<Zone>> {
        let url = format!("{}/zones", self.api_base);
        let zones: Vec<Zone> = self
            .send(self.request(Method::GET, &url).query(&[("name", name)]))
            .await?;
        Ok(zones.into_iter().find(|zone| zone.name == name))
    }
}

/// What an upsert did to the remote rule-sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The configured rule was retargeted in place
    Updated { ruleset_id: String, rule_id: String },
    /// A new rule was appended to an existing redirect rule-set
    Appended { ruleset_id: String },
    /// No redirect rule-set existed, so one was created
    Created { ruleset_id: String },
}

/// Create-or-update of the redirect rule.
pub struct RedirectUpdater {
    client: RuleClient,
    rule_id: Option<String>,
    phase: String,
}

impl RedirectUpdater {
    pub fn new(client: RuleClient, rule_id: Option<&str>, phase: impl Into<String>) -> Self {
        Self {
            client,
            rule_id: rule_id.map(str::to_string),
            phase: phase.into(),
        }
    }

    pub fn from_config(edge: &EdgeConfig, phase: &str, timeout_secs: u64) -> Result<Self> {
        let client = RuleClient::new(edge, timeout_secs)?;
        Ok(Self::new(client, edge.rule_id(), phase))
    }

    pub fn client(&self) -> &RuleClient {
        &self.client
    }

    /// Point the redirect at `target_url`.
    ///
    /// With a configured rule id the rule is updated in place and an empty
    /// `source_pattern` keeps its expression. Without one, a rule is appended
    /// to the first redirect-phase rule-set, or a new rule-set is created.
    pub async fn upsert(
        &self,
        source_pattern: &str,
        target_url: &str,
        rule_name: &str,
    ) -> Result<RuleOutcome> {
        match &self.rule_id {
            Some(rule_id) => self.update_in_place(rule_id, source_pattern, target_url).await,
            None => self.append_or_create(source_pattern, target_url, rule_name).await,
        }
    }

    async fn update_in_place(
        &self,
        rule_id: &str,
        source_pattern: &str,
        target_url: &str,
    ) -> Result<RuleOutcome> {
        for ruleset in self.redirect_rulesets().await? {
            let Some(ruleset_id) = ruleset.id.clone() else {
                continue;
            };

            let mut rules = ruleset.rules;
            let Some(rule) = rules
                .iter_mut()
                .find(|rule| rule.id.as_deref() == Some(rule_id))
            else {
                continue;
            };

            rule.retarget(target_url);
            if !source_pattern.trim().is_empty() {
                rule.expression = source_pattern.to_string();
            }

            log::info!("Updating rule {rule_id} in rule-set {ruleset_id} -> {target_url}");
            self.client.replace_rules(&ruleset_id, &rules).await?;
            return Ok(RuleOutcome::Updated {
                ruleset_id,
                rule_id: rule_id.to_string(),
            });
        }

        Err(AppError::RuleNotFound(rule_id.to_string()))
    }

    async fn append_or_create(
        &self,
        source_pattern: &str,
        target_url: &str,
        rule_name: &str,
    ) -> Result<RuleOutcome> {
        if source_pattern.trim().is_empty() {
            return Err(AppError::validation(
                "source_pattern is required to create a redirect rule",
            ));
        }
        let rule = Rule::redirect(source_pattern, target_url, rule_name);

        let existing = self
            .client
            .list_rulesets()
            .await?
            .into_iter()
            .filter(|ruleset| self.is_redirect_phase(ruleset))
            .find_map(|ruleset| ruleset.id);

        if let Some(ruleset_id) = existing {
            log::info!("Appending redirect rule to rule-set {ruleset_id} -> {target_url}");
            self.client.add_rule(&ruleset_id, &rule).await?;
            return Ok(RuleOutcome::Appended { ruleset_id });
        }

        log::info!("No {} rule-set found, creating one", self.phase);
        let ruleset = Ruleset {
            name: format!("{rule_name} rule-set"),
            kind: Some("zone".to_string()),
            phase: self.phase.clone(),
            rules: vec![rule],
            ..Ruleset::default()
        };
        let created = self.client.create_ruleset(&ruleset).await?;
        Ok(RuleOutcome::Created {
            ruleset_id: created.id.unwrap_or_default(),
        })
    }

    /// Every rule-set of the redirect phase, each read with its rules.
    pub async fn redirect_rulesets(&self) -> Result<Vec<Ruleset>> {
        let mut rulesets = Vec::new();
        for listed in self.client.list_rulesets().await? {
            if !self.is_redirect_phase(&listed) {
                continue;
            }
            let Some(id) = listed.id.as_deref() else {
                continue;
            };
            rulesets.push(self.client.get_ruleset(id).await?);
        }
        Ok(rulesets)
    }

    fn is_redirect_phase(&self, ruleset: &Ruleset) -> bool {
        ruleset.phase == self.phase && ruleset.kind.as_deref().is_none_or(|kind| kind == "zone")
    }
}
