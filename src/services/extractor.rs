// src/services/extractor.rs

//! Domain extractor service.
//!
//! Fetches the watched page and runs the ranked strategies over it. When the
//! content yields nothing, the domain is rebuilt from the slug embedded in the
//! source URL itself.

use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::ExtractorConfig;
use crate::services::strategies::{AnchorStrategy, ExtractionStrategy, RegexStrategy};
use crate::utils::http::{create_scrape_client, fetch_text};
use crate::utils::url::{SlugDomain, domain_from_slug, extract_slug, normalize_domain};

/// Service that turns the watched page into a canonical domain.
pub struct DomainExtractor {
    client: reqwest::Client,
    source_url: String,
    fetch_page: bool,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    marker: String,
    slug_pattern: Regex,
    tld_candidates: Vec<String>,
}

impl DomainExtractor {
    /// Build an extractor with the strategies listed in the configuration:
    /// the anchor selector first, then each regex in order.
    pub fn new(config: &ExtractorConfig, source_url: impl Into<String>) -> Result<Self> {
        let mut strategies: Vec<Box<dyn ExtractionStrategy>> = Vec::new();
        if let Some(selector) = &config.anchor_selector {
            strategies.push(Box::new(AnchorStrategy::new(selector)?));
        }
        for pattern in &config.patterns {
            strategies.push(Box::new(RegexStrategy::new(pattern)?));
        }

        Ok(Self {
            client: create_scrape_client(config)?,
            source_url: source_url.into(),
            fetch_page: config.fetch_page,
            strategies,
            marker: config.marker.clone(),
            slug_pattern: Regex::new(&config.slug_pattern)?,
            tld_candidates: config.tld_candidates.clone(),
        })
    }

    /// Replace the strategy list, keeping its order.
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Extract the canonical domain.
    ///
    /// Fetch failures are `Fetch` errors; finding nothing anywhere is an
    /// `Extraction` error. Callers treat both as "no change this cycle".
    pub async fn extract(&self) -> Result<String> {
        if self.fetch_page {
            log::info!("Fetching {}", self.source_url);
            let content = fetch_text(&self.client, &self.source_url).await?;

            if let Some(domain) = self.extract_from_content(&content) {
                return Ok(domain);
            }
            log::debug!("No strategy matched the page content, trying the URL slug");
        }

        match self.extract_from_source_url() {
            Some(SlugDomain::Tld(domain)) => {
                log::info!("Extracted domain from URL slug: {domain}");
                Ok(domain)
            }
            Some(SlugDomain::Naive(domain)) => {
                log::warn!("No TLD token in URL slug, using naive conversion: {domain}");
                Ok(domain)
            }
            None => Err(AppError::extraction(format!(
                "no strategy matched and no slug found in {}",
                self.source_url
            ))),
        }
    }

    /// Run the strategies over fetched content, first hit wins.
    pub fn extract_from_content(&self, content: &str) -> Option<String> {
        self.strategies.iter().find_map(|strategy| {
            let raw = strategy.extract(content)?;
            let domain = normalize_domain(&raw, &self.marker)?;
            log::info!("Extracted domain {domain} via {}", strategy.name());
            Some(domain)
        })
    }

    /// Rebuild the domain from the slug embedded in the source URL.
    pub fn extract_from_source_url(&self) -> Option<SlugDomain> {
        let slug = extract_slug(&self.source_url, &self.slug_pattern)?;
        let marker_token = self.marker.trim_matches('/');
        domain_from_slug(&slug, marker_token, &self.tld_candidates)
    }
}
