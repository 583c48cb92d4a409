//! Ranked extraction strategies.
//!
//! Each strategy is a pure `content -> Option<raw match>` function. The
//! extractor tries them in order and normalizes the first hit.

use regex::{Regex, RegexBuilder};
use scraper::{Html, Selector};

use crate::error::{AppError, Result};

/// One way of finding the referral domain in fetched page content.
pub trait ExtractionStrategy: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Raw, un-normalized match, if the content contains one.
    fn extract(&self, content: &str) -> Option<String>;
}

/// Case-insensitive regex strategy.
///
/// With capture groups, the last group wins when it matched, else the first;
/// without groups the whole match is used.
pub struct RegexStrategy {
    regex: Regex,
}

impl RegexStrategy {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { regex })
    }

    fn pick(&self, caps: &regex::Captures<'_>) -> Option<String> {
        let group_count = self.regex.captures_len() - 1;
        let chosen = if group_count == 0 {
            caps.get(0)
        } else {
            caps.get(group_count)
                .filter(|m| !m.as_str().is_empty())
                .or_else(|| caps.get(1))
        };
        chosen
            .map(|m| m.as_str().to_string())
            .filter(|s| !s.is_empty())
    }
}

impl ExtractionStrategy for RegexStrategy {
    fn name(&self) -> &str {
        self.regex.as_str()
    }

    fn extract(&self, content: &str) -> Option<String> {
        self.regex
            .captures_iter(content)
            .find_map(|caps| self.pick(&caps))
    }
}

/// Markup strategy: the `href` of the first anchor matching a CSS selector.
pub struct AnchorStrategy {
    raw: String,
    selector: Selector,
}

impl AnchorStrategy {
    pub fn new(selector: &str) -> Result<Self> {
        let parsed =
            Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        Ok(Self {
            raw: selector.to_string(),
            selector: parsed,
        })
    }
}

impl ExtractionStrategy for AnchorStrategy {
    fn name(&self) -> &str {
        &self.raw
    }

    fn extract(&self, content: &str) -> Option<String> {
        let document = Html::parse_document(content);
        document
            .select(&self.selector)
            .filter_map(|el| el.value().attr("href"))
            .map(str::trim)
            .find(|href| href.starts_with("http") || href.contains('.'))
            .map(str::to_string)
    }
}
