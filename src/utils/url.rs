// src/utils/url.rs

//! URL manipulation utilities.

use regex::Regex;

/// How a slug-derived domain was reconstructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlugDomain {
    /// Segments before a known top-level-domain token, joined with `.`
    Tld(String),
    /// Last resort: every `-` replaced with `.`
    Naive(String),
}

impl SlugDomain {
    pub fn into_inner(self) -> String {
        match self {
            SlugDomain::Tld(domain) | SlugDomain::Naive(domain) => domain,
        }
    }
}

/// Normalize a raw match into a canonical `scheme://host` string.
///
/// Cuts everything from the first `marker` on, drops trailing slashes and
/// prepends `https://` when no scheme is present.
///
/// # Examples
/// ```
/// use linkwatch::utils::url::normalize_domain;
///
/// assert_eq!(
///     normalize_domain("www.example.com/join/123", "/join"),
///     Some("https://www.example.com".to_string())
/// );
/// ```
pub fn normalize_domain(raw: &str, marker: &str) -> Option<String> {
    let head = match raw.find(marker) {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let head = head.trim().trim_end_matches('/');
    if head.is_empty() {
        return None;
    }

    if has_http_scheme(head) {
        Some(head.to_string())
    } else {
        Some(format!("https://{head}"))
    }
}

fn has_http_scheme(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Pull the domain slug out of a source URL.
///
/// The pattern runs against the last path segment when the URL parses, and
/// against the whole string otherwise. Its first capture group is the slug.
pub fn extract_slug(source_url: &str, pattern: &Regex) -> Option<String> {
    let segment = ::url::Url::parse(source_url).ok().and_then(|u| {
        u.path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
    });
    let haystack = segment.as_deref().unwrap_or(source_url);

    pattern
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}

/// Rebuild a canonical domain from a `sub-domain-tld-join-...` slug.
///
/// Segments after `marker_token` are ignored. The last known TLD token
/// (not in leading position) ends the host, so labels such as `io` or `co`
/// inside the name stay part of it; segments before it are joined with `.`. Without a TLD token the whole slug falls back to a naive
/// `-` to `.` replacement.
pub fn domain_from_slug(slug: &str, marker_token: &str, tlds: &[String]) -> Option<SlugDomain> {
    let parts: Vec<&str> = slug.split('-').collect();
    let host_parts = match parts.iter().position(|p| *p == marker_token) {
        Some(idx) => &parts[..idx],
        None => &parts[..],
    };

    if host_parts.len() >= 2 {
        let tld_idx = host_parts
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, part)| tlds.iter().any(|tld| tld.eq_ignore_ascii_case(part)))
            .map(|(idx, _)| idx)
            .last();

        if let Some(idx) = tld_idx {
            let host = format!("{}.{}", host_parts[..idx].join("."), host_parts[idx]);
            return Some(SlugDomain::Tld(format!("https://{host}")));
        }
    }

    let naive = slug
        .replace(&format!("-{marker_token}"), "")
        .replace('-', ".");
    let naive = naive.trim_matches('.');
    if naive.is_empty() {
        return None;
    }
    Some(SlugDomain::Naive(format!("https://{naive}")))
}
