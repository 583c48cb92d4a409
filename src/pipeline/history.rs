// src/pipeline/history.rs

//! Human-readable history listing.

use crate::models::{ChangeType, DomainRecord};

/// Render history records, oldest first, one line each.
pub fn render_history(records: &[DomainRecord]) -> String {
    if records.is_empty() {
        return "No history recorded yet.".to_string();
    }

    let mut out = format!("History ({} records):\n", records.len());
    for (i, record) in records.iter().enumerate() {
        let when = record.timestamp.format("%Y-%m-%d %H:%M:%S");
        let line = match (&record.change_type, &record.previous) {
            (ChangeType::Changed, Some(previous)) => format!(
                "{:>3}. {when}  {:<19}  {previous} -> {}",
                i + 1,
                record.change_type.to_string(),
                record.domain_or_link
            ),
            _ => format!(
                "{:>3}. {when}  {:<19}  {}",
                i + 1,
                record.change_type.to_string(),
                record.domain_or_link
            ),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_has_placeholder() {
        assert_eq!(render_history(&[]), "No history recorded yet.");
    }

    #[test]
    fn lists_records_in_order() {
        let records = vec![
            DomainRecord::first_seen("https://a.com"),
            DomainRecord::changed("https://a.com", "https://b.com"),
            DomainRecord::propagation_applied("https://b.com/join/1"),
        ];
        let text = render_history(&records);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("History (3 records)"));
        assert!(lines[1].contains("first seen") && lines[1].ends_with("https://a.com"));
        assert!(lines[2].ends_with("https://a.com -> https://b.com"));
        assert!(lines[3].contains("propagation applied"));
    }
}
