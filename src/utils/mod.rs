//! Utility functions and helpers.

pub mod http;
pub mod url;

/// Fill `{key}` placeholders in a message template.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_template() {
        assert_eq!(
            fill_template("{a}-{b}-{a}", &[("a", "1"), ("b", "2")]),
            "1-2-1"
        );
        assert_eq!(fill_template("no placeholders", &[("a", "1")]), "no placeholders");
    }
}
