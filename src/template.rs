//! `{{field}}` placeholder expansion for message templates.
//!
//! Unknown placeholders are left verbatim: a visible `{{typo}}` in a sent
//! message is easier to notice than text that silently vanished.
//!
//! CHANGELOG:
//! - 10/18/2026 - Initial implementation

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([^}]+)\}\}").expect("static regex is valid"))
}

/// Replace every `{{key}}` with `fields[key]`.
///
/// Keys are trimmed and matched case-insensitively; `fields` is expected to
/// use lower-case keys (as `Contact::template_fields` produces).
pub fn expand(template: &str, fields: &HashMap<String, String>) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures| {
            let key = caps[1].trim().to_lowercase();
            match fields.get(&key) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Placeholder keys in `template` that `fields` cannot resolve.
pub fn unresolved(template: &str, fields: &HashMap<String, String>) -> Vec<String> {
    placeholder_regex()
        .captures_iter(template)
        .map(|caps| caps[1].trim().to_lowercase())
        .filter(|key| !fields.contains_key(key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_expand_simple() {
        assert_eq!(expand("Hi {{name}}", &fields(&[("name", "Ann")])), "Hi Ann");
    }

    #[test]
    fn test_unknown_placeholder_survives() {
        assert_eq!(expand("Hi {{missing}}", &HashMap::new()), "Hi {{missing}}");
    }

    #[test]
    fn test_key_is_trimmed_and_case_insensitive() {
        let f = fields(&[("name", "Ann")]);
        assert_eq!(expand("Hi {{ Name }}!", &f), "Hi Ann!");
    }

    #[test]
    fn test_repeated_placeholders() {
        let f = fields(&[("name", "Ann")]);
        assert_eq!(expand("{{name}}, {{name}}", &f), "Ann, Ann");
    }

    #[test]
    fn test_values_are_not_re_expanded() {
        let f = fields(&[("name", "{{city}}"), ("city", "Rome")]);
        assert_eq!(expand("Hi {{name}}", &f), "Hi {{city}}");
    }

    #[test]
    fn test_unbalanced_braces_untouched() {
        let f = fields(&[("name", "Ann")]);
        assert_eq!(expand("Hi {{name} and {name}}", &f), "Hi {{name} and {name}}");
    }

    #[test]
    fn test_unresolved_lists_missing_keys() {
        let f = fields(&[("name", "Ann")]);
        assert_eq!(unresolved("{{name}} {{City}}", &f), vec!["city".to_string()]);
    }
}
