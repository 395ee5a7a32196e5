//! Phone number canonicalization and match-candidate variants.
//!
//! CHANGELOG:
//! - 10/18/2026 - Moved out of messaging commands; added variants for handle lookup
//! - 01/10/2026 - Initial normalize_phone helper

use regex::Regex;
use std::sync::OnceLock;

fn e164_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[1-9]\d{1,14}$").expect("static regex is valid"))
}

/// Canonicalize a raw phone cell to `+` followed by its digits.
///
/// Every character other than digits is dropped (spaces, dashes, parens,
/// extension markers), then a single `+` is prefixed.
pub fn normalize(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("+{}", digits)
}

/// True iff the phone looks E.164-shaped (2-15 significant digits, no leading zero).
pub fn validate(phone: &str) -> bool {
    e164_regex().is_match(phone)
}

/// Representations the Messages handle table might hold for this phone.
///
/// Order: the phone as given, normalized, without `+`, digits only, with the
/// leading 2-digit country code stripped, and the stripped form with a
/// trunk `0` re-added. Duplicates are removed keeping the first occurrence.
///
/// This is a best-effort heuristic. Country codes are not always two digits
/// (`+1`, `+353`), so the stripped forms can match a different person's
/// local number. Callers treat a match as "probably this contact".
pub fn variants(phone: &str) -> Vec<String> {
    let normalized = normalize(phone);
    let digits = normalized.trim_start_matches('+').to_string();

    let mut candidates = vec![
        normalized.clone(),
        phone.trim_start_matches('+').to_string(),
        digits.clone(),
    ];
    if digits.len() > 2 {
        let local = &digits[2..];
        candidates.push(local.to_string());
        candidates.push(format!("0{}", local));
    }

    let mut out = vec![phone.to_string()];
    for candidate in candidates {
        if !candidate.is_empty() && !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}
