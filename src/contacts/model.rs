//! Contact record produced by ingestion and consumed by the send loop.
//!
//! CHANGELOG:
//! - 10/18/2026 - Campaign contact with template fields and send status

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-contact send status. Only the orchestrator mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

/// One recipient from the input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Normalized international form (`+` followed by digits)
    pub phone: String,
    pub name: String,
    /// Message template with `{{field}}` placeholders
    pub message: String,
    /// All non-required columns, keyed by lower-cased header
    #[serde(default)]
    pub extra_fields: HashMap<String, String>,
    /// Source row (header is row 1)
    pub row_number: usize,
    #[serde(default)]
    pub status: ContactStatus,
    /// False when the normalized phone does not look like E.164
    #[serde(default = "default_true")]
    pub phone_valid: bool,
}

fn default_true() -> bool {
    true
}

impl Contact {
    /// Fields visible to the template engine.
    ///
    /// Extra columns come first so the required columns always win on a
    /// key collision.
    pub fn template_fields(&self) -> HashMap<String, String> {
        let mut fields: HashMap<String, String> = self
            .extra_fields
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
        fields.insert("phone".to_string(), self.phone.clone());
        fields.insert("name".to_string(), self.name.clone());
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> Contact {
        Contact {
            phone: "+15551234567".into(),
            name: "Ann".into(),
            message: "Hi {{name}}".into(),
            extra_fields: HashMap::from([("city".to_string(), "Rome".to_string())]),
            row_number: 2,
            status: ContactStatus::Pending,
            phone_valid: true,
        }
    }

    #[test]
    fn test_template_fields_include_required_and_extra() {
        let fields = contact().template_fields();
        assert_eq!(fields["phone"], "+15551234567");
        assert_eq!(fields["name"], "Ann");
        assert_eq!(fields["city"], "Rome");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_value(contact()).unwrap();
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn test_legacy_record_without_flags_deserializes() {
        let json = r#"{"phone":"+1555","name":"A","message":"m","row_number":2}"#;
        let c: Contact = serde_json::from_str(json).unwrap();
        assert_eq!(c.status, ContactStatus::Pending);
        assert!(c.phone_valid);
        assert!(c.extra_fields.is_empty());
    }
}
