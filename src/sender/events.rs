//! Events emitted toward whatever UI is watching a campaign.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SendEvent {
    /// Once per dispatched contact
    Progress { percent: u8 },
    /// Completion, stop, or a fatal start/ingestion error
    Notification { message: String, severity: Severity },
}

impl SendEvent {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Notification {
            message: message.into(),
            severity: Severity::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Notification {
            message: message.into(),
            severity: Severity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(SendEvent::Progress { percent: 50 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "progress", "percent": 50}));

        let json = serde_json::to_value(SendEvent::error("stopped")).unwrap();
        assert_eq!(json["severity"], "error");
    }
}
