//! Output formatting and control utilities.
//!
//! Every command can print human text or JSON; `--fields` and
//! `--max-text-chars` shape the JSON for scripts and LLM callers.
//!
//! CHANGELOG:
//! - 10/18/2026 - Command results, char-safe truncation, event lines
//! - 01/10/2026 - Initial implementation

use crate::commands::CommandResult;
use crate::sender::{SendEvent, Severity};
use serde::Serialize;
use serde_json::{json, Value};

/// Output control settings from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct OutputControls {
    pub json: bool,
    pub compact: bool,
    pub fields: Option<String>,
    pub max_text_chars: Option<usize>,
}

impl OutputControls {
    /// Render data according to output controls.
    pub fn emit<T: Serialize>(&self, data: &T) -> String {
        let mut value = serde_json::to_value(data).unwrap_or(Value::Null);

        if let Some(ref fields) = self.fields {
            value = filter_fields(&value, fields);
        }
        if let Some(max_chars) = self.max_text_chars {
            value = truncate_text_fields(&value, max_chars);
        }

        let rendered = if self.compact {
            serde_json::to_string(&value)
        } else {
            serde_json::to_string_pretty(&value)
        };
        rendered.unwrap_or_else(|_| "{}".to_string())
    }

    pub fn print<T: Serialize>(&self, data: &T) {
        println!("{}", self.emit(data));
    }

    /// Print a command result; returns whether it succeeded.
    pub fn print_result(&self, result: &CommandResult) -> bool {
        if self.json {
            self.print(result);
        } else if result.success {
            println!("{}", result.message);
        } else {
            eprintln!("Error: {}", result.message);
        }
        result.success
    }

    /// One line per event while a foreground run is in progress.
    pub fn print_event(&self, event: &SendEvent) {
        if self.json {
            // Events are always one line so they can be streamed
            println!("{}", serde_json::to_string(event).unwrap_or_default());
            return;
        }
        match event {
            SendEvent::Progress { percent } => println!("[{:>3}%]", percent),
            SendEvent::Notification {
                message,
                severity: Severity::Success,
            } => println!("{}", message),
            SendEvent::Notification {
                message,
                severity: Severity::Error,
            } => eprintln!("Error: {}", message),
        }
    }
}

/// Keep only the listed keys of every object (arrays are mapped).
fn filter_fields(value: &Value, fields: &str) -> Value {
    let field_list: Vec<&str> = fields.split(',').map(|s| s.trim()).collect();

    match value {
        Value::Array(arr) => Value::Array(arr.iter().map(|v| filter_fields(v, fields)).collect()),
        Value::Object(map) => {
            let mut filtered = serde_json::Map::new();
            for field in &field_list {
                if let Some(v) = map.get(*field) {
                    filtered.insert(field.to_string(), v.clone());
                }
            }
            Value::Object(filtered)
        }
        _ => value.clone(),
    }
}

/// Truncate string fields to `max_chars` characters (not bytes).
fn truncate_text_fields(value: &Value, max_chars: usize) -> Value {
    match value {
        Value::String(s) if s.chars().count() > max_chars => {
            let head: String = s.chars().take(max_chars).collect();
            Value::String(format!("{}...", head))
        }
        Value::Array(arr) => {
            Value::Array(arr.iter().map(|v| truncate_text_fields(v, max_chars)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), truncate_text_fields(v, max_chars)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Format error as JSON.
pub fn format_error(error: &str) -> String {
    json!({
        "error": error,
        "success": false
    })
    .to_string()
}
