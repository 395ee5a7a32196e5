//! AppleScript execution for sending iMessages.
//!
//! Uses osascript to communicate with Messages.app.
//!
//! CHANGELOG:
//! - 10/18/2026 - Real timeout via tokio; readiness check for campaign start
//! - 01/10/2026 - Initial implementation

use anyhow::{anyhow, Context, Result};
use std::process::Command;
use std::time::Duration;

/// Escape a string for safe inclusion in AppleScript.
///
/// CRITICAL: Order matters!
/// 1. Escape backslashes FIRST
/// 2. Then escape quotes
///
/// This prevents injection attacks where template data breaks the string context.
pub fn escape_applescript_string(s: &str) -> String {
    s.replace('\\', "\\\\") // Backslashes FIRST
        .replace('"', "\\\"") // Then quotes
}

fn send_script(handle: &str, message: &str) -> String {
    format!(
        r#"
tell application "Messages"
    set targetService to 1st account whose service type = iMessage
    set targetBuddy to participant "{}" of targetService
    send "{}" to targetBuddy
end tell
"#,
        escape_applescript_string(handle),
        escape_applescript_string(message)
    )
}

const READY_SCRIPT: &str = r#"
tell application "Messages"
    get name of 1st account whose service type = iMessage
end tell
"#;

fn run_osascript(script: &str) -> Result<()> {
    let output = Command::new("osascript")
        .arg("-e")
        .arg(script)
        .output()
        .context("Failed to launch osascript")?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(anyhow!("AppleScript failed: {}", stderr.trim()))
    }
}

/// Send an iMessage via Messages.app (blocking).
pub fn send_imessage(handle: &str, message: &str) -> Result<()> {
    run_osascript(&send_script(handle, message))
}

/// Send an iMessage, giving up after `timeout`.
///
/// osascript keeps running on the blocking pool if it overruns; the caller
/// just stops waiting for it.
pub async fn send_imessage_with_timeout(handle: &str, message: &str, timeout: Duration) -> Result<()> {
    let handle = handle.to_string();
    let message = message.to_string();
    let task = tokio::task::spawn_blocking(move || send_imessage(&handle, &message));

    match tokio::time::timeout(timeout, task).await {
        Ok(joined) => joined.context("osascript task panicked")?,
        Err(_) => Err(anyhow!("AppleScript send timed out after {:?}", timeout)),
    }
}

/// Check that Messages.app has an iMessage account (blocking).
pub fn check_messages_app() -> Result<()> {
    run_osascript(READY_SCRIPT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_simple() {
        assert_eq!(escape_applescript_string("Hello"), "Hello");
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape_applescript_string(r#"Say "Hi""#), r#"Say \"Hi\""#);
    }

    #[test]
    fn test_escape_order_matters() {
        let input = r#"\"test\""#;
        let expected = r#"\\\"test\\\""#;
        assert_eq!(escape_applescript_string(input), expected);
    }

    #[test]
    fn test_send_script_escapes_template_output() {
        let script = send_script("+15551234567", r#"Hi "Ann" \o/"#);
        assert!(script.contains(r#"participant "+15551234567""#));
        assert!(script.contains(r#"send "Hi \"Ann\" \\o/" to targetBuddy"#));
    }
}
