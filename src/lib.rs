//! wolfies-blitz library
//!
//! Bulk personalized messaging: ingest a contact sheet, expand one template
//! per row, and send through iMessage with human-like pacing. Exposes
//! modules for use by the CLI, daemon and client binaries.
//!
//! CHANGELOG:
//! - 10/18/2026 - Campaign modules replace the chat.db reader
//! - 01/10/2026 - Initial library structure

pub mod commands;
pub mod config;
pub mod contacts;
pub mod daemon;
pub mod errors;
pub mod history;
pub mod output;
pub mod sender;
pub mod store;
pub mod template;
pub mod transport;
