//! Daemon mode: one long-lived campaign behind a UNIX socket.
//!
//! CHANGELOG:
//! - 10/18/2026 - Async server, client helpers, pid file handling
//! - 01/10/2026 - Initial module structure

pub mod client;
pub mod pidfile;
pub mod protocol;
pub mod server;
pub mod service;
