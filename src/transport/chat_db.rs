//! Read-only access to Messages' chat.db for handle lookup.
//!
//! CHANGELOG:
//! - 10/18/2026 - Handle lookup by phone variant
//! - 01/10/2026 - Initial connection helper

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

/// Default Messages.db path.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Library")
        .join("Messages")
        .join("chat.db")
}

/// Open a read-only connection to a Messages database.
pub fn open_db(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open Messages database at {:?}", path))
}

/// First handle id equal to one of `candidates`, tried in order.
///
/// Returns `(handle_id, matched_candidate)`.
pub fn find_handle(conn: &Connection, candidates: &[String]) -> Result<Option<(String, String)>> {
    let mut stmt = conn.prepare("SELECT id FROM handle WHERE id = ?1 LIMIT 1")?;
    for candidate in candidates {
        let found: Option<String> = stmt
            .query_row([candidate], |row| row.get(0))
            .optional()?;
        if let Some(id) = found {
            return Ok(Some((id, candidate.clone())));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE handle (ROWID INTEGER PRIMARY KEY, id TEXT NOT NULL, service TEXT);
            INSERT INTO handle (id, service) VALUES ('3331234567', 'iMessage');
            INSERT INTO handle (id, service) VALUES ('+15551234567', 'iMessage');
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_default_db_path() {
        assert!(default_db_path().ends_with("Library/Messages/chat.db"));
    }

    #[test]
    fn test_find_handle_first_matching_variant() {
        let conn = fixture();
        let candidates: Vec<String> = ["+393331234567", "393331234567", "3331234567"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            find_handle(&conn, &candidates).unwrap(),
            Some(("3331234567".to_string(), "3331234567".to_string()))
        );
    }

    #[test]
    fn test_find_handle_none() {
        let conn = fixture();
        assert_eq!(find_handle(&conn, &["+4400".to_string()]).unwrap(), None);
    }
}
