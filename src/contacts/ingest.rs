//! Contact ingestion: validate and normalize decoded rows.
//!
//! Pure transform. Persisting the resulting queue is the caller's job.
//!
//! CHANGELOG:
//! - 10/18/2026 - Initial implementation

use super::decoder::Row;
use super::model::{Contact, ContactStatus};
use super::phone;
use crate::errors::ValidationError;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Columns every contact file must carry.
pub const REQUIRED_COLUMNS: [&str; 3] = ["phone", "name", "message"];

/// Validate rows and build the contact list.
///
/// - Header keys are matched lower-cased and trimmed. Two keys in one row
///   that collide after that fail with `MalformedRow`.
/// - Fails with `EmptyInput` on zero rows, `MissingColumns` when a required
///   column is absent from every row, `NoValidContacts` when no row has a phone.
/// - Rows without a phone value are skipped.
/// - Invalid-looking phones are kept and flagged (`phone_valid = false`).
pub fn ingest(rows: &[Row]) -> Result<Vec<Contact>, ValidationError> {
    if rows.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    let mut normalized_rows: Vec<HashMap<String, &str>> = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let mut normalized = HashMap::with_capacity(row.len());
        for (key, value) in row {
            let key = key.trim().to_lowercase();
            if normalized.contains_key(&key) {
                return Err(ValidationError::MalformedRow {
                    row: index + 2,
                    reason: format!("duplicate column '{}'", key),
                });
            }
            normalized.insert(key, value.as_str());
        }
        normalized_rows.push(normalized);
    }

    let headers: BTreeSet<&str> = normalized_rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.contains(*col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingColumns(missing));
    }

    let mut contacts = Vec::with_capacity(rows.len());
    for (index, row) in normalized_rows.iter().enumerate() {
        // Header is row 1
        let row_number = index + 2;

        let raw_phone = row.get("phone").map(|p| p.trim()).unwrap_or_default();
        if raw_phone.is_empty() {
            debug!(row = row_number, "skipping row without phone");
            continue;
        }

        let phone = phone::normalize(raw_phone);
        let phone_valid = phone::validate(&phone);
        if !phone_valid {
            warn!(row = row_number, phone = %phone, "invalid phone number format");
        }

        let field = |key: &str| row.get(key).map(|v| v.trim().to_string()).unwrap_or_default();

        let extra_fields = row
            .iter()
            .filter(|(k, _)| !REQUIRED_COLUMNS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.trim().to_string()))
            .filter(|(_, v)| !v.is_empty())
            .collect();

        contacts.push(Contact {
            phone,
            name: field("name"),
            message: field("message"),
            extra_fields,
            row_number,
            status: ContactStatus::Pending,
            phone_valid,
        });
    }

    if contacts.is_empty() {
        return Err(ValidationError::NoValidContacts);
    }

    info!(count = contacts.len(), "ingested contacts");
    Ok(contacts)
}
