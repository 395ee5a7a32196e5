//! Contacts: the typed recipient records, phone canonicalization, and
//! ingestion from decoded tabular rows.
//!
//! CHANGELOG:
//! - 10/18/2026 - Replaced contacts.json manager with campaign ingestion
//! - 01/10/2026 - Initial module structure

pub mod decoder;
pub mod ingest;
pub mod model;
pub mod phone;

pub use decoder::{
    decoder_for_path, rows_from_json, CsvDecoder, JsonRowsDecoder, Row, TabularDecoder, XlsxDecoder,
};
pub use ingest::ingest;
pub use model::{Contact, ContactStatus};
