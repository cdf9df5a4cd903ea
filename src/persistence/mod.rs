//! Versioned JSON documents for bills and card cycle settings.
//!
//! Documents are `{"version": n, "<key>": ...}`. Every record is upcast on
//! its own through a [`MigrationChain`], so a document mixing record
//! versions loads cleanly. Saving always writes the current version.

pub mod bills;
pub mod card_meta;
pub mod migration;

use serde_json::Value;

use crate::errors::{Result, ScheduleError};

pub use bills::{load_bills, save_bills, ObligationRecord, BILLS_SCHEMA_VERSION};
pub use card_meta::{load_card_meta, save_card_meta, CARD_META_SCHEMA_VERSION};
pub use migration::{Migrated, MigrationChain, SchemaStep};

/// result of loading a document
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<C> {
    pub items: C,
    /// records read from an older schema
    pub upgraded: usize,
    /// malformed records left out
    pub skipped: usize,
}

impl<C> Loaded<C> {
    /// the document should be rewritten at the current version
    pub fn needs_save(&self) -> bool {
        self.upgraded > 0 || self.skipped > 0
    }
}

/// payload under `key`, or the whole value for legacy documents
/// stored without an envelope
fn document_payload(raw: &str, key: &str) -> Result<(Option<u64>, Value)> {
    let value: Value = serde_json::from_str(raw)?;
    match value {
        Value::Object(mut envelope) if envelope.contains_key(key) => {
            let version = envelope.get("version").and_then(Value::as_u64);
            let payload = envelope.remove(key).unwrap_or(Value::Null);
            Ok((version, payload))
        }
        Value::Array(_) | Value::Object(_) => Ok((None, value)),
        other => Err(ScheduleError::Migration {
            version: 0,
            message: format!("unexpected document root: {other}"),
        }),
    }
}
