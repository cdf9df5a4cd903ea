use std::collections::BTreeMap;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::credit::CreditCardCycleMeta;
use crate::errors::{Result, ScheduleError};
use crate::types::AccountId;

use super::migration::{take_u32, MigrationChain, Record, SchemaStep};
use super::{document_payload, Loaded};

pub const CARD_META_SCHEMA_VERSION: u32 = 3;

/// v1 `{statementDay, paymentDay}`
fn is_v1(record: &Record) -> bool {
    record.contains_key("paymentDay")
}

fn v1_to_v2(mut record: Record) -> Result<Record> {
    let payment_day = take_u32(&record, "paymentDay", 1)?;
    record.remove("paymentDay");
    record.insert("paymentDueDay".into(), json!(payment_day));
    record.insert("creditLimit".into(), Value::Null);
    Ok(record)
}

/// v2 still closes the cycle on a single statement day
fn is_v2(record: &Record) -> bool {
    record.contains_key("statementDay") && !record.contains_key("paymentDay")
}

fn v2_to_v3(mut record: Record) -> Result<Record> {
    let statement_day = take_u32(&record, "statementDay", 2)?;
    if !(1..=31).contains(&statement_day) {
        return Err(ScheduleError::Migration {
            version: 2,
            message: format!("statement day {statement_day} outside 1-31"),
        });
    }

    // the cycle opens the day after the previous statement
    let cycle_start_day = statement_day % 31 + 1;
    record.remove("statementDay");
    record.insert("cycleStartDay".into(), json!(cycle_start_day));
    record.insert("cycleEndDay".into(), json!(statement_day));
    Ok(record)
}

pub fn card_meta_migrations() -> MigrationChain {
    MigrationChain::new(
        "card_meta",
        CARD_META_SCHEMA_VERSION,
        vec![
            SchemaStep {
                from_version: 1,
                detect: is_v1,
                upcast: v1_to_v2,
            },
            SchemaStep {
                from_version: 2,
                detect: is_v2,
                upcast: v2_to_v3,
            },
        ],
    )
}

/// load card cycle settings keyed by account id, including a bare legacy map
pub fn load_card_meta(raw: &str) -> Result<Loaded<BTreeMap<AccountId, CreditCardCycleMeta>>> {
    let (version, payload) = document_payload(raw, "cards")?;
    let Value::Object(entries) = payload else {
        return Err(ScheduleError::Migration {
            version: version.unwrap_or(0) as u32,
            message: "card meta payload is not an object".to_string(),
        });
    };

    let chain = card_meta_migrations();
    let mut loaded = Loaded {
        items: BTreeMap::new(),
        upgraded: 0,
        skipped: 0,
    };

    for (key, value) in entries {
        let Ok(account_id) = Uuid::parse_str(&key) else {
            tracing::warn!(key = %key, "skipping card meta with invalid account id");
            loaded.skipped += 1;
            continue;
        };

        let meta = chain.migrate(value).and_then(|migrated| {
            if migrated.was_upgraded(chain.current_version()) {
                loaded.upgraded += 1;
            }
            let meta: CreditCardCycleMeta = serde_json::from_value(Value::Object(migrated.record))?;
            meta.validate()?;
            Ok(meta)
        });

        match meta {
            Ok(meta) => {
                loaded.items.insert(account_id, meta);
            }
            Err(e) => {
                tracing::warn!(account = %account_id, error = %e, "skipping unreadable card meta");
                loaded.skipped += 1;
            }
        }
    }

    if loaded.upgraded > 0 {
        tracing::info!(
            upgraded = loaded.upgraded,
            from = ?version,
            to = CARD_META_SCHEMA_VERSION,
            "migrated card meta"
        );
    }
    Ok(loaded)
}

pub fn save_card_meta(cards: &BTreeMap<AccountId, CreditCardCycleMeta>) -> Result<String> {
    let document = json!({
        "version": CARD_META_SCHEMA_VERSION,
        "cards": cards,
    });
    Ok(serde_json::to_string_pretty(&document)?)
}
