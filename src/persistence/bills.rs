use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::dates::MonthKey;
use crate::decimal::Money;
use crate::errors::{Result, ScheduleError};
use crate::obligation::RecurringObligation;
use crate::types::{AccountId, Cadence, CategoryId, ObligationGroup, ObligationId};

use super::migration::{take_str, take_u32, MigrationChain, Record, SchemaStep};
use super::{document_payload, Loaded};

pub const BILLS_SCHEMA_VERSION: u32 = 3;

/// persisted shape of an obligation at the current schema version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObligationRecord {
    pub id: ObligationId,
    pub name: String,
    pub amount: Money,
    pub account_id: AccountId,
    pub first_payment_date: NaiveDate,
    pub cadence: String,
    #[serde(default)]
    pub custom_every_days: Option<i64>,
    pub group: String,
    #[serde(default)]
    pub group_label: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

impl ObligationRecord {
    pub fn from_obligation(obligation: &RecurringObligation) -> Self {
        let custom_every_days = match obligation.cadence {
            Cadence::CustomDays(n) => Some(n as i64),
            _ => None,
        };
        let group_label = match &obligation.group {
            ObligationGroup::Custom(label) => Some(label.clone()),
            _ => None,
        };

        Self {
            id: obligation.id,
            name: obligation.name.clone(),
            amount: obligation.amount,
            account_id: obligation.account_id,
            first_payment_date: obligation.first_payment_date,
            cadence: obligation.cadence.as_tag().to_string(),
            custom_every_days,
            group: obligation.group.as_tag().to_string(),
            group_label,
            category_id: obligation.category_id,
        }
    }

    /// rebuild the obligation; malformed cadences become "never due"
    /// instead of failing the load
    pub fn into_obligation(self) -> RecurringObligation {
        let cadence = match self.cadence.as_str() {
            "weekly" => Cadence::Weekly,
            "monthly" => Cadence::Monthly,
            "yearly" => Cadence::Yearly,
            "custom_days" => match self.custom_every_days.and_then(|n| u32::try_from(n).ok()) {
                Some(n) if n > 0 => Cadence::CustomDays(n),
                _ => {
                    tracing::warn!(
                        obligation = %self.id,
                        interval = ?self.custom_every_days,
                        "custom cadence without a positive interval, never due"
                    );
                    Cadence::CustomDays(0)
                }
            },
            other => {
                tracing::warn!(obligation = %self.id, cadence = other, "unknown cadence, never due");
                Cadence::CustomDays(0)
            }
        };

        let group = match self.group.as_str() {
            "living" => ObligationGroup::Living,
            "utility" => ObligationGroup::Utility,
            "subscription" => ObligationGroup::Subscription,
            "custom" => match self.group_label.as_deref().map(str::trim) {
                Some(label) if !label.is_empty() => ObligationGroup::Custom(label.to_string()),
                _ => {
                    tracing::warn!(obligation = %self.id, "custom group without a label, using living");
                    ObligationGroup::Living
                }
            },
            other => {
                tracing::warn!(obligation = %self.id, group = other, "unknown group, using living");
                ObligationGroup::Living
            }
        };

        RecurringObligation {
            id: self.id,
            name: self.name,
            group,
            amount: self.amount,
            cadence,
            first_payment_date: self.first_payment_date,
            account_id: self.account_id,
            category_id: self.category_id,
        }
    }
}

/// v1 `{startMonth, dayOfMonth}` monthly-only bills
fn is_v1(record: &Record) -> bool {
    record.contains_key("startMonth")
}

fn v1_to_v2(mut record: Record) -> Result<Record> {
    let month: MonthKey = take_str(&record, "startMonth", 1)?.parse()?;
    let day = take_u32(&record, "dayOfMonth", 1)?;
    if !(1..=31).contains(&day) {
        return Err(ScheduleError::Migration {
            version: 1,
            message: format!("day of month {day} outside 1-31"),
        });
    }

    record.remove("startMonth");
    record.remove("dayOfMonth");
    record.insert(
        "firstPaymentDate".into(),
        json!(month.day_clamped(day).format("%Y-%m-%d").to_string()),
    );
    record.insert("cadence".into(), json!("monthly"));
    record.insert("customEveryDays".into(), Value::Null);
    Ok(record)
}

/// v2 has a cadence but no grouping
fn is_v2(record: &Record) -> bool {
    record.contains_key("firstPaymentDate") && !record.contains_key("group")
}

fn v2_to_v3(mut record: Record) -> Result<Record> {
    record.insert("group".into(), json!("living"));
    record.insert("groupLabel".into(), Value::Null);
    record.insert("categoryId".into(), Value::Null);
    Ok(record)
}

pub fn bill_migrations() -> MigrationChain {
    MigrationChain::new(
        "bills",
        BILLS_SCHEMA_VERSION,
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

/// load a bills document of any version, including a bare v1 array
pub fn load_bills(raw: &str) -> Result<Loaded<Vec<RecurringObligation>>> {
    let (version, payload) = document_payload(raw, "bills")?;
    let Value::Array(records) = payload else {
        return Err(ScheduleError::Migration {
            version: version.unwrap_or(0) as u32,
            message: "bills payload is not an array".to_string(),
        });
    };

    let chain = bill_migrations();
    let mut loaded = Loaded {
        items: Vec::with_capacity(records.len()),
        upgraded: 0,
        skipped: 0,
    };

    for (index, value) in records.into_iter().enumerate() {
        let migrated = match chain.migrate(value) {
            Ok(migrated) => migrated,
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping unreadable bill");
                loaded.skipped += 1;
                continue;
            }
        };
        if migrated.was_upgraded(chain.current_version()) {
            loaded.upgraded += 1;
        }

        match serde_json::from_value::<ObligationRecord>(Value::Object(migrated.record)) {
            Ok(record) => loaded.items.push(record.into_obligation()),
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping malformed bill");
                loaded.skipped += 1;
            }
        }
    }

    if loaded.upgraded > 0 {
        tracing::info!(
            upgraded = loaded.upgraded,
            from = ?version,
            to = BILLS_SCHEMA_VERSION,
            "migrated bills"
        );
    }
    Ok(loaded)
}

pub fn save_bills(obligations: &[RecurringObligation]) -> Result<String> {
    let records: Vec<ObligationRecord> = obligations.iter().map(ObligationRecord::from_obligation).collect();
    let document = json!({
        "version": BILLS_SCHEMA_VERSION,
        "bills": records,
    });
    Ok(serde_json::to_string_pretty(&document)?)
}
