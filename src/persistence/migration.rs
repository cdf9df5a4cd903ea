use serde_json::{Map, Value};

use crate::errors::{Result, ScheduleError};

pub type Record = Map<String, Value>;

/// one upcast from `from_version` to the next schema version
#[derive(Clone, Copy)]
pub struct SchemaStep {
    pub from_version: u32,
    /// record still has the shape of `from_version`
    pub detect: fn(&Record) -> bool,
    pub upcast: fn(Record) -> Result<Record>,
}

impl std::fmt::Debug for SchemaStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaStep")
            .field("from_version", &self.from_version)
            .finish()
    }
}

/// ordered upcasts applied to each record until no detector matches
#[derive(Debug, Clone)]
pub struct MigrationChain {
    name: &'static str,
    current_version: u32,
    steps: Vec<SchemaStep>,
}

/// record after migration, with the version it was read as
#[derive(Debug, Clone, PartialEq)]
pub struct Migrated {
    pub record: Record,
    pub read_as: u32,
}

impl Migrated {
    pub fn was_upgraded(&self, current_version: u32) -> bool {
        self.read_as < current_version
    }
}

impl MigrationChain {
    pub fn new(name: &'static str, current_version: u32, steps: Vec<SchemaStep>) -> Self {
        Self {
            name,
            current_version,
            steps,
        }
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    /// upcast one record to the current version
    pub fn migrate(&self, value: Value) -> Result<Migrated> {
        let mut record = match value {
            Value::Object(record) => record,
            other => {
                return Err(ScheduleError::Migration {
                    version: 0,
                    message: format!("{} record is not an object: {}", self.name, other),
                })
            }
        };

        let mut read_as = None;
        // each step can fire at most once
        for _ in 0..=self.steps.len() {
            let Some(step) = self.steps.iter().find(|s| (s.detect)(&record)) else {
                return Ok(Migrated {
                    record,
                    read_as: read_as.unwrap_or(self.current_version),
                });
            };

            if read_as.is_none() {
                read_as = Some(step.from_version);
            }
            record = (step.upcast)(record).map_err(|e| ScheduleError::Migration {
                version: step.from_version,
                message: format!("{} upcast failed: {}", self.name, e),
            })?;
            tracing::trace!(chain = self.name, from = step.from_version, "record upcast");
        }

        Err(ScheduleError::Migration {
            version: read_as.unwrap_or(0),
            message: format!("{} migration did not converge", self.name),
        })
    }
}

/// required string field
pub(crate) fn take_str(record: &Record, field: &str, version: u32) -> Result<String> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ScheduleError::Migration {
            version,
            message: format!("missing '{field}'"),
        })
}

/// required unsigned integer field, also accepting numeric strings
pub(crate) fn take_u32(record: &Record, field: &str, version: u32) -> Result<u32> {
    let value = record.get(field);
    value
        .and_then(Value::as_u64)
        .or_else(|| value.and_then(Value::as_str).and_then(|s| s.trim().parse().ok()))
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(ScheduleError::Migration {
            version,
            message: format!("missing or invalid '{field}'"),
        })
}
