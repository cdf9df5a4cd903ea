use serde::{Deserialize, Serialize};

use crate::errors::{Result, ScheduleError};

/// hard bound on cadence stepping
pub const DEFAULT_MAX_PROJECTION_STEPS: u32 = 4000;

/// how a passed, unposted occurrence is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// sufficient balance reads as paid, the posting follows
    #[default]
    BalanceHeuristic,
    /// only a ledger posting reads as paid; sufficient balance reads as pending
    LedgerStrict,
}

/// engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_projection_steps: u32,
    pub bill_memo_prefix: String,
    pub loan_memo_prefix: String,
    pub settle_memo_prefix: String,
    pub status_policy: StatusPolicy,
    /// block autopay when the paying account is missing or short
    pub require_sufficient_balance: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_projection_steps: DEFAULT_MAX_PROJECTION_STEPS,
            bill_memo_prefix: "AUTO_BILL".to_string(),
            loan_memo_prefix: "AUTO_LOAN".to_string(),
            settle_memo_prefix: "LOAN_SETTLE".to_string(),
            status_policy: StatusPolicy::BalanceHeuristic,
            require_sufficient_balance: true,
        }
    }
}

impl EngineConfig {
    /// ledger-backed status; autopay keeps the balance gate
    pub fn strict() -> Self {
        Self {
            status_policy: StatusPolicy::LedgerStrict,
            ..Self::default()
        }
    }

    /// autopay posts regardless of the paying account's balance
    pub fn unconditional_autopay() -> Self {
        Self {
            require_sufficient_balance: false,
            ..Self::default()
        }
    }

    /// parse from json, missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_projection_steps == 0 {
            return Err(ScheduleError::InvalidConfiguration {
                message: "max_projection_steps must be positive".to_string(),
            });
        }

        for (field, prefix) in [
            ("bill_memo_prefix", &self.bill_memo_prefix),
            ("loan_memo_prefix", &self.loan_memo_prefix),
            ("settle_memo_prefix", &self.settle_memo_prefix),
        ] {
            if prefix.is_empty() || prefix.contains('|') {
                return Err(ScheduleError::InvalidConfiguration {
                    message: format!("{} must be non-empty and must not contain '|'", field),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_projection_steps, 4000);
        assert_eq!(config.bill_memo_prefix, "AUTO_BILL");
        assert_eq!(config.status_policy, StatusPolicy::BalanceHeuristic);
        assert!(config.require_sufficient_balance);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{"status_policy": "ledger_strict"}"#).unwrap();
        assert_eq!(config.status_policy, StatusPolicy::LedgerStrict);
        assert_eq!(config.loan_memo_prefix, "AUTO_LOAN");
    }

    #[test]
    fn test_rejects_bad_prefix() {
        let result = EngineConfig::from_json_str(r#"{"bill_memo_prefix": "A|B"}"#);
        assert!(matches!(result, Err(ScheduleError::InvalidConfiguration { .. })));

        let result = EngineConfig::from_json_str(r#"{"max_projection_steps": 0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_presets() {
        let strict = EngineConfig::strict();
        assert_eq!(strict.status_policy, StatusPolicy::LedgerStrict);
        assert!(strict.require_sufficient_balance);
        assert!(!EngineConfig::unconditional_autopay().require_sufficient_balance);
    }
}
