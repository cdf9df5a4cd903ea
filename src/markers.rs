//! Idempotency markers written into ledger memos.
//!
//! Format: `<PREFIX>|<uuid>|<YYYY-MM-DD>` for scheduled postings and
//! `<PREFIX>|<uuid>|<YYYY-MM-DD>|<period>|<balance before>` for loan
//! settlements. A later scan detects prior postings by exact string match.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::decimal::Money;

const SEPARATOR: char = '|';

/// marker for one scheduled occurrence of a bill or loan installment
pub fn occurrence_marker(prefix: &str, owner_id: Uuid, due_date: NaiveDate) -> String {
    format!("{prefix}{SEPARATOR}{owner_id}{SEPARATOR}{}", due_date.format("%Y-%m-%d"))
}

/// marker for a manual loan settlement applied as period `period`
///
/// The balance before the settlement keeps two settlements of the same
/// period and day apart; a replay against stale state still matches.
pub fn settlement_marker(
    prefix: &str,
    loan_id: Uuid,
    date: NaiveDate,
    period: u32,
    balance_before: Money,
) -> String {
    format!(
        "{}{SEPARATOR}{period}{SEPARATOR}{}",
        occurrence_marker(prefix, loan_id, date),
        balance_before.as_decimal().normalize()
    )
}

/// parsed memo marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMarker {
    pub prefix: String,
    pub owner_id: Uuid,
    pub date: NaiveDate,
    pub period: Option<u32>,
    pub balance: Option<Money>,
}

/// parse a memo back into its marker parts, None for free-text memos
pub fn parse_marker(memo: &str) -> Option<ParsedMarker> {
    let mut parts = memo.split(SEPARATOR);
    let prefix = parts.next().filter(|p| !p.is_empty())?;
    let owner_id = Uuid::parse_str(parts.next()?).ok()?;
    let date = NaiveDate::parse_from_str(parts.next()?, "%Y-%m-%d").ok()?;
    let period = match parts.next() {
        Some(p) => Some(p.parse().ok()?),
        None => None,
    };
    let balance = match parts.next() {
        Some(b) => Some(Money::from_str_exact(b).ok()?),
        None => None,
    };
    if parts.next().is_some() {
        return None;
    }

    Some(ParsedMarker {
        prefix: prefix.to_string(),
        owner_id,
        date,
        period,
        balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_format() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();

        assert_eq!(
            occurrence_marker("AUTO_BILL", id, date),
            "AUTO_BILL|67e55044-10b1-426f-9247-bb680e5fe0c8|2025-01-02"
        );
        assert_eq!(
            settlement_marker("LOAN_SETTLE", id, date, 4, Money::from_str_exact("1250.5").unwrap()),
            "LOAN_SETTLE|67e55044-10b1-426f-9247-bb680e5fe0c8|2025-01-02|4|1250.5"
        );
    }

    #[test]
    fn test_parse_roundtrip_and_rejects_free_text() {
        let id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();

        let parsed = parse_marker(&occurrence_marker("AUTO_LOAN", id, date)).unwrap();
        assert_eq!(parsed.prefix, "AUTO_LOAN");
        assert_eq!(parsed.owner_id, id);
        assert_eq!(parsed.date, date);
        assert_eq!(parsed.period, None);
        assert_eq!(parsed.balance, None);

        let settled = parse_marker(&settlement_marker("LOAN_SETTLE", id, date, 2, Money::from_major(60))).unwrap();
        assert_eq!(settled.period, Some(2));
        assert_eq!(settled.balance, Some(Money::from_major(60)));

        assert!(parse_marker("groceries at the market").is_none());
        assert!(parse_marker("AUTO_BILL|not-a-uuid|2025-01-02").is_none());
        assert!(parse_marker(&format!("AUTO_BILL|{}|2025-01-02|x", id)).is_none());
    }
}
