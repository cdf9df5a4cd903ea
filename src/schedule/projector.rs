use chrono::{Datelike, Duration, NaiveDate};

use crate::dates::{DateRange, MonthKey};
use crate::obligation::RecurringObligation;
use crate::types::Cadence;

use super::cadence::DateCadence;

/// projects the due dates of an obligation into calendar months
#[derive(Debug, Clone, Copy, Default)]
pub struct ObligationProjector {
    cadence: DateCadence,
}

impl ObligationProjector {
    pub fn new(cadence: DateCadence) -> Self {
        Self { cadence }
    }

    /// due dates falling in `month`, strictly increasing
    pub fn occurrences_in_month(
        &self,
        obligation: &RecurringObligation,
        month: MonthKey,
    ) -> Vec<NaiveDate> {
        let anchor = obligation.first_payment_date;
        if month < MonthKey::of(anchor) {
            return Vec::new();
        }

        match obligation.cadence {
            Cadence::Monthly => vec![month.day_clamped(anchor.day())],
            Cadence::Yearly => {
                if month.month() == anchor.month() {
                    vec![month.day_clamped(anchor.day())]
                } else {
                    Vec::new()
                }
            }
            Cadence::Weekly | Cadence::CustomDays(_) => {
                let Some(step) = obligation.cadence.step_days() else {
                    return Vec::new();
                };
                self.linear_in_range(anchor, step, month.range())
            }
        }
    }

    /// due dates within an inclusive range, across month boundaries
    pub fn occurrences_between(
        &self,
        obligation: &RecurringObligation,
        range: DateRange,
    ) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut month = MonthKey::of(range.start);
        let last = MonthKey::of(range.end);

        while month <= last {
            dates.extend(
                self.occurrences_in_month(obligation, month)
                    .into_iter()
                    .filter(|date| range.contains(*date)),
            );
            month = month.next();
        }

        dates
    }

    /// next due date on or after `today`
    pub fn next_due_date(
        &self,
        obligation: &RecurringObligation,
        today: NaiveDate,
    ) -> Option<NaiveDate> {
        self.cadence
            .next_occurrence_on_or_after(obligation.first_payment_date, obligation.cadence, today)
    }

    fn linear_in_range(&self, anchor: NaiveDate, step: i64, range: DateRange) -> Vec<NaiveDate> {
        // jump to the last occurrence before the range instead of walking from the anchor
        let start = if range.start > anchor {
            let skipped = ((range.start - anchor).num_days() - 1) / step;
            anchor + Duration::days(skipped * step)
        } else {
            anchor
        };

        let Some(first) = self.cadence.step_until(start, step, range.start) else {
            return Vec::new();
        };

        let mut dates = Vec::new();
        let mut date = first;
        while date <= range.end {
            dates.push(date);
            match date.checked_add_signed(Duration::days(step)) {
                Some(next) => date = next,
                None => break,
            }
        }
        dates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn month(s: &str) -> MonthKey {
        s.parse().unwrap()
    }

    fn obligation(cadence: Cadence, anchor: NaiveDate) -> RecurringObligation {
        RecurringObligation {
            id: Uuid::new_v4(),
            name: "bill".to_string(),
            group: crate::types::ObligationGroup::Utility,
            amount: Money::from_major(100),
            cadence,
            first_payment_date: anchor,
            account_id: Uuid::new_v4(),
            category_id: None,
        }
    }

    #[test]
    fn test_monthly_single_occurrence() {
        let bill = obligation(Cadence::Monthly, d(2024, 11, 2));
        let projector = ObligationProjector::default();

        assert_eq!(projector.occurrences_in_month(&bill, month("2025-01")), vec![d(2025, 1, 2)]);
        assert_eq!(projector.occurrences_in_month(&bill, month("2024-11")), vec![d(2024, 11, 2)]);
    }

    #[test]
    fn test_month_before_anchor_is_empty() {
        let projector = ObligationProjector::default();
        for cadence in [Cadence::Weekly, Cadence::Monthly, Cadence::Yearly, Cadence::CustomDays(5)] {
            let bill = obligation(cadence, d(2024, 11, 2));
            assert!(projector.occurrences_in_month(&bill, month("2024-10")).is_empty());
        }
    }

    #[test]
    fn test_day_31_clamps_in_february() {
        let bill = obligation(Cadence::Monthly, d(2024, 1, 31));
        let projector = ObligationProjector::default();

        assert_eq!(projector.occurrences_in_month(&bill, month("2024-02")), vec![d(2024, 2, 29)]);
        assert_eq!(projector.occurrences_in_month(&bill, month("2025-02")), vec![d(2025, 2, 28)]);
    }

    #[test]
    fn test_yearly_only_in_anchor_month() {
        let bill = obligation(Cadence::Yearly, d(2023, 5, 20));
        let projector = ObligationProjector::default();

        assert_eq!(projector.occurrences_in_month(&bill, month("2025-05")), vec![d(2025, 5, 20)]);
        assert!(projector.occurrences_in_month(&bill, month("2025-06")).is_empty());
    }

    #[test]
    fn test_weekly_multiple_occurrences() {
        let bill = obligation(Cadence::Weekly, d(2024, 12, 30));
        let projector = ObligationProjector::default();

        assert_eq!(
            projector.occurrences_in_month(&bill, month("2025-01")),
            vec![d(2025, 1, 6), d(2025, 1, 13), d(2025, 1, 20), d(2025, 1, 27)]
        );
    }

    #[test]
    fn test_anchor_inside_month() {
        let bill = obligation(Cadence::CustomDays(10), d(2025, 1, 15));
        let projector = ObligationProjector::default();

        assert_eq!(
            projector.occurrences_in_month(&bill, month("2025-01")),
            vec![d(2025, 1, 15), d(2025, 1, 25)]
        );
        assert_eq!(
            projector.occurrences_in_month(&bill, month("2025-02")),
            vec![d(2025, 2, 4), d(2025, 2, 14), d(2025, 2, 24)]
        );
    }

    #[test]
    fn test_occurrence_on_first_day_of_month() {
        let bill = obligation(Cadence::Weekly, d(2025, 1, 25));
        let projector = ObligationProjector::default();

        assert_eq!(
            projector.occurrences_in_month(&bill, month("2025-02")),
            vec![d(2025, 2, 1), d(2025, 2, 8), d(2025, 2, 15), d(2025, 2, 22)]
        );
    }

    #[test]
    fn test_daily_interval_far_in_past_terminates() {
        let bill = obligation(Cadence::CustomDays(1), d(2020, 3, 1));
        let projector = ObligationProjector::default();

        let dates = projector.occurrences_in_month(&bill, month("2025-03"));
        assert_eq!(dates.len(), 31);
        assert_eq!(dates[0], d(2025, 3, 1));
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_malformed_interval_never_due() {
        let bill = obligation(Cadence::CustomDays(0), d(2025, 1, 1));
        let projector = ObligationProjector::default();

        assert!(projector.occurrences_in_month(&bill, month("2025-01")).is_empty());
        assert_eq!(projector.next_due_date(&bill, d(2025, 1, 5)), None);
    }

    #[test]
    fn test_occurrences_between_spans_months() {
        let bill = obligation(Cadence::Monthly, d(2024, 11, 2));
        let projector = ObligationProjector::default();
        let range = DateRange::new(d(2024, 12, 3), d(2025, 3, 2)).unwrap();

        assert_eq!(
            projector.occurrences_between(&bill, range),
            vec![d(2025, 1, 2), d(2025, 2, 2), d(2025, 3, 2)]
        );
    }
}
