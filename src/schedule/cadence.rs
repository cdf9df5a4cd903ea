use chrono::{Datelike, Duration, NaiveDate};

use crate::config::{EngineConfig, DEFAULT_MAX_PROJECTION_STEPS};
use crate::dates::MonthKey;
use crate::types::Cadence;

/// pure date arithmetic over the four cadences
#[derive(Debug, Clone, Copy)]
pub struct DateCadence {
    max_steps: u32,
}

impl Default for DateCadence {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PROJECTION_STEPS)
    }
}

impl DateCadence {
    pub fn new(max_steps: u32) -> Self {
        Self { max_steps }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_projection_steps)
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// first occurrence of the cadence on or after `reference`
    ///
    /// Never earlier than the anchor. Linear cadences step from the anchor and
    /// give up with `None` once the step cap is spent.
    pub fn next_occurrence_on_or_after(
        &self,
        anchor: NaiveDate,
        cadence: Cadence,
        reference: NaiveDate,
    ) -> Option<NaiveDate> {
        if reference <= anchor {
            return cadence.is_valid().then_some(anchor);
        }

        match cadence {
            Cadence::Monthly => {
                let month = MonthKey::of(reference);
                let candidate = month.day_clamped(anchor.day());
                if candidate >= reference {
                    Some(candidate)
                } else {
                    Some(month.next().day_clamped(anchor.day()))
                }
            }
            Cadence::Yearly => {
                let this_year = MonthKey::new(reference.year(), anchor.month()).ok()?;
                let candidate = this_year.day_clamped(anchor.day());
                if candidate >= reference {
                    Some(candidate)
                } else {
                    Some(this_year.plus_months(12).day_clamped(anchor.day()))
                }
            }
            Cadence::Weekly | Cadence::CustomDays(_) => {
                let Some(step) = cadence.step_days() else {
                    tracing::debug!(%anchor, "custom cadence without a positive interval is never due");
                    return None;
                };
                self.step_until(anchor, step, reference)
            }
        }
    }

    /// step from `start` by `step` days until reaching `reference`
    pub(crate) fn step_until(
        &self,
        start: NaiveDate,
        step: i64,
        reference: NaiveDate,
    ) -> Option<NaiveDate> {
        let mut date = start;
        let mut steps = 0u32;

        while date < reference {
            if steps >= self.max_steps {
                tracing::warn!(
                    %start,
                    %reference,
                    step,
                    max_steps = self.max_steps,
                    "cadence projection hit the iteration cap, treating as no occurrence"
                );
                return None;
            }
            date = date.checked_add_signed(Duration::days(step))?;
            steps += 1;
        }

        Some(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_monthly_clamps_day_31() {
        let cadence = DateCadence::default();
        let anchor = d(2025, 1, 31);

        assert_eq!(
            cadence.next_occurrence_on_or_after(anchor, Cadence::Monthly, d(2025, 2, 1)),
            Some(d(2025, 2, 28))
        );
        assert_eq!(
            cadence.next_occurrence_on_or_after(anchor, Cadence::Monthly, d(2025, 4, 15)),
            Some(d(2025, 4, 30))
        );
        // clamping in one month does not drift the next one
        assert_eq!(
            cadence.next_occurrence_on_or_after(anchor, Cadence::Monthly, d(2025, 3, 1)),
            Some(d(2025, 3, 31))
        );
    }

    #[test]
    fn test_never_before_anchor() {
        let cadence = DateCadence::default();
        let anchor = d(2025, 6, 15);

        for c in [Cadence::Weekly, Cadence::Monthly, Cadence::Yearly, Cadence::CustomDays(3)] {
            assert_eq!(cadence.next_occurrence_on_or_after(anchor, c, d(2020, 1, 1)), Some(anchor));
        }
    }

    #[test]
    fn test_monthly_rolls_to_next_month() {
        let cadence = DateCadence::default();
        assert_eq!(
            cadence.next_occurrence_on_or_after(d(2024, 11, 2), Cadence::Monthly, d(2025, 1, 5)),
            Some(d(2025, 2, 2))
        );
    }

    #[test]
    fn test_yearly_leap_day() {
        let cadence = DateCadence::default();
        let anchor = d(2024, 2, 29);

        assert_eq!(
            cadence.next_occurrence_on_or_after(anchor, Cadence::Yearly, d(2024, 3, 1)),
            Some(d(2025, 2, 28))
        );
        assert_eq!(
            cadence.next_occurrence_on_or_after(anchor, Cadence::Yearly, d(2027, 6, 1)),
            Some(d(2028, 2, 29))
        );
    }

    #[test]
    fn test_weekly_and_custom_steps() {
        let cadence = DateCadence::default();
        let anchor = d(2025, 1, 1);

        assert_eq!(
            cadence.next_occurrence_on_or_after(anchor, Cadence::Weekly, d(2025, 1, 9)),
            Some(d(2025, 1, 15))
        );
        assert_eq!(
            cadence.next_occurrence_on_or_after(anchor, Cadence::CustomDays(10), d(2025, 1, 21)),
            Some(d(2025, 1, 21))
        );
    }

    #[test]
    fn test_invalid_interval_is_never_due() {
        let cadence = DateCadence::default();
        assert_eq!(
            cadence.next_occurrence_on_or_after(d(2025, 1, 1), Cadence::CustomDays(0), d(2025, 2, 1)),
            None
        );
        assert_eq!(
            cadence.next_occurrence_on_or_after(d(2025, 1, 1), Cadence::CustomDays(0), d(2024, 2, 1)),
            None
        );
    }

    #[test]
    fn test_iteration_cap_returns_none() {
        let cadence = DateCadence::default();
        let anchor = d(2010, 1, 1);

        // ~5500 daily steps exceed the 4000 cap
        assert_eq!(
            cadence.next_occurrence_on_or_after(anchor, Cadence::CustomDays(1), d(2025, 1, 1)),
            None
        );

        // five years of daily steps stay under it
        assert_eq!(
            cadence.next_occurrence_on_or_after(d(2020, 1, 1), Cadence::CustomDays(1), d(2025, 1, 1)),
            Some(d(2025, 1, 1))
        );
    }

    #[test]
    fn test_custom_cap() {
        let cadence = DateCadence::new(3);
        assert_eq!(
            cadence.next_occurrence_on_or_after(d(2025, 1, 1), Cadence::Weekly, d(2025, 1, 22)),
            Some(d(2025, 1, 22))
        );
        assert_eq!(
            cadence.next_occurrence_on_or_after(d(2025, 1, 1), Cadence::Weekly, d(2025, 1, 23)),
            None
        );
    }
}
