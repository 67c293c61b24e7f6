//! Due-date and late-fee policy.
//!
//! All loan arithmetic lives here so the loan period and the fee schedule
//! have a single point of configuration. Everything in this module is a pure
//! function of its inputs.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

/// Number of days a borrowed title may be held before it is overdue.
pub const LOAN_PERIOD_DAYS: i64 = 14;

/// Fee charged per whole day a return is overdue, in cents.
pub const LATE_FEE_CENTS_PER_DAY: u64 = 100;

/// A late fee, stored as integer cents.
///
/// Fees are kept in cents to avoid floating-point money; [`fmt::Display`]
/// renders dollars (`$6.00`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fee(u64);

impl Fee {
    /// A zero fee.
    pub const ZERO: Self = Self(0);

    /// The fee amount in cents.
    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Returns `true` if no fee is owed.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// The assessed terms of a returned (or hypothetically returned) loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanTerms {
    /// When the loan was due.
    pub due: DateTime<Utc>,
    /// Whole days past the due date, clamped at zero.
    pub days_late: u64,
    /// The late fee owed.
    pub fee: Fee,
}

/// Returns the due date for a loan taken out at `borrowed_at`.
#[must_use]
pub fn due_date(borrowed_at: DateTime<Utc>) -> DateTime<Utc> {
    borrowed_at + TimeDelta::days(LOAN_PERIOD_DAYS)
}

/// Assesses a loan borrowed at `borrowed_at` and returned at `returned_at`.
///
/// The fee is `days_late` times [`LATE_FEE_CENTS_PER_DAY`], where `days_late`
/// counts only whole days past the due date. Any return at or before the due
/// date owes nothing.
#[must_use]
pub fn assess(borrowed_at: DateTime<Utc>, returned_at: DateTime<Utc>) -> LoanTerms {
    let due = due_date(borrowed_at);
    let days_late = (returned_at - due).num_days().max(0).unsigned_abs();
    LoanTerms {
        due,
        days_late,
        fee: Fee(days_late * LATE_FEE_CENTS_PER_DAY),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};

    use super::{Fee, LOAN_PERIOD_DAYS, assess, due_date};

    #[test]
    fn due_date_is_loan_period_after_borrow() {
        let borrowed = Utc::now();
        assert_eq!(
            due_date(borrowed) - borrowed,
            TimeDelta::days(LOAN_PERIOD_DAYS)
        );
    }

    #[test]
    fn on_time_return_owes_nothing() {
        let borrowed = Utc::now();

        let exactly_due = assess(borrowed, due_date(borrowed));
        assert_eq!(exactly_due.days_late, 0);
        assert!(exactly_due.fee.is_zero());

        let early = assess(borrowed, borrowed + TimeDelta::days(3));
        assert_eq!(early.days_late, 0);
        assert!(early.fee.is_zero());
    }

    #[test]
    fn six_days_late_owes_six_dollars() {
        let borrowed = Utc::now();
        let terms = assess(borrowed, borrowed + TimeDelta::days(20));

        assert_eq!(terms.days_late, 6);
        assert_eq!(terms.fee.cents(), 600);
        assert_eq!(terms.fee.to_string(), "$6.00");
    }

    #[test]
    fn partial_days_do_not_count() {
        let borrowed = Utc::now();
        let terms = assess(borrowed, due_date(borrowed) + TimeDelta::hours(23));

        assert_eq!(terms.days_late, 0);
        assert!(terms.fee.is_zero());
    }

    #[test]
    fn fee_is_monotonic_in_return_time() {
        let borrowed = Utc::now();

        let mut previous = Fee::ZERO;
        for days in 0..40 {
            let terms = assess(borrowed, borrowed + TimeDelta::days(days));
            assert!(terms.fee >= previous);
            previous = terms.fee;
        }
    }

    #[test]
    fn fee_displays_cents_with_two_digits() {
        assert_eq!(Fee::ZERO.to_string(), "$0.00");
        assert_eq!(Fee(105).to_string(), "$1.05");
    }
}
