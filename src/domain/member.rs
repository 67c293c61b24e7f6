//! Registered members and their loan state.

use std::{collections::BTreeMap, fmt, num::NonZeroU32, str::FromStr};

use chrono::{DateTime, Utc};
use non_empty_string::NonEmptyString;

use super::book::Isbn;

/// Identifier assigned to a registered member.
///
/// Ids are positive integers handed out sequentially by the library,
/// starting at 1. They are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(NonZeroU32);

impl MemberId {
    pub(crate) const fn new(id: NonZeroU32) -> Self {
        Self(id)
    }

    /// Returns the id as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MemberId {
    type Err = ParseMemberIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<NonZeroU32>()
            .map(Self)
            .map_err(|_| ParseMemberIdError(s.to_string()))
    }
}

/// Error returned when a string is not a valid member id.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid member id '{0}': member ids are positive integers")]
pub struct ParseMemberIdError(String);

/// A completed loan, retained in a member's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanRecord {
    /// The title that was borrowed.
    pub isbn: Isbn,
    /// When the copy was checked out.
    pub borrowed_at: DateTime<Utc>,
    /// When the copy came back.
    pub returned_at: DateTime<Utc>,
}

/// A registered borrower: active loans plus an append-only return history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub(crate) id: MemberId,
    pub(crate) name: NonEmptyString,
    /// Active loans, keyed by ISBN; the value is the borrow timestamp.
    pub(crate) loans: BTreeMap<Isbn, DateTime<Utc>>,
    pub(crate) history: Vec<LoanRecord>,
}

impl Member {
    pub(crate) const fn new(id: MemberId, name: NonEmptyString) -> Self {
        Self {
            id,
            name,
            loans: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    /// The member's id.
    #[must_use]
    pub const fn id(&self) -> MemberId {
        self.id
    }

    /// The member's name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns `true` if the member currently holds a copy of `isbn`.
    #[must_use]
    pub fn holds(&self, isbn: &Isbn) -> bool {
        self.loans.contains_key(isbn)
    }

    /// Number of titles the member currently has on loan.
    #[must_use]
    pub fn loan_count(&self) -> usize {
        self.loans.len()
    }

    /// Iterates over active loans as `(isbn, borrow timestamp)` pairs.
    pub fn loans(&self) -> impl Iterator<Item = (&Isbn, DateTime<Utc>)> {
        self.loans.iter().map(|(isbn, &at)| (isbn, at))
    }

    /// The member's completed loans, oldest first.
    #[must_use]
    pub fn history(&self) -> &[LoanRecord] {
        &self.history
    }

    /// Records a new active loan.
    ///
    /// # Panics
    ///
    /// Panics if the member already holds `isbn`; callers check first.
    pub(crate) fn record_borrow(&mut self, isbn: Isbn, at: DateTime<Utc>) {
        let previous = self.loans.insert(isbn, at);
        assert!(
            previous.is_none(),
            "member {} already holds this title",
            self.id
        );
    }

    /// Moves an active loan into the history.
    ///
    /// # Panics
    ///
    /// Panics if the member does not hold `isbn`; callers check first.
    pub(crate) fn record_return(&mut self, isbn: &Isbn, at: DateTime<Utc>) -> LoanRecord {
        let borrowed_at = self
            .loans
            .remove(isbn)
            .unwrap_or_else(|| panic!("member {} does not hold {isbn}", self.id));

        let record = LoanRecord {
            isbn: isbn.clone(),
            borrowed_at,
            returned_at: at,
        };
        self.history.push(record.clone());
        record
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;
    use non_empty_string::NonEmptyString;

    use super::{Isbn, Member, MemberId};

    fn make_member() -> Member {
        Member::new(
            MemberId::from_str("1").unwrap(),
            NonEmptyString::from_str("Alice Smith").unwrap(),
        )
    }

    fn isbn(s: &str) -> Isbn {
        Isbn::new(s).unwrap()
    }

    #[test]
    fn member_id_parses_positive_integers() {
        assert_eq!(MemberId::from_str("42").unwrap().get(), 42);
        assert!(MemberId::from_str("0").is_err());
        assert!(MemberId::from_str("-3").is_err());
        assert!(MemberId::from_str("alice").is_err());
    }

    #[test]
    fn borrow_then_return_moves_loan_into_history() {
        let mut member = make_member();
        let isbn = isbn("ISBN1");
        let borrowed_at = Utc::now();

        member.record_borrow(isbn.clone(), borrowed_at);
        assert!(member.holds(&isbn));
        assert_eq!(member.loan_count(), 1);
        assert!(member.history().is_empty());

        let returned_at = Utc::now();
        let record = member.record_return(&isbn, returned_at);

        assert!(!member.holds(&isbn));
        assert_eq!(record.borrowed_at, borrowed_at);
        assert_eq!(record.returned_at, returned_at);
        assert_eq!(member.history(), &[record]);
    }

    #[test]
    #[should_panic(expected = "already holds")]
    fn double_borrow_of_same_title_panics() {
        let mut member = make_member();
        member.record_borrow(isbn("ISBN1"), Utc::now());
        member.record_borrow(isbn("ISBN1"), Utc::now());
    }

    #[test]
    #[should_panic(expected = "does not hold")]
    fn returning_unheld_title_panics() {
        let mut member = make_member();
        member.record_return(&isbn("ISBN1"), Utc::now());
    }
}
