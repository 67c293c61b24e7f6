//! The in-memory lending ledger.
//!
//! [`Library`] owns every catalog entry and member record and is the sole
//! authority for state-changing lending operations. It knows nothing about
//! the filesystem; persistence wraps it from `crate::storage`.

use std::{
    cmp::Reverse,
    collections::{BTreeMap, btree_map::Entry},
    num::NonZeroU32,
};

use chrono::{DateTime, Utc};
use non_empty_string::NonEmptyString;
use thiserror::Error;
use tracing::instrument;

use super::{
    book::{Book, Isbn},
    member::{Member, MemberId},
    policy::{self, Fee},
};

/// How many titles the most-borrowed ranking reports.
const MOST_BORROWED_LIMIT: usize = 5;

/// An in-memory library: catalog, membership, and the lending state between
/// them.
///
/// Every mutating operation checks all of its preconditions before touching
/// any state, so a failed call leaves the library exactly as it was.
///
/// Two invariants hold at all times:
///
/// - for every title, `available_copies <= total_copies`
/// - for every title, `total_copies - available_copies` equals the number of
///   members currently holding it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub(crate) name: String,
    /// Catalog entries, keyed by ISBN.
    pub(crate) books: BTreeMap<Isbn, Book>,
    /// Members, keyed by their sequentially assigned id.
    pub(crate) members: BTreeMap<MemberId, Member>,
    /// The next id to hand out; starts at 1 and only grows.
    pub(crate) next_member_id: u32,
}

/// Errors from adding copies of a title to the catalog.
#[derive(Debug, Error)]
pub enum AddTitleError {
    /// At least one copy must be added.
    #[error("cannot add {0} copies: at least one is required")]
    InvalidCopyCount(u32),
    /// The title text was empty.
    #[error("title must not be empty")]
    EmptyTitle,
    /// The author text was empty.
    #[error("author must not be empty")]
    EmptyAuthor,
}

/// Errors from removing a title from the catalog.
#[derive(Debug, Error)]
pub enum RemoveTitleError {
    /// The ISBN is not in the catalog.
    #[error("no title with ISBN {0} in the catalog")]
    TitleNotFound(Isbn),
    /// Some copies are still checked out.
    #[error("{on_loan} of {total} copies of {isbn} are on loan")]
    CopiesOnLoan {
        /// The title that cannot be removed.
        isbn: Isbn,
        /// Copies currently checked out.
        on_loan: u32,
        /// Copies the library holds in total.
        total: u32,
    },
}

/// Errors from registering a new member.
#[derive(Debug, Error)]
pub enum RegisterMemberError {
    /// The member name was empty.
    #[error("member name must not be empty")]
    EmptyName,
}

/// Errors from borrowing a title.
#[derive(Debug, Error)]
pub enum BorrowError {
    /// The member id is not registered.
    #[error("member {0} is not registered")]
    MemberNotFound(MemberId),
    /// The ISBN is not in the catalog.
    #[error("no title with ISBN {0} in the catalog")]
    TitleNotFound(Isbn),
    /// Every copy is already checked out.
    #[error("all {total} copies of {isbn} are on loan")]
    NoCopiesAvailable {
        /// The requested title.
        isbn: Isbn,
        /// Copies the library holds in total.
        total: u32,
    },
    /// The member already holds a copy of this title.
    #[error("member {member} already holds {isbn}")]
    AlreadyBorrowed {
        /// The borrowing member.
        member: MemberId,
        /// The requested title.
        isbn: Isbn,
    },
}

/// Errors from returning a title.
#[derive(Debug, Error)]
pub enum ReturnError {
    /// The member id is not registered.
    #[error("member {0} is not registered")]
    MemberNotFound(MemberId),
    /// The ISBN is not in the catalog.
    #[error("no title with ISBN {0} in the catalog")]
    TitleNotFound(Isbn),
    /// The member does not hold a copy of this title.
    #[error("member {member} does not hold {isbn}")]
    NotBorrowed {
        /// The returning member.
        member: MemberId,
        /// The title being returned.
        isbn: Isbn,
    },
}

/// Errors from listing a member's outstanding loans.
#[derive(Debug, Error)]
pub enum LoansError {
    /// The member id is not registered.
    #[error("member {0} is not registered")]
    MemberNotFound(MemberId),
}

/// Result of adding copies of a title to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    /// The ISBN the copies were filed under.
    pub isbn: Isbn,
    /// Whether a new catalog entry was created, as opposed to merging copies
    /// into an existing one.
    pub created: bool,
    /// Copies of the title now held, including any on loan.
    pub total_copies: u32,
    /// Copies currently on the shelf.
    pub available_copies: u32,
}

/// An active loan, as granted by [`Library::borrow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    /// The borrowing member.
    pub member: MemberId,
    /// The borrowed title.
    pub isbn: Isbn,
    /// When the copy was checked out.
    pub borrowed_at: DateTime<Utc>,
    /// When the copy is due back.
    pub due: DateTime<Utc>,
}

/// Result of returning a borrowed title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOutcome {
    /// The returned title.
    pub isbn: Isbn,
    /// When the copy came back.
    pub returned_at: DateTime<Utc>,
    /// When it was due.
    pub due: DateTime<Utc>,
    /// Whole days past due, zero for an on-time return.
    pub days_late: u64,
    /// The late fee owed.
    pub fee: Fee,
}

/// A member's view of one outstanding loan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutstandingLoan {
    /// The borrowed title.
    pub isbn: Isbn,
    /// Its title text, for display.
    pub title: String,
    /// When the copy was checked out.
    pub borrowed_at: DateTime<Utc>,
    /// When it is due back.
    pub due: DateTime<Utc>,
    /// Whole days until the due date; negative once the loan is overdue.
    pub days_until_due: i64,
}

/// A point-in-time summary of catalog and membership activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    /// Distinct titles in the catalog.
    pub unique_titles: usize,
    /// Copies held across all titles.
    pub total_copies: u64,
    /// Copies currently on the shelf.
    pub available_copies: u64,
    /// Copies currently checked out.
    pub copies_on_loan: u64,
    /// Registered members.
    pub members: usize,
    /// Members with at least one active loan.
    pub active_members: usize,
    /// The most-borrowed titles, busiest first.
    pub most_borrowed: Vec<MostBorrowed>,
}

/// One entry in the most-borrowed ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MostBorrowed {
    /// The title's ISBN.
    pub isbn: Isbn,
    /// Its title text.
    pub title: String,
    /// How many times any copy has been borrowed.
    pub times_borrowed: u64,
}

impl Library {
    /// Creates an empty library with the given display name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            books: BTreeMap::new(),
            members: BTreeMap::new(),
            next_member_id: 1,
        }
    }

    /// The library's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a catalog entry by ISBN.
    #[must_use]
    pub fn book(&self, isbn: &Isbn) -> Option<&Book> {
        self.books.get(isbn)
    }

    /// Looks up a member by id.
    #[must_use]
    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.get(&id)
    }

    /// Iterates over the catalog in ISBN order.
    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    /// Iterates over members in id order.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Number of members currently holding a copy of `isbn`.
    #[must_use]
    pub fn holders_of(&self, isbn: &Isbn) -> usize {
        self.members.values().filter(|m| m.holds(isbn)).count()
    }

    /// Adds `copies` of a title to the catalog.
    ///
    /// If the ISBN is already catalogued the copies are merged into the
    /// existing entry (its recorded title and author are kept); otherwise a
    /// new entry is created with every copy available.
    ///
    /// # Errors
    ///
    /// Returns [`AddTitleError::InvalidCopyCount`] when `copies` is zero, and
    /// [`AddTitleError::EmptyTitle`]/[`AddTitleError::EmptyAuthor`] when the
    /// text fields are blank.
    #[instrument(skip(self))]
    pub fn add_title(
        &mut self,
        title: &str,
        author: &str,
        isbn: &Isbn,
        copies: u32,
    ) -> Result<AddOutcome, AddTitleError> {
        if copies == 0 {
            return Err(AddTitleError::InvalidCopyCount(copies));
        }
        let title = NonEmptyString::new(title.trim().to_string())
            .map_err(|_| AddTitleError::EmptyTitle)?;
        let author = NonEmptyString::new(author.trim().to_string())
            .map_err(|_| AddTitleError::EmptyAuthor)?;

        let (created, entry) = match self.books.entry(isbn.clone()) {
            Entry::Occupied(occupied) => {
                let book = occupied.into_mut();
                book.add_copies(copies);
                (false, &*book)
            }
            Entry::Vacant(vacant) => {
                (true, &*vacant.insert(Book::new(isbn.clone(), title, author, copies)))
            }
        };

        tracing::info!(%isbn, copies, created, "added copies to catalog");

        Ok(AddOutcome {
            isbn: isbn.clone(),
            created,
            total_copies: entry.total_copies(),
            available_copies: entry.available_copies(),
        })
    }

    /// Removes a title from the catalog, returning the removed entry.
    ///
    /// # Errors
    ///
    /// Returns [`RemoveTitleError::TitleNotFound`] for an unknown ISBN and
    /// [`RemoveTitleError::CopiesOnLoan`] while any copy is checked out.
    #[instrument(skip(self))]
    pub fn remove_title(&mut self, isbn: &Isbn) -> Result<Book, RemoveTitleError> {
        let book = self
            .books
            .get(isbn)
            .ok_or_else(|| RemoveTitleError::TitleNotFound(isbn.clone()))?;

        if book.available_copies() < book.total_copies() {
            return Err(RemoveTitleError::CopiesOnLoan {
                isbn: isbn.clone(),
                on_loan: book.copies_on_loan(),
                total: book.total_copies(),
            });
        }

        let removed = self
            .books
            .remove(isbn)
            .expect("entry presence checked above");
        tracing::info!(%isbn, "removed title from catalog");
        Ok(removed)
    }

    /// Registers a new member and returns their assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`RegisterMemberError::EmptyName`] when the name is blank.
    ///
    /// # Panics
    ///
    /// Panics if the member id counter overflows.
    #[instrument(skip(self))]
    pub fn register_member(&mut self, name: &str) -> Result<MemberId, RegisterMemberError> {
        let name = NonEmptyString::new(name.trim().to_string())
            .map_err(|_| RegisterMemberError::EmptyName)?;

        let id = MemberId::new(NonZeroU32::new(self.next_member_id).expect("counter starts at 1"));
        self.next_member_id = self.next_member_id.checked_add(1).expect("member id overflow!");
        self.members.insert(id, Member::new(id, name));

        tracing::info!(%id, "registered member");
        Ok(id)
    }

    /// Borrows a copy of `isbn` for `member`, due back after the loan period.
    ///
    /// Equivalent to [`Self::borrow_at`] with the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::borrow_at`].
    pub fn borrow(&mut self, member: MemberId, isbn: &Isbn) -> Result<Loan, BorrowError> {
        self.borrow_at(member, isbn, Utc::now())
    }

    /// Borrows a copy of `isbn` for `member` as of the explicit instant
    /// `now`.
    ///
    /// The explicit-timestamp variant exists for tests and for backdated
    /// imports; ordinary callers use [`Self::borrow`].
    ///
    /// # Errors
    ///
    /// Returns [`BorrowError::MemberNotFound`]/[`BorrowError::TitleNotFound`]
    /// for unknown ids, [`BorrowError::NoCopiesAvailable`] when every copy is
    /// out, and [`BorrowError::AlreadyBorrowed`] when the member already
    /// holds the title. On any error the library is unchanged.
    #[instrument(skip(self, now))]
    pub fn borrow_at(
        &mut self,
        member: MemberId,
        isbn: &Isbn,
        now: DateTime<Utc>,
    ) -> Result<Loan, BorrowError> {
        let holder = self
            .members
            .get(&member)
            .ok_or(BorrowError::MemberNotFound(member))?;
        let book = self
            .books
            .get(isbn)
            .ok_or_else(|| BorrowError::TitleNotFound(isbn.clone()))?;

        if holder.holds(isbn) {
            return Err(BorrowError::AlreadyBorrowed {
                member,
                isbn: isbn.clone(),
            });
        }
        if book.available_copies() == 0 {
            return Err(BorrowError::NoCopiesAvailable {
                isbn: isbn.clone(),
                total: book.total_copies(),
            });
        }

        // All preconditions hold; both mutations below are infallible.
        self.books
            .get_mut(isbn)
            .expect("entry presence checked above")
            .check_out();
        self.members
            .get_mut(&member)
            .expect("member presence checked above")
            .record_borrow(isbn.clone(), now);

        let due = policy::due_date(now);
        tracing::info!(%member, %isbn, %due, "checked out");

        Ok(Loan {
            member,
            isbn: isbn.clone(),
            borrowed_at: now,
            due,
        })
    }

    /// Returns a borrowed copy of `isbn`, assessing any late fee.
    ///
    /// Equivalent to [`Self::return_book_at`] with the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::return_book_at`].
    pub fn return_book(
        &mut self,
        member: MemberId,
        isbn: &Isbn,
    ) -> Result<ReturnOutcome, ReturnError> {
        self.return_book_at(member, isbn, Utc::now())
    }

    /// Returns a borrowed copy of `isbn` as of the explicit instant `now`.
    ///
    /// Overdue status is always derived from the stored borrow timestamp at
    /// return time; nothing is precomputed or cached. The loan moves from
    /// the member's active loans into their history.
    ///
    /// # Errors
    ///
    /// Returns [`ReturnError::MemberNotFound`]/[`ReturnError::TitleNotFound`]
    /// for unknown ids and [`ReturnError::NotBorrowed`] when the member does
    /// not hold the title. On any error the library is unchanged.
    #[instrument(skip(self, now))]
    pub fn return_book_at(
        &mut self,
        member: MemberId,
        isbn: &Isbn,
        now: DateTime<Utc>,
    ) -> Result<ReturnOutcome, ReturnError> {
        let holder = self
            .members
            .get(&member)
            .ok_or(ReturnError::MemberNotFound(member))?;
        if !self.books.contains_key(isbn) {
            return Err(ReturnError::TitleNotFound(isbn.clone()));
        }

        let Some(&borrowed_at) = holder.loans.get(isbn) else {
            return Err(ReturnError::NotBorrowed {
                member,
                isbn: isbn.clone(),
            });
        };

        let terms = policy::assess(borrowed_at, now);

        self.books
            .get_mut(isbn)
            .expect("entry presence checked above")
            .check_in();
        self.members
            .get_mut(&member)
            .expect("member presence checked above")
            .record_return(isbn, now);

        tracing::info!(%member, %isbn, days_late = terms.days_late, "checked in");

        Ok(ReturnOutcome {
            isbn: isbn.clone(),
            returned_at: now,
            due: terms.due,
            days_late: terms.days_late,
            fee: terms.fee,
        })
    }

    /// Lists a member's outstanding loans as of the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::outstanding_loans_at`].
    pub fn outstanding_loans(&self, member: MemberId) -> Result<Vec<OutstandingLoan>, LoansError> {
        self.outstanding_loans_at(member, Utc::now())
    }

    /// Lists a member's outstanding loans as of the explicit instant `now`.
    ///
    /// Read-only; loans are reported in ISBN order with due dates and the
    /// number of whole days remaining (negative once overdue).
    ///
    /// # Errors
    ///
    /// Returns [`LoansError::MemberNotFound`] for an unknown member.
    ///
    /// # Panics
    ///
    /// Panics if an active loan references an ISBN missing from the catalog;
    /// the lending operations make this unrepresentable.
    pub fn outstanding_loans_at(
        &self,
        member: MemberId,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutstandingLoan>, LoansError> {
        let holder = self
            .members
            .get(&member)
            .ok_or(LoansError::MemberNotFound(member))?;

        Ok(holder
            .loans()
            .map(|(isbn, borrowed_at)| {
                let title = self
                    .books
                    .get(isbn)
                    .unwrap_or_else(|| panic!("active loan references unknown ISBN {isbn}"))
                    .title()
                    .to_string();
                let due = policy::due_date(borrowed_at);
                OutstandingLoan {
                    isbn: isbn.clone(),
                    title,
                    borrowed_at,
                    due,
                    days_until_due: (due - now).num_days(),
                }
            })
            .collect())
    }

    /// Case-insensitive substring search over title and author.
    ///
    /// The returned iterator is lazy and borrows the catalog; a fresh call
    /// re-scans. An empty (or all-whitespace) query matches every entry. No
    /// ordering is guaranteed beyond what the underlying map provides;
    /// callers sort for presentation.
    pub fn search<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a Book> {
        let needle = query.trim().to_lowercase();
        self.books.values().filter(move |book| book.matches(&needle))
    }

    /// Computes a point-in-time activity summary.
    #[must_use]
    pub fn statistics(&self) -> Stats {
        let total_copies = self.books.values().map(|b| u64::from(b.total_copies())).sum();
        let available_copies = self
            .books
            .values()
            .map(|b| u64::from(b.available_copies()))
            .sum::<u64>();
        let copies_on_loan = self
            .books
            .values()
            .map(|b| u64::from(b.copies_on_loan()))
            .sum();

        let mut ranking: Vec<&Book> = self.books.values().collect();
        ranking.sort_by_key(|b| (Reverse(b.times_borrowed()), b.isbn().clone()));
        let most_borrowed = ranking
            .into_iter()
            .filter(|b| b.times_borrowed() > 0)
            .take(MOST_BORROWED_LIMIT)
            .map(|b| MostBorrowed {
                isbn: b.isbn().clone(),
                title: b.title().to_string(),
                times_borrowed: b.times_borrowed(),
            })
            .collect();

        Stats {
            unique_titles: self.books.len(),
            total_copies,
            available_copies,
            copies_on_loan,
            members: self.members.len(),
            active_members: self.members.values().filter(|m| m.loan_count() > 0).count(),
            most_borrowed,
        }
    }

    /// Reassembles a library from previously validated parts.
    pub(crate) const fn from_parts(
        name: String,
        books: BTreeMap<Isbn, Book>,
        members: BTreeMap<MemberId, Member>,
        next_member_id: u32,
    ) -> Self {
        Self {
            name,
            books,
            members,
            next_member_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};

    use super::{
        AddTitleError, BorrowError, Isbn, Library, MemberId, RegisterMemberError,
        RemoveTitleError, ReturnError,
    };

    fn isbn(s: &str) -> Isbn {
        Isbn::new(s).unwrap()
    }

    /// A library with one three-copy title and one registered member.
    fn seeded() -> (Library, MemberId, Isbn) {
        let mut library = Library::new("Test Library");
        let isbn = isbn("ISBN1");
        library.add_title("1984", "George Orwell", &isbn, 3).unwrap();
        let member = library.register_member("Alice").unwrap();
        (library, member, isbn)
    }

    /// Checks copy conservation for every title: copies missing from the
    /// shelf must equal the number of members holding the title.
    fn assert_conservation(library: &Library) {
        for book in library.books() {
            let holders = library.holders_of(book.isbn());
            assert_eq!(
                book.copies_on_loan() as usize,
                holders,
                "conservation violated for {}",
                book.isbn()
            );
        }
    }

    #[test]
    fn add_title_creates_entry_with_all_copies_available() {
        let (library, _, isbn) = seeded();
        let book = library.book(&isbn).unwrap();
        assert_eq!(book.total_copies(), 3);
        assert_eq!(book.available_copies(), 3);
    }

    #[test]
    fn add_title_accumulates_copies_for_existing_isbn() {
        let (mut library, _, isbn) = seeded();

        let outcome = library
            .add_title("1984", "George Orwell", &isbn, 3)
            .unwrap();

        assert!(!outcome.created);
        assert_eq!(outcome.total_copies, 6);
        assert_eq!(outcome.available_copies, 6);
    }

    #[test]
    fn add_title_rejects_zero_copies_and_blank_fields() {
        let mut library = Library::new("Test Library");
        let id = isbn("ISBN1");

        let err = library.add_title("1984", "Orwell", &id, 0).expect_err("zero copies");
        assert!(matches!(err, AddTitleError::InvalidCopyCount(0)));

        let err = library.add_title("  ", "Orwell", &id, 1).expect_err("blank title");
        assert!(matches!(err, AddTitleError::EmptyTitle));

        let err = library.add_title("1984", "", &id, 1).expect_err("blank author");
        assert!(matches!(err, AddTitleError::EmptyAuthor));

        assert!(library.book(&id).is_none(), "failed adds leave no entry");
    }

    #[test]
    fn register_member_assigns_sequential_ids() {
        let mut library = Library::new("Test Library");
        let alice = library.register_member("Alice").unwrap();
        let bob = library.register_member("Bob").unwrap();

        assert_eq!(alice.get(), 1);
        assert_eq!(bob.get(), 2);
        assert_eq!(library.member(alice).unwrap().name(), "Alice");
    }

    #[test]
    fn register_member_rejects_blank_name() {
        let mut library = Library::new("Test Library");
        let err = library.register_member("   ").expect_err("blank name");
        assert!(matches!(err, RegisterMemberError::EmptyName));
        assert_eq!(library.members().count(), 0);
    }

    #[test]
    fn borrow_decrements_availability_and_sets_due_date() {
        let (mut library, member, isbn) = seeded();
        let now = Utc::now();

        let loan = library.borrow_at(member, &isbn, now).unwrap();

        assert_eq!(loan.due, now + TimeDelta::days(14));
        assert_eq!(library.book(&isbn).unwrap().available_copies(), 2);
        assert_eq!(library.book(&isbn).unwrap().times_borrowed(), 1);
        assert!(library.member(member).unwrap().holds(&isbn));
        assert_conservation(&library);
    }

    #[test]
    fn borrow_rejects_double_borrow_by_same_member() {
        let (mut library, member, isbn) = seeded();
        library.borrow(member, &isbn).unwrap();

        let err = library.borrow(member, &isbn).expect_err("double borrow");
        assert!(matches!(err, BorrowError::AlreadyBorrowed { .. }));

        // First loan is intact, nothing double-counted.
        assert_eq!(library.book(&isbn).unwrap().available_copies(), 2);
        assert_eq!(library.member(member).unwrap().loan_count(), 1);
        assert_conservation(&library);
    }

    #[test]
    fn distinct_members_may_hold_copies_of_the_same_title() {
        let (mut library, alice, isbn) = seeded();
        let bob = library.register_member("Bob").unwrap();

        library.borrow(alice, &isbn).unwrap();
        library.borrow(bob, &isbn).unwrap();

        assert_eq!(library.book(&isbn).unwrap().available_copies(), 1);
        assert_eq!(library.holders_of(&isbn), 2);
        assert_conservation(&library);
    }

    #[test]
    fn borrow_fails_when_no_copy_is_available() {
        let mut library = Library::new("Test Library");
        let id = isbn("ISBN1");
        library.add_title("1984", "Orwell", &id, 1).unwrap();
        let alice = library.register_member("Alice").unwrap();
        let bob = library.register_member("Bob").unwrap();

        library.borrow(alice, &id).unwrap();
        let err = library.borrow(bob, &id).expect_err("no copies left");

        assert!(matches!(err, BorrowError::NoCopiesAvailable { total: 1, .. }));
        // State unchanged by the failed call.
        assert_eq!(library.book(&id).unwrap().available_copies(), 0);
        assert_eq!(library.member(bob).unwrap().loan_count(), 0);
        assert_conservation(&library);
    }

    #[test]
    fn borrow_rejects_unknown_member_and_title() {
        let (mut library, member, catalogued) = seeded();
        let ghost: MemberId = "99".parse().unwrap();

        let err = library
            .borrow(ghost, &catalogued)
            .expect_err("unknown member");
        assert!(matches!(err, BorrowError::MemberNotFound(id) if id == ghost));

        let err = library
            .borrow(member, &isbn("NOPE"))
            .expect_err("unknown title");
        assert!(matches!(err, BorrowError::TitleNotFound(_)));
    }

    #[test]
    fn return_twenty_days_after_borrow_owes_six_dollars() {
        let (mut library, member, isbn) = seeded();
        let borrowed = Utc::now();

        library.borrow_at(member, &isbn, borrowed).unwrap();
        let outcome = library
            .return_book_at(member, &isbn, borrowed + TimeDelta::days(20))
            .unwrap();

        assert_eq!(outcome.days_late, 6);
        assert_eq!(outcome.fee.cents(), 600);
        assert_eq!(library.book(&isbn).unwrap().available_copies(), 3);
        assert!(!library.member(member).unwrap().holds(&isbn));
        assert_eq!(library.member(member).unwrap().history().len(), 1);
        assert_conservation(&library);
    }

    #[test]
    fn on_time_return_owes_nothing() {
        let (mut library, member, isbn) = seeded();
        let borrowed = Utc::now();

        library.borrow_at(member, &isbn, borrowed).unwrap();
        let outcome = library
            .return_book_at(member, &isbn, borrowed + TimeDelta::days(10))
            .unwrap();

        assert_eq!(outcome.days_late, 0);
        assert!(outcome.fee.is_zero());
    }

    #[test]
    fn return_rejects_title_the_member_does_not_hold() {
        let (mut library, member, isbn) = seeded();

        let err = library.return_book(member, &isbn).expect_err("nothing borrowed");
        assert!(matches!(err, ReturnError::NotBorrowed { .. }));
        assert_eq!(library.book(&isbn).unwrap().available_copies(), 3);
    }

    #[test]
    fn remove_title_fails_while_copies_are_on_loan() {
        let (mut library, member, isbn) = seeded();
        library.borrow(member, &isbn).unwrap();

        let err = library.remove_title(&isbn).expect_err("copies on loan");
        assert!(matches!(
            err,
            RemoveTitleError::CopiesOnLoan { on_loan: 1, total: 3, .. }
        ));
        assert!(library.book(&isbn).is_some(), "catalog unchanged");

        library.return_book(member, &isbn).unwrap();
        let removed = library.remove_title(&isbn).unwrap();
        assert_eq!(removed.title(), "1984");
        assert!(library.book(&isbn).is_none());
    }

    #[test]
    fn remove_title_rejects_unknown_isbn() {
        let mut library = Library::new("Test Library");
        let err = library
            .remove_title(&isbn("NOPE"))
            .expect_err("unknown isbn");
        assert!(matches!(err, RemoveTitleError::TitleNotFound(_)));
    }

    #[test]
    fn outstanding_loans_report_due_dates() {
        let (mut library, member, isbn) = seeded();
        let borrowed = Utc::now();
        library.borrow_at(member, &isbn, borrowed).unwrap();

        let loans = library
            .outstanding_loans_at(member, borrowed + TimeDelta::days(16))
            .unwrap();

        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].isbn, isbn);
        assert_eq!(loans[0].title, "1984");
        assert_eq!(loans[0].due, borrowed + TimeDelta::days(14));
        assert_eq!(loans[0].days_until_due, -2);
    }

    #[test]
    fn outstanding_loans_reject_unknown_member() {
        let (library, _, _) = seeded();
        let ghost: MemberId = "99".parse().unwrap();
        assert!(library.outstanding_loans(ghost).is_err());
    }

    #[test]
    fn search_matches_title_and_author_case_insensitively() {
        let mut library = Library::new("Test Library");
        library
            .add_title("1984", "George Orwell", &isbn("ISBN1"), 1)
            .unwrap();
        library
            .add_title("Animal Farm", "George Orwell", &isbn("ISBN2"), 1)
            .unwrap();
        library
            .add_title("Pride and Prejudice", "Jane Austen", &isbn("ISBN3"), 1)
            .unwrap();

        assert_eq!(library.search("orwell").count(), 2);
        assert_eq!(library.search("PRIDE").count(), 1);
        assert_eq!(library.search("nineteen").count(), 0);
    }

    #[test]
    fn empty_search_returns_all_entries() {
        let (library, _, _) = seeded();
        assert_eq!(library.search("").count(), 1);
        assert_eq!(library.search("   ").count(), 1);
    }

    #[test]
    fn search_is_restartable() {
        let (library, _, _) = seeded();
        assert_eq!(library.search("1984").count(), 1);
        assert_eq!(library.search("1984").count(), 1);
    }

    #[test]
    fn statistics_summarize_activity() {
        let (mut library, alice, isbn1) = seeded();
        let isbn2 = isbn("ISBN2");
        library
            .add_title("Animal Farm", "George Orwell", &isbn2, 2)
            .unwrap();
        let bob = library.register_member("Bob").unwrap();

        library.borrow(alice, &isbn1).unwrap();
        library.borrow(alice, &isbn2).unwrap();
        library.return_book(alice, &isbn2).unwrap();
        library.borrow(bob, &isbn2).unwrap();

        let stats = library.statistics();
        assert_eq!(stats.unique_titles, 2);
        assert_eq!(stats.total_copies, 5);
        assert_eq!(stats.copies_on_loan, 2);
        assert_eq!(stats.available_copies, 3);
        assert_eq!(stats.members, 2);
        assert_eq!(stats.active_members, 2);

        // ISBN2 was borrowed twice, ISBN1 once.
        assert_eq!(stats.most_borrowed.len(), 2);
        assert_eq!(stats.most_borrowed[0].isbn, isbn2);
        assert_eq!(stats.most_borrowed[0].times_borrowed, 2);
    }

    #[test]
    fn statistics_ranking_skips_never_borrowed_titles() {
        let (library, _, _) = seeded();
        assert!(library.statistics().most_borrowed.is_empty());
    }
}
