//! Catalog entries and their ISBN identifiers.

use std::{fmt, str::FromStr};

use non_empty_string::NonEmptyString;

/// A validated ISBN.
///
/// No ISBN-10/13 checksum is enforced; the catalog only requires a non-empty
/// identifier (surrounding whitespace is trimmed) that is unique per title.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Isbn(NonEmptyString);

impl Isbn {
    /// Creates an ISBN from a string, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIsbnError`] if the trimmed string is empty.
    pub fn new(s: &str) -> Result<Self, InvalidIsbnError> {
        let trimmed = s.trim();
        let inner = NonEmptyString::new(trimmed.to_string()).map_err(|_| InvalidIsbnError)?;
        Ok(Self(inner))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Isbn {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Isbn {
    type Err = InvalidIsbnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Isbn {
    type Error = InvalidIsbnError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Error returned when an ISBN string is empty.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("ISBN must not be empty")]
pub struct InvalidIsbnError;

/// One title in the catalog, tracking total and available copies.
///
/// `available_copies` never exceeds `total_copies`; the checked mutators in
/// this module are the only way either count changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub(crate) isbn: Isbn,
    pub(crate) title: NonEmptyString,
    pub(crate) author: NonEmptyString,
    pub(crate) total_copies: u32,
    pub(crate) available_copies: u32,
    pub(crate) times_borrowed: u64,
}

impl Book {
    /// Creates a new catalog entry with every copy available.
    pub(crate) const fn new(
        isbn: Isbn,
        title: NonEmptyString,
        author: NonEmptyString,
        copies: u32,
    ) -> Self {
        Self {
            isbn,
            title,
            author,
            total_copies: copies,
            available_copies: copies,
            times_borrowed: 0,
        }
    }

    /// The title's ISBN.
    #[must_use]
    pub const fn isbn(&self) -> &Isbn {
        &self.isbn
    }

    /// The title text.
    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    /// The author text.
    #[must_use]
    pub fn author(&self) -> &str {
        self.author.as_str()
    }

    /// Copies held by the library, including copies on loan.
    #[must_use]
    pub const fn total_copies(&self) -> u32 {
        self.total_copies
    }

    /// Copies currently on the shelf.
    #[must_use]
    pub const fn available_copies(&self) -> u32 {
        self.available_copies
    }

    /// Copies currently checked out.
    #[must_use]
    pub const fn copies_on_loan(&self) -> u32 {
        self.total_copies - self.available_copies
    }

    /// How many times any copy of this title has been borrowed.
    #[must_use]
    pub const fn times_borrowed(&self) -> u64 {
        self.times_borrowed
    }

    /// Stocks additional copies of the title.
    pub(crate) const fn add_copies(&mut self, copies: u32) {
        self.total_copies += copies;
        self.available_copies += copies;
    }

    /// Checks one copy out, bumping the borrow counter.
    ///
    /// # Panics
    ///
    /// Panics if no copy is available; callers check availability first.
    pub(crate) fn check_out(&mut self) {
        assert!(
            self.available_copies > 0,
            "no available copy of {} to check out",
            self.isbn
        );
        self.available_copies -= 1;
        self.times_borrowed += 1;
    }

    /// Checks one copy back in.
    ///
    /// # Panics
    ///
    /// Panics if every copy is already on the shelf; callers verify the loan
    /// exists first.
    pub(crate) fn check_in(&mut self) {
        assert!(
            self.available_copies < self.total_copies,
            "no outstanding copy of {} to check in",
            self.isbn
        );
        self.available_copies += 1;
    }

    /// Case-insensitive substring match against title and author.
    ///
    /// `needle` must already be lowercased. An empty needle matches.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.title.as_str().to_lowercase().contains(needle)
            || self.author.as_str().to_lowercase().contains(needle)
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' by {} ({}/{} available)",
            self.title, self.author, self.available_copies, self.total_copies
        )
    }
}
