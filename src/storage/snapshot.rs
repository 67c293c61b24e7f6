//! The serialized form of a whole library.
//!
//! A [`Snapshot`] is a plain data mirror of [`Library`] state: catalog
//! entries, members with their active loans and return history, and the
//! member-id counter. Converting a snapshot back into a [`Library`] validates
//! every invariant the lending operations normally maintain, so a
//! hand-edited or truncated file is rejected rather than loaded into an
//! inconsistent ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    Book, Isbn, Library, LoanRecord, Member, MemberId,
    book::InvalidIsbnError,
};

/// A whole-state snapshot of a [`Library`], in its serialized layout.
///
/// Obtained with `Snapshot::from(&library)`; turned back into a library with
/// `Library::try_from(snapshot)`, which validates integrity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Snapshot {
    name: String,
    next_member_id: u32,
    books: Vec<BookRecord>,
    members: Vec<MemberRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BookRecord {
    title: String,
    author: String,
    isbn: String,
    total_copies: u32,
    available_copies: u32,
    #[serde(default)]
    times_borrowed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MemberRecord {
    member_id: u32,
    name: String,
    /// Active loans: ISBN to borrow timestamp.
    #[serde(default)]
    borrowed: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    history: Vec<HistoryRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct HistoryRecord {
    isbn: String,
    borrowed_at: DateTime<Utc>,
    returned_at: DateTime<Utc>,
}

/// The serialized versions of the snapshot, tagged so the on-disk format can
/// evolve without breaking old files.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        name: String,
        next_member_id: u32,
        #[serde(default)]
        books: Vec<BookRecord>,
        #[serde(default)]
        members: Vec<MemberRecord>,
    },
}

impl From<Versions> for Snapshot {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                name,
                next_member_id,
                books,
                members,
            } => Self {
                name,
                next_member_id,
                books,
                members,
            },
        }
    }
}

impl From<Snapshot> for Versions {
    fn from(snapshot: Snapshot) -> Self {
        Self::V1 {
            name: snapshot.name,
            next_member_id: snapshot.next_member_id,
            books: snapshot.books,
            members: snapshot.members,
        }
    }
}

/// Errors found while validating a snapshot against the lending invariants.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A book, loan, or history record carries an empty ISBN.
    #[error("snapshot contains an empty ISBN")]
    EmptyIsbn(#[from] InvalidIsbnError),
    /// Two catalog records share an ISBN.
    #[error("duplicate catalog entry for ISBN {0}")]
    DuplicateIsbn(Isbn),
    /// A catalog record has a blank title or author.
    #[error("empty title or author for ISBN {0}")]
    EmptyBookField(Isbn),
    /// A catalog record claims more available copies than it holds.
    #[error("book {isbn}: {available} copies available exceeds {total} total")]
    CopiesExceedTotal {
        /// The offending title.
        isbn: Isbn,
        /// Claimed available copies.
        available: u32,
        /// Claimed total copies.
        total: u32,
    },
    /// A member record uses the unassignable id zero.
    #[error("member id 0 is not assignable")]
    ZeroMemberId,
    /// Two member records share an id.
    #[error("duplicate member id {0}")]
    DuplicateMember(MemberId),
    /// A member record has a blank name.
    #[error("member {0} has an empty name")]
    EmptyMemberName(MemberId),
    /// A member holds a loan for an ISBN missing from the catalog.
    #[error("member {member} holds unknown ISBN {isbn}")]
    UnknownLoanIsbn {
        /// The member holding the loan.
        member: MemberId,
        /// The ISBN not present in the catalog.
        isbn: Isbn,
    },
    /// The number of members holding a title disagrees with its copy counts.
    #[error("book {isbn}: {holders} members hold copies but {on_loan} are checked out")]
    LoanMismatch {
        /// The offending title.
        isbn: Isbn,
        /// Members whose active loans include the title.
        holders: usize,
        /// Copies the catalog says are checked out.
        on_loan: u32,
    },
    /// The member-id counter would re-issue an already assigned id.
    #[error("next member id {next} does not exceed the highest assigned id {highest}")]
    StaleMemberCounter {
        /// The counter stored in the snapshot.
        next: u32,
        /// The highest member id in use.
        highest: u32,
    },
}

impl From<&Library> for Snapshot {
    fn from(library: &Library) -> Self {
        let books = library
            .books()
            .map(|book| BookRecord {
                title: book.title().to_string(),
                author: book.author().to_string(),
                isbn: book.isbn().as_str().to_string(),
                total_copies: book.total_copies(),
                available_copies: book.available_copies(),
                times_borrowed: book.times_borrowed(),
            })
            .collect();

        let members = library
            .members()
            .map(|member| MemberRecord {
                member_id: member.id().get(),
                name: member.name().to_string(),
                borrowed: member
                    .loans()
                    .map(|(isbn, at)| (isbn.as_str().to_string(), at))
                    .collect(),
                history: member
                    .history()
                    .iter()
                    .map(|record| HistoryRecord {
                        isbn: record.isbn.as_str().to_string(),
                        borrowed_at: record.borrowed_at,
                        returned_at: record.returned_at,
                    })
                    .collect(),
            })
            .collect();

        Self {
            name: library.name().to_string(),
            next_member_id: library.next_member_id,
            books,
            members,
        }
    }
}

impl TryFrom<Snapshot> for Library {
    type Error = SnapshotError;

    fn try_from(snapshot: Snapshot) -> Result<Self, Self::Error> {
        let mut books: BTreeMap<Isbn, Book> = BTreeMap::new();
        for record in snapshot.books {
            let isbn = Isbn::new(&record.isbn)?;
            if record.available_copies > record.total_copies {
                return Err(SnapshotError::CopiesExceedTotal {
                    isbn,
                    available: record.available_copies,
                    total: record.total_copies,
                });
            }
            let title = NonEmptyString::new(record.title)
                .map_err(|_| SnapshotError::EmptyBookField(isbn.clone()))?;
            let author = NonEmptyString::new(record.author)
                .map_err(|_| SnapshotError::EmptyBookField(isbn.clone()))?;

            let mut book = Book::new(isbn.clone(), title, author, record.total_copies);
            book.available_copies = record.available_copies;
            book.times_borrowed = record.times_borrowed;

            if books.insert(isbn.clone(), book).is_some() {
                return Err(SnapshotError::DuplicateIsbn(isbn));
            }
        }

        let mut members: BTreeMap<MemberId, Member> = BTreeMap::new();
        let mut highest_id = 0_u32;
        for record in snapshot.members {
            let id = record
                .member_id
                .try_into()
                .map(MemberId::new)
                .map_err(|_| SnapshotError::ZeroMemberId)?;
            highest_id = highest_id.max(record.member_id);

            let name = NonEmptyString::new(record.name)
                .map_err(|_| SnapshotError::EmptyMemberName(id))?;
            let mut member = Member::new(id, name);

            for (isbn, borrowed_at) in record.borrowed {
                let isbn = Isbn::new(&isbn)?;
                if !books.contains_key(&isbn) {
                    return Err(SnapshotError::UnknownLoanIsbn { member: id, isbn });
                }
                member.loans.insert(isbn, borrowed_at);
            }
            for history in record.history {
                member.history.push(LoanRecord {
                    // History may reference titles removed from the catalog
                    // after they were returned; only active loans must
                    // resolve.
                    isbn: Isbn::new(&history.isbn)?,
                    borrowed_at: history.borrowed_at,
                    returned_at: history.returned_at,
                });
            }

            if members.insert(id, member).is_some() {
                return Err(SnapshotError::DuplicateMember(id));
            }
        }

        // Copy conservation: for every title, the copies missing from the
        // shelf must equal the number of members holding it.
        for (isbn, book) in &books {
            let holders = members.values().filter(|m| m.holds(isbn)).count();
            let on_loan = book.copies_on_loan();
            if holders != on_loan as usize {
                return Err(SnapshotError::LoanMismatch {
                    isbn: isbn.clone(),
                    holders,
                    on_loan,
                });
            }
        }

        if snapshot.next_member_id <= highest_id {
            return Err(SnapshotError::StaleMemberCounter {
                next: snapshot.next_member_id,
                highest: highest_id,
            });
        }

        Ok(Self::from_parts(
            snapshot.name,
            books,
            members,
            snapshot.next_member_id,
        ))
    }
}
