//! # Dict — dictionary interface layer
//!
//! Shared vocabulary for the storage engines: the error taxonomy, key types
//! and their comparison rules, scan predicates, cursor statuses, and the
//! [`Dictionary`] / [`Cursor`] capability traits every engine implements.
//!
//! A dictionary instance is identified by an integer id handed out by the
//! master table; the id alone determines the names of the backing files (see
//! [`data_filename`] and [`state_filename`]).
//!
//! ## Status convention
//!
//! Every fallible operation returns `Result<_, DictError>`. Mutating
//! operations return the number of affected records on success, so
//! `Ok(1)` from `insert` plays the role of the classic `{error, count}`
//! status pair — with the compiler enforcing that callers inspect it.

use std::cmp::Ordering;
use std::io;

use thiserror::Error;

/// Unique integer id for a dictionary instance, assigned by the master table.
pub type DictionaryId = u32;

/// Returns the data-file name for a dictionary id (`<id>.lhd`).
#[must_use]
pub fn data_filename(id: DictionaryId) -> String {
    format!("{}.lhd", id)
}

/// Returns the state-file name for a dictionary id (`<id>.lhs`).
#[must_use]
pub fn state_filename(id: DictionaryId) -> String {
    format!("{}.lhs", id)
}

/// Errors surfaced by dictionary operations.
///
/// I/O and allocation failures abort the current call and surface unmodified
/// to the caller — there is no silent retry. [`DictError::ItemNotFound`] is an
/// expected outcome for `get` and `remove`, not a fault.
#[derive(Debug, Error)]
pub enum DictError {
    /// An allocation could not be satisfied (directory growth).
    #[error("out of memory")]
    OutOfMemory,

    /// A backing file could not be created or opened.
    #[error("could not open backing file: {0}")]
    FileOpenError(#[source] io::Error),

    /// A read from a backing file failed.
    #[error("file read failed: {0}")]
    FileReadError(#[source] io::Error),

    /// A write to a backing file failed.
    #[error("file write failed: {0}")]
    FileWriteError(#[source] io::Error),

    /// A backing file could not be closed cleanly.
    #[error("file close failed: {0}")]
    FileCloseError(#[source] io::Error),

    /// A backing file could not be deleted.
    #[error("file delete failed: {0}")]
    FileDeleteError(#[source] io::Error),

    /// The requested item does not exist.
    #[error("item not found")]
    ItemNotFound,

    /// The directory, bucket headers, or state file are mutually
    /// inconsistent.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),

    /// The supplied predicate is malformed for this dictionary.
    #[error("invalid predicate: {0}")]
    InvalidPredicate(&'static str),

    /// The dictionary configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// A key of the wrong length was supplied.
    #[error("key is {got} bytes, dictionary was created with {expected}")]
    KeySize { expected: usize, got: usize },

    /// A value of the wrong length was supplied.
    #[error("value is {got} bytes, dictionary was created with {expected}")]
    ValueSize { expected: usize, got: usize },
}

/// How keys are interpreted for hashing and ordering.
///
/// Keys are always stored as fixed-size byte strings; the key type only
/// selects the comparison (and hash) rule applied to those bytes. Numeric
/// keys are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// Little-endian two's-complement signed integer.
    NumericSigned,
    /// Little-endian unsigned integer.
    NumericUnsigned,
    /// Opaque byte string, ordered lexicographically.
    CharArray,
}

impl KeyType {
    /// Three-way comparison of two keys of this type.
    ///
    /// Both keys must have the dictionary's configured key size; the engines
    /// validate lengths before storing, so unequal lengths cannot reach this
    /// point through the public API.
    #[must_use]
    pub fn compare(self, a: &[u8], b: &[u8]) -> Ordering {
        debug_assert_eq!(a.len(), b.len());
        match self {
            // Little-endian magnitude order: most significant byte last.
            KeyType::NumericUnsigned => a.iter().rev().cmp(b.iter().rev()),
            KeyType::NumericSigned => {
                let neg_a = a.last().is_some_and(|byte| byte & 0x80 != 0);
                let neg_b = b.last().is_some_and(|byte| byte & 0x80 != 0);
                match (neg_a, neg_b) {
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    // Same sign: two's complement preserves unsigned order.
                    _ => a.iter().rev().cmp(b.iter().rev()),
                }
            }
            KeyType::CharArray => a.cmp(b),
        }
    }
}

/// Selection predicate for [`Dictionary::find`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// All records whose key equals `key` exactly.
    Equality { key: Vec<u8> },
    /// All records with `lower <= key <= upper` under the key type's order.
    Range { lower: Vec<u8>, upper: Vec<u8> },
    /// Every record in the dictionary.
    AllRecords,
}

impl Predicate {
    /// Returns `true` if `key` satisfies the predicate under `key_type`'s
    /// comparison rule.
    #[must_use]
    pub fn matches(&self, key: &[u8], key_type: KeyType) -> bool {
        match self {
            Predicate::Equality { key: wanted } => key == wanted.as_slice(),
            Predicate::Range { lower, upper } => {
                key_type.compare(key, lower) != Ordering::Less
                    && key_type.compare(key, upper) != Ordering::Greater
            }
            Predicate::AllRecords => true,
        }
    }
}

/// Lifecycle of a cursor.
///
/// `Uninitialized -> Initialized -> Active -> EndOfResults`, or directly
/// `Uninitialized -> EndOfResults` when building the cursor proves there is
/// no match. `EndOfResults` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStatus {
    /// The cursor has been allocated but not yet positioned.
    Uninitialized,
    /// The cursor is positioned on its first result, not yet returned.
    Initialized,
    /// At least one result has been returned; more may follow.
    Active,
    /// The result set is exhausted.
    EndOfResults,
}

/// A key-value pair returned by a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Streaming result set produced by [`Dictionary::find`].
///
/// `next` returns `Ok(None)` once the cursor reaches
/// [`CursorStatus::EndOfResults`]; later calls keep returning `Ok(None)`.
/// Dropping the cursor releases its predicate copy and scan position.
pub trait Cursor {
    /// Current protocol state.
    fn status(&self) -> CursorStatus;

    /// Returns the next matching record, or `None` at end of results.
    fn next(&mut self) -> Result<Option<Record>, DictError>;
}

/// The storage-engine capability set: insert, get, update, remove, find.
///
/// Engine lifecycle (create/open/close/destroy) stays on the concrete types —
/// it varies per engine — while this trait captures the operations the
/// dispatch layer forwards to any engine.
///
/// The cursor type borrows the dictionary mutably, so the borrow checker
/// guarantees a cursor can neither outlive its dictionary nor interleave
/// with writes.
pub trait Dictionary {
    /// Cursor type produced by [`find`](Dictionary::find).
    type Cursor<'a>: Cursor
    where
        Self: 'a;

    /// Stores `value` under `key`. Duplicate keys are permitted.
    /// Returns the number of records written (1).
    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<usize, DictError>;

    /// Returns the value stored under `key`, or
    /// [`DictError::ItemNotFound`].
    fn get(&mut self, key: &[u8]) -> Result<Vec<u8>, DictError>;

    /// Overwrites the value stored under `key` in place. An absent key is
    /// inserted instead (upsert). Returns the number of records affected.
    fn update(&mut self, key: &[u8], value: &[u8]) -> Result<usize, DictError>;

    /// Deletes the record stored under `key`. Returns the number of records
    /// removed, or [`DictError::ItemNotFound`].
    fn remove(&mut self, key: &[u8]) -> Result<usize, DictError>;

    /// Builds a cursor over every record satisfying `predicate`.
    fn find(&mut self, predicate: Predicate) -> Result<Self::Cursor<'_>, DictError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_derive_from_id() {
        assert_eq!(data_filename(7), "7.lhd");
        assert_eq!(state_filename(7), "7.lhs");
        assert_eq!(data_filename(1042), "1042.lhd");
    }

    #[test]
    fn unsigned_compare_is_little_endian() {
        let a = 5u32.to_le_bytes();
        let b = 300u32.to_le_bytes();
        assert_eq!(KeyType::NumericUnsigned.compare(&a, &b), Ordering::Less);
        assert_eq!(KeyType::NumericUnsigned.compare(&b, &a), Ordering::Greater);
        assert_eq!(KeyType::NumericUnsigned.compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn signed_compare_orders_across_zero() {
        let neg = (-3i32).to_le_bytes();
        let pos = 2i32.to_le_bytes();
        assert_eq!(KeyType::NumericSigned.compare(&neg, &pos), Ordering::Less);
        assert_eq!(KeyType::NumericSigned.compare(&pos, &neg), Ordering::Greater);

        let more_neg = (-77i32).to_le_bytes();
        assert_eq!(
            KeyType::NumericSigned.compare(&more_neg, &neg),
            Ordering::Less
        );
    }

    #[test]
    fn char_array_compare_is_lexicographic() {
        assert_eq!(KeyType::CharArray.compare(b"abc", b"abd"), Ordering::Less);
        assert_eq!(KeyType::CharArray.compare(b"abc", b"abc"), Ordering::Equal);
    }

    #[test]
    fn range_predicate_is_inclusive_on_both_bounds() {
        let pred = Predicate::Range {
            lower: 10i32.to_le_bytes().to_vec(),
            upper: 20i32.to_le_bytes().to_vec(),
        };
        assert!(pred.matches(&10i32.to_le_bytes(), KeyType::NumericSigned));
        assert!(pred.matches(&20i32.to_le_bytes(), KeyType::NumericSigned));
        assert!(pred.matches(&15i32.to_le_bytes(), KeyType::NumericSigned));
        assert!(!pred.matches(&9i32.to_le_bytes(), KeyType::NumericSigned));
        assert!(!pred.matches(&21i32.to_le_bytes(), KeyType::NumericSigned));
    }

    #[test]
    fn equality_predicate_requires_exact_bytes() {
        let pred = Predicate::Equality {
            key: b"key1".to_vec(),
        };
        assert!(pred.matches(b"key1", KeyType::CharArray));
        assert!(!pred.matches(b"key2", KeyType::CharArray));
    }

    #[test]
    fn all_records_matches_everything() {
        assert!(Predicate::AllRecords.matches(b"anything", KeyType::CharArray));
    }
}
