//! # Linhash - persistent linear hash dictionary engine
//!
//! On-disk dynamic hashing with incremental bucket growth, overflow
//! chaining, and predicate-driven cursor scanning, built on the
//! [`directory`] and [`store`] crates and implementing the [`dict`]
//! capability traits.
//!
//! ## Architecture
//!
//! ```text
//! Caller
//!   |
//!   v
//! ┌──────────────────────────────────────────────────┐
//! │               LINEAR HASH TABLE                  │
//! │                                                  │
//! │ write.rs → route key → slot scan → record write  │
//! │              |                                   │
//! │              |  (load factor above threshold?)   │
//! │              |            yes                    │
//! │              v                                   │
//! │        split.rs → append bucket → migrate one    │
//! │                                                  │
//! │ read.rs   → split-aware route → chain traversal  │
//! │ cursor.rs → seed probe → slot/chain/bucket scan  │
//! │ state.rs  → close/open persistence (.lhs file)   │
//! └──────────────────────────────────────────────────┘
//!        |                          |
//!        v                          v
//!   BucketDirectory           RecordStore
//!   (index → offset)          (<id>.lhd pages)
//! ```
//!
//! ## Growth
//!
//! The table starts with `initial_size` primary buckets (generation size N).
//! When an insert pushes the load factor over `split_threshold` percent, one
//! new bucket is appended and the bucket at `next_split` is divided between
//! itself and the newcomer — no stop-the-world rehash. Once `next_split`
//! reaches N the generation doubles and `next_split` resets to 0.
//!
//! Every operation routes with the same split-aware address: `h0 = hash mod
//! N`, rerouted through `h1 = hash mod 2N` for buckets already divided this
//! round, so placement and lookup always agree mid-round.
//!
//! ## Durability
//!
//! There is no write-ahead log. `close` persists the engine state and the
//! bucket directory to `<id>.lhs`; a crash before that (notably mid-split)
//! can leave the table inconsistent.

mod cursor;
mod handler;
mod hashing;
mod read;
mod split;
mod state;
mod write;

pub use cursor::LinearHashCursor;
pub use dict::{
    data_filename, state_filename, Cursor, CursorStatus, DictError, Dictionary, DictionaryId,
    KeyType, Predicate, Record,
};

use directory::BucketDirectory;
use std::path::{Path, PathBuf};
use store::RecordStore;
use tracing::debug;

/// Creation-time parameters for a linear hash table.
///
/// `initial_size` is the number of primary buckets written at `init` and the
/// starting generation size N. `split_threshold` is the load-factor
/// percentage above which an insert triggers a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearHashConfig {
    pub key_type: KeyType,
    pub key_size: usize,
    pub value_size: usize,
    pub initial_size: u32,
    pub split_threshold: u32,
    pub records_per_bucket: usize,
}

impl Default for LinearHashConfig {
    fn default() -> Self {
        Self {
            key_type: KeyType::NumericSigned,
            key_size: 4,
            value_size: 8,
            initial_size: 4,
            split_threshold: 85,
            records_per_bucket: 4,
        }
    }
}

impl LinearHashConfig {
    pub(crate) fn validate(&self) -> Result<(), DictError> {
        if self.key_size == 0 {
            return Err(DictError::InvalidConfig("key size must be at least 1"));
        }
        if self.value_size == 0 {
            return Err(DictError::InvalidConfig("value size must be at least 1"));
        }
        if self.initial_size == 0 {
            return Err(DictError::InvalidConfig("initial size must be at least 1"));
        }
        if self.split_threshold == 0 || self.split_threshold > 100 {
            return Err(DictError::InvalidConfig(
                "split threshold must be a percentage in 1..=100",
            ));
        }
        if self.records_per_bucket == 0 {
            return Err(DictError::InvalidConfig(
                "records per bucket must be at least 1",
            ));
        }
        Ok(())
    }
}

/// A persistent linear hash table.
///
/// Owns its backing file handle for the whole instance lifetime; all I/O is
/// synchronous and blocking, and exactly one writer is assumed. Cursors
/// produced by [`Dictionary::find`] borrow the table mutably, so they cannot
/// outlive it or interleave with writes.
pub struct LinearHashTable {
    pub(crate) id: DictionaryId,
    /// Directory holding the `<id>.lhd` / `<id>.lhs` files.
    pub(crate) base: PathBuf,
    pub(crate) key_type: KeyType,
    /// Current generation size N. Doubles when a growth round completes.
    pub(crate) initial_size: u32,
    /// Index of the next bucket to divide, always in `0..initial_size`.
    pub(crate) next_split: u32,
    /// Load-factor percentage that triggers a split.
    pub(crate) split_threshold: u32,
    /// Total primary buckets, equal to `initial_size + next_split`.
    pub(crate) num_buckets: u32,
    /// Live records across all buckets and overflow pages.
    pub(crate) num_records: u64,
    pub(crate) store: RecordStore,
    pub(crate) directory: BucketDirectory,
    /// Set once the on-disk state file matches the in-memory state; cleared
    /// by every mutation so `Drop` knows whether a best-effort save is due.
    pub(crate) persisted: bool,
}

impl LinearHashTable {
    /// Creates a new table: opens a fresh `<id>.lhd` under `base`, writes
    /// `initial_size` empty primary buckets and registers their directory
    /// entries.
    ///
    /// # Errors
    ///
    /// [`DictError::InvalidConfig`] for unusable parameters,
    /// [`DictError::FileOpenError`] / [`DictError::FileWriteError`] on I/O
    /// failure.
    pub fn init(
        base: &Path,
        id: DictionaryId,
        config: LinearHashConfig,
    ) -> Result<Self, DictError> {
        config.validate()?;

        let data_path = base.join(data_filename(id));
        let mut store = RecordStore::create(
            &data_path,
            config.key_size,
            config.value_size,
            config.records_per_bucket,
        )?;

        let mut directory = BucketDirectory::new(config.initial_size as usize)?;
        for idx in 0..config.initial_size {
            let loc = store.append_bucket(idx)?;
            directory.set(idx, loc)?;
        }

        debug!(
            "created linear hash table {} with {} buckets of {} records",
            id, config.initial_size, config.records_per_bucket
        );

        Ok(Self {
            id,
            base: base.to_path_buf(),
            key_type: config.key_type,
            initial_size: config.initial_size,
            next_split: 0,
            split_threshold: config.split_threshold,
            num_buckets: config.initial_size,
            num_records: 0,
            store,
            directory,
            persisted: false,
        })
    }

    /// Persists the engine state and directory to `<id>.lhs`, flushes the
    /// data file, and closes both handles.
    pub fn close(mut self) -> Result<(), DictError> {
        self.store.sync_to_disk().map_err(|err| match err {
            DictError::FileWriteError(io) => DictError::FileCloseError(io),
            other => other,
        })?;
        self.save_state()?;
        self.persisted = true;
        Ok(())
    }

    /// Closes the table and deletes both backing files.
    ///
    /// A state file that was never written (the table has not been closed
    /// before) is not an error.
    pub fn destroy(mut self) -> Result<(), DictError> {
        let data_path = self.data_path();
        let state_path = self.state_path();

        debug!("destroying linear hash table {}", self.id);

        // Suppress the Drop save and release the file handle before
        // removing the files.
        self.persisted = true;
        drop(self);

        std::fs::remove_file(&data_path).map_err(DictError::FileDeleteError)?;
        match std::fs::remove_file(&state_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DictError::FileDeleteError(e)),
        }
    }

    /// Dictionary id assigned by the master table.
    #[must_use]
    pub fn id(&self) -> DictionaryId {
        self.id
    }

    /// Live record count.
    #[must_use]
    pub fn num_records(&self) -> u64 {
        self.num_records
    }

    /// Primary bucket count (excluding overflow pages).
    #[must_use]
    pub fn num_buckets(&self) -> u32 {
        self.num_buckets
    }

    /// Current generation size N.
    #[must_use]
    pub fn initial_size(&self) -> u32 {
        self.initial_size
    }

    /// Index of the next bucket to split.
    #[must_use]
    pub fn next_split(&self) -> u32 {
        self.next_split
    }

    /// Load-factor percentage that triggers a split.
    #[must_use]
    pub fn split_threshold(&self) -> u32 {
        self.split_threshold
    }

    #[must_use]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    #[must_use]
    pub fn key_size(&self) -> usize {
        self.store.key_size()
    }

    #[must_use]
    pub fn value_size(&self) -> usize {
        self.store.value_size()
    }

    #[must_use]
    pub fn records_per_bucket(&self) -> usize {
        self.store.records_per_bucket()
    }

    pub(crate) fn data_path(&self) -> PathBuf {
        self.base.join(data_filename(self.id))
    }

    pub(crate) fn state_path(&self) -> PathBuf {
        self.base.join(state_filename(self.id))
    }

    pub(crate) fn validate_key(&self, key: &[u8]) -> Result<(), DictError> {
        if key.len() != self.key_size() {
            return Err(DictError::KeySize {
                expected: self.key_size(),
                got: key.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn validate_value(&self, value: &[u8]) -> Result<(), DictError> {
        if value.len() != self.value_size() {
            return Err(DictError::ValueSize {
                expected: self.value_size(),
                got: value.len(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for LinearHashTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearHashTable")
            .field("id", &self.id)
            .field("key_type", &self.key_type)
            .field("key_size", &self.key_size())
            .field("value_size", &self.value_size())
            .field("initial_size", &self.initial_size)
            .field("next_split", &self.next_split)
            .field("split_threshold", &self.split_threshold)
            .field("num_buckets", &self.num_buckets)
            .field("num_records", &self.num_records)
            .field("records_per_bucket", &self.records_per_bucket())
            .finish()
    }
}

/// Best-effort state save on drop.
///
/// Errors are ignored because `Drop` cannot propagate them; callers that
/// care about durability use [`LinearHashTable::close`].
impl Drop for LinearHashTable {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = self.save_state();
        }
    }
}

#[cfg(test)]
mod tests;
