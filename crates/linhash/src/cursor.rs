//! Cursor engine: the predicate scan state machine.
//!
//! A cursor moves through `Uninitialized -> Initialized -> Active ->
//! EndOfResults` (or straight to `EndOfResults` when the build probe finds
//! nothing). Building the cursor seeds it at the bucket the predicate
//! resolves to and probes for the first match; the first `next` yields that
//! probe, later calls resume the scan where it stopped.
//!
//! The scan order inside a bucket is: slots of the current page, then the
//! overflow chain, then the next directory index modulo the bucket count.
//! Range and all-records cursors wrap the whole directory once; an equality
//! cursor stops after the seed chain, since equal keys can only ever route
//! to that one bucket.
//!
//! The cursor borrows the table mutably for its whole lifetime — a cursor
//! can neither outlive its dictionary nor observe a concurrent write, and
//! teardown is plain `Drop`.

use crate::LinearHashTable;
use dict::{CursorStatus, DictError, Predicate, Record};
use store::RecordStatus;

/// Streaming scan over the records matching a predicate.
pub struct LinearHashCursor<'a> {
    table: &'a mut LinearHashTable,
    predicate: Predicate,
    status: CursorStatus,
    /// Directory index the scan started at; the wrap terminates here.
    first_bucket: u32,
    /// Directory index of the chain currently being scanned.
    current_bucket: u32,
    /// Offset of the physical page currently being scanned.
    bucket_loc: u64,
    /// Next slot to examine in that page.
    slot: usize,
    /// Record found by the build probe, not yet handed out.
    pending: Option<Record>,
}

impl<'a> LinearHashCursor<'a> {
    /// Builds a cursor: validates the predicate, seeds the scan position,
    /// and probes for the first match.
    pub(crate) fn build(
        table: &'a mut LinearHashTable,
        predicate: Predicate,
    ) -> Result<Self, DictError> {
        Self::validate_predicate(table, &predicate)?;

        let seed = match &predicate {
            Predicate::Equality { key } => table.hash_to_bucket(key),
            Predicate::Range { lower, .. } => table.hash_to_bucket(lower),
            Predicate::AllRecords => 0,
        };
        let bucket_loc = table.directory.get(seed)?;

        let mut cursor = Self {
            table,
            predicate,
            status: CursorStatus::Uninitialized,
            first_bucket: seed,
            current_bucket: seed,
            bucket_loc,
            slot: 0,
            pending: None,
        };

        match cursor.scan_next()? {
            Some(record) => {
                cursor.pending = Some(record);
                cursor.status = CursorStatus::Initialized;
            }
            None => cursor.status = CursorStatus::EndOfResults,
        }
        Ok(cursor)
    }

    /// Current protocol state.
    #[must_use]
    pub fn status(&self) -> CursorStatus {
        self.status
    }

    /// Returns the next matching record, or `None` once the result set is
    /// exhausted. `EndOfResults` is terminal: further calls keep returning
    /// `None`.
    pub fn next(&mut self) -> Result<Option<Record>, DictError> {
        match self.status {
            CursorStatus::Uninitialized => {
                Err(DictError::IllegalState("cursor was never initialized"))
            }
            CursorStatus::EndOfResults => Ok(None),
            CursorStatus::Initialized => {
                self.status = CursorStatus::Active;
                Ok(self.pending.take())
            }
            CursorStatus::Active => match self.scan_next()? {
                Some(record) => Ok(Some(record)),
                None => {
                    self.status = CursorStatus::EndOfResults;
                    Ok(None)
                }
            },
        }
    }

    /// Advances to the next occupied slot satisfying the predicate,
    /// following overflow chains and wrapping the directory as needed.
    /// Returns `None` when the scan is exhausted.
    fn scan_next(&mut self) -> Result<Option<Record>, DictError> {
        loop {
            while self.slot < self.table.records_per_bucket() {
                let slot_loc = self.table.store.slot_loc(self.bucket_loc, self.slot);
                self.slot += 1;

                let record = self.table.store.read_record(slot_loc)?;
                if record.status == RecordStatus::Occupied
                    && self.predicate.matches(&record.key, self.table.key_type)
                {
                    return Ok(Some(Record {
                        key: record.key,
                        value: record.value,
                    }));
                }
            }

            // Page exhausted: follow the overflow chain first.
            let header = self.table.store.read_header(self.bucket_loc)?;
            if header.has_overflow() {
                self.bucket_loc = header.overflow_location;
                self.slot = 0;
                continue;
            }

            // Chain exhausted. Equal keys all route to the seed bucket, so
            // an equality scan is done here.
            if matches!(self.predicate, Predicate::Equality { .. }) {
                return Ok(None);
            }

            // Advance to the next directory index; a full wrap back to the
            // start bucket ends the scan.
            let next = (self.current_bucket + 1) % self.table.num_buckets;
            if next == self.first_bucket {
                return Ok(None);
            }
            self.current_bucket = next;
            self.bucket_loc = self.table.directory.get(next)?;
            self.slot = 0;
        }
    }

    fn validate_predicate(
        table: &LinearHashTable,
        predicate: &Predicate,
    ) -> Result<(), DictError> {
        match predicate {
            Predicate::Equality { key } => {
                if key.len() != table.key_size() {
                    return Err(DictError::InvalidPredicate(
                        "equality key has the wrong size",
                    ));
                }
            }
            Predicate::Range { lower, upper } => {
                if lower.len() != table.key_size() || upper.len() != table.key_size() {
                    return Err(DictError::InvalidPredicate(
                        "range bound has the wrong size",
                    ));
                }
                if table.key_type.compare(lower, upper) == std::cmp::Ordering::Greater {
                    return Err(DictError::InvalidPredicate(
                        "range lower bound exceeds upper bound",
                    ));
                }
            }
            Predicate::AllRecords => {}
        }
        Ok(())
    }
}
