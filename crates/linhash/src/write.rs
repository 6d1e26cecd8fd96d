//! Write path: `insert()`, `update()`, `delete()`.
//!
//! Inserts route with the split-aware hash, reuse the first empty or
//! tombstoned slot in the chain, and append an overflow page when the whole
//! chain is full. Every successful insert runs the split check. Updates
//! overwrite the matched value in place and fall back to insert when the
//! key is absent (upsert). Deletes tombstone the slot lazily.

use crate::LinearHashTable;
use dict::DictError;
use store::RecordStatus;
use tracing::trace;

impl LinearHashTable {
    /// Stores `value` under `key`. Duplicate keys are permitted; each
    /// insert occupies its own slot.
    ///
    /// Returns the number of records written (always 1). May trigger at
    /// most one bucket split before returning.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<usize, DictError> {
        self.validate_key(key)?;
        self.validate_value(value)?;

        let idx = self.hash_to_bucket(key);
        self.insert_into_bucket(idx, key, value)?;
        self.num_records += 1;
        self.persisted = false;

        self.maybe_split()?;
        Ok(1)
    }

    /// Overwrites the value stored under `key` in place. An absent key is
    /// inserted instead. Returns the number of records affected.
    pub fn update(&mut self, key: &[u8], value: &[u8]) -> Result<usize, DictError> {
        self.validate_key(key)?;
        self.validate_value(value)?;

        match self.locate_record(key)? {
            Some(found) => {
                self.store.write_value(found.slot_loc, value)?;
                self.persisted = false;
                Ok(1)
            }
            None => self.insert(key, value),
        }
    }

    /// Tombstones the record stored under `key` and decrements the record
    /// counts. The slot is reclaimed by a later insert, not now.
    ///
    /// # Errors
    ///
    /// [`DictError::ItemNotFound`] if no occupied slot matches; the table
    /// is left untouched in that case.
    pub fn delete(&mut self, key: &[u8]) -> Result<usize, DictError> {
        self.validate_key(key)?;

        let found = match self.locate_record(key)? {
            Some(found) => found,
            None => return Err(DictError::ItemNotFound),
        };

        self.store.write_status(found.slot_loc, RecordStatus::Tombstone)?;

        let mut header = self.store.read_header(found.bucket_loc)?;
        header.record_count = header
            .record_count
            .checked_sub(1)
            .ok_or(DictError::IllegalState("bucket record count underflow"))?;
        self.store.write_header(found.bucket_loc, &header)?;

        self.num_records = self
            .num_records
            .checked_sub(1)
            .ok_or(DictError::IllegalState("table record count underflow"))?;
        self.persisted = false;
        Ok(1)
    }

    /// Writes `key`/`value` into the first free slot of bucket `idx`'s
    /// chain, appending an overflow page if every slot is occupied, and
    /// bumps the physical bucket's record count.
    ///
    /// Does not touch `num_records` or the split check — the split pass
    /// reuses this to migrate records without recursing into itself.
    pub(crate) fn insert_into_bucket(
        &mut self,
        idx: u32,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), DictError> {
        let mut bucket_loc = self.directory.get(idx)?;

        loop {
            let header = self.store.read_header(bucket_loc)?;

            for slot in 0..self.records_per_bucket() {
                let slot_loc = self.store.slot_loc(bucket_loc, slot);
                if self.store.read_status(slot_loc)? != RecordStatus::Occupied {
                    self.store
                        .write_record(slot_loc, RecordStatus::Occupied, key, value)?;
                    let mut header = header;
                    header.record_count += 1;
                    self.store.write_header(bucket_loc, &header)?;
                    return Ok(());
                }
            }

            if header.has_overflow() {
                bucket_loc = header.overflow_location;
                continue;
            }

            // Whole chain full: append a fresh overflow page, link it from
            // the chain tail, and take its first slot.
            let overflow_loc = self.store.append_bucket(idx)?;
            trace!(
                "bucket {} chain full, appended overflow page at {}",
                idx,
                overflow_loc
            );

            let mut tail = header;
            tail.overflow_location = overflow_loc;
            self.store.write_header(bucket_loc, &tail)?;

            let slot_loc = self.store.slot_loc(overflow_loc, 0);
            self.store
                .write_record(slot_loc, RecordStatus::Occupied, key, value)?;

            let mut overflow_header = self.store.read_header(overflow_loc)?;
            overflow_header.record_count = 1;
            self.store.write_header(overflow_loc, &overflow_header)?;
            return Ok(());
        }
    }
}
