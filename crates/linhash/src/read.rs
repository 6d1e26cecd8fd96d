//! Read path: `get()` and the shared chain traversal.
//!
//! A lookup routes through the split-aware hash, then walks the primary
//! bucket and its overflow chain looking for an occupied slot whose key
//! matches exactly. Empty and tombstoned slots are skipped.

use crate::LinearHashTable;
use dict::DictError;
use store::RecordStatus;

/// Location and payload of a record found by [`LinearHashTable::locate_record`].
pub(crate) struct FoundRecord {
    /// Offset of the physical bucket page holding the slot.
    pub bucket_loc: u64,
    /// Offset of the record slot itself.
    pub slot_loc: u64,
    pub value: Vec<u8>,
}

impl LinearHashTable {
    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// [`DictError::ItemNotFound`] if no occupied slot matches,
    /// [`DictError::KeySize`] for a key of the wrong length.
    pub fn get(&mut self, key: &[u8]) -> Result<Vec<u8>, DictError> {
        self.validate_key(key)?;
        match self.locate_record(key)? {
            Some(found) => Ok(found.value),
            None => Err(DictError::ItemNotFound),
        }
    }

    /// Walks the chain `key` routes to and returns the first occupied slot
    /// with an exactly matching key, or `None`.
    ///
    /// Shared by `get`, `update` and `delete`, which all use the same
    /// traversal before acting on the slot.
    pub(crate) fn locate_record(&mut self, key: &[u8]) -> Result<Option<FoundRecord>, DictError> {
        let idx = self.hash_to_bucket(key);
        let mut bucket_loc = self.directory.get(idx)?;

        loop {
            let header = self.store.read_header(bucket_loc)?;
            for slot in 0..self.records_per_bucket() {
                let slot_loc = self.store.slot_loc(bucket_loc, slot);
                let record = self.store.read_record(slot_loc)?;
                if record.status == RecordStatus::Occupied && record.key == key {
                    return Ok(Some(FoundRecord {
                        bucket_loc,
                        slot_loc,
                        value: record.value,
                    }));
                }
            }
            if !header.has_overflow() {
                return Ok(None);
            }
            bucket_loc = header.overflow_location;
        }
    }
}
