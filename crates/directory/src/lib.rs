//! # Directory — bucket index to file offset map
//!
//! Growable mapping from a logical bucket index to the file offset of that
//! bucket's primary page. The table registers entries contiguously from 0 as
//! buckets are appended; the directory grows by capacity doubling that
//! preserves every prior entry and it never shrinks. There is no removal —
//! an entry persists even if its bucket becomes empty.
//!
//! ## Serialized layout
//!
//! ```text
//! [len: u32 LE][offset: u64 LE] * len
//! ```
//!
//! Only registered entries are written; spare capacity is a memory-only
//! concern and is rebuilt on load.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use dict::DictError;
use std::io::{Read, Write};

/// Upper bound on a plausible directory length, used to reject corrupt
/// serialized data before allocating.
const MAX_ENTRIES: usize = 1 << 24;

/// Maps each logical bucket index to the file offset of its primary page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketDirectory {
    /// Offsets indexed by bucket index. Slots in `len..` are spare capacity.
    slots: Vec<u64>,
    /// One past the highest registered index.
    len: usize,
}

impl BucketDirectory {
    /// Creates an empty directory with room for `initial_capacity` entries.
    pub fn new(initial_capacity: usize) -> Result<Self, DictError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(initial_capacity.max(1))
            .map_err(|_| DictError::OutOfMemory)?;
        slots.resize(initial_capacity.max(1), 0);
        Ok(Self { slots, len: 0 })
    }

    /// Returns the primary-page offset registered for `idx`.
    ///
    /// # Errors
    ///
    /// [`DictError::ItemNotFound`] if `idx` is beyond the highest registered
    /// index.
    pub fn get(&self, idx: u32) -> Result<u64, DictError> {
        let idx = idx as usize;
        if idx >= self.len {
            return Err(DictError::ItemNotFound);
        }
        Ok(self.slots[idx])
    }

    /// Registers (or overwrites) the offset for `idx`, doubling the capacity
    /// as often as needed to make `idx` addressable.
    ///
    /// # Errors
    ///
    /// [`DictError::OutOfMemory`] if the doubled backing store cannot be
    /// allocated; the existing entries are untouched in that case.
    pub fn set(&mut self, idx: u32, offset: u64) -> Result<(), DictError> {
        let idx = idx as usize;
        if idx >= self.slots.len() {
            let mut new_cap = self.slots.len();
            while new_cap <= idx {
                new_cap *= 2;
            }
            self.slots
                .try_reserve_exact(new_cap - self.slots.len())
                .map_err(|_| DictError::OutOfMemory)?;
            self.slots.resize(new_cap, 0);
        }
        self.slots[idx] = offset;
        if idx >= self.len {
            self.len = idx + 1;
        }
        Ok(())
    }

    /// Number of registered entries (one past the highest index).
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no entry has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current capacity in entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Writes the registered entries to `w`.
    pub fn save_to<W: Write>(&self, w: &mut W) -> Result<(), DictError> {
        w.write_u32::<LittleEndian>(self.len as u32)
            .map_err(DictError::FileWriteError)?;
        for &offset in &self.slots[..self.len] {
            w.write_u64::<LittleEndian>(offset)
                .map_err(DictError::FileWriteError)?;
        }
        Ok(())
    }

    /// Reads a directory previously written by [`save_to`](Self::save_to).
    ///
    /// # Errors
    ///
    /// [`DictError::IllegalState`] if the stored length is implausible,
    /// [`DictError::FileReadError`] on short or failed reads.
    pub fn load_from<R: Read>(r: &mut R) -> Result<Self, DictError> {
        let len = r
            .read_u32::<LittleEndian>()
            .map_err(DictError::FileReadError)? as usize;
        if len > MAX_ENTRIES {
            return Err(DictError::IllegalState("directory length implausible"));
        }
        let mut dir = Self::new(len.max(1))?;
        for idx in 0..len {
            let offset = r
                .read_u64::<LittleEndian>()
                .map_err(DictError::FileReadError)?;
            dir.set(idx as u32, offset)?;
        }
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn set_then_get_round_trips() {
        let mut dir = BucketDirectory::new(4).unwrap();
        dir.set(0, 0).unwrap();
        dir.set(1, 512).unwrap();
        assert_eq!(dir.get(0).unwrap(), 0);
        assert_eq!(dir.get(1).unwrap(), 512);
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn get_beyond_bound_is_item_not_found() {
        let mut dir = BucketDirectory::new(4).unwrap();
        dir.set(0, 128).unwrap();
        assert!(matches!(dir.get(1), Err(DictError::ItemNotFound)));
        assert!(matches!(dir.get(99), Err(DictError::ItemNotFound)));
    }

    #[test]
    fn growth_doubles_and_preserves_entries() {
        let mut dir = BucketDirectory::new(2).unwrap();
        for idx in 0..2u32 {
            dir.set(idx, u64::from(idx) * 100).unwrap();
        }
        assert_eq!(dir.capacity(), 2);

        // Forces two doublings: 2 -> 4 -> 8.
        dir.set(5, 500).unwrap();
        assert_eq!(dir.capacity(), 8);
        assert_eq!(dir.get(0).unwrap(), 0);
        assert_eq!(dir.get(1).unwrap(), 100);
        assert_eq!(dir.get(5).unwrap(), 500);
    }

    #[test]
    fn overwrite_keeps_length() {
        let mut dir = BucketDirectory::new(4).unwrap();
        dir.set(0, 10).unwrap();
        dir.set(0, 20).unwrap();
        assert_eq!(dir.get(0).unwrap(), 20);
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn directory_never_shrinks() {
        let mut dir = BucketDirectory::new(2).unwrap();
        for idx in 0..16u32 {
            dir.set(idx, u64::from(idx)).unwrap();
        }
        let cap = dir.capacity();
        dir.set(3, 333).unwrap();
        assert_eq!(dir.capacity(), cap);
        assert_eq!(dir.len(), 16);
        for idx in 0..16u32 {
            let expected = if idx == 3 { 333 } else { u64::from(idx) };
            assert_eq!(dir.get(idx).unwrap(), expected);
        }
    }

    #[test]
    fn save_load_round_trip() {
        let mut dir = BucketDirectory::new(4).unwrap();
        for idx in 0..6u32 {
            dir.set(idx, u64::from(idx) * 4096 + 16).unwrap();
        }

        let mut buf = Vec::new();
        dir.save_to(&mut buf).unwrap();

        let loaded = BucketDirectory::load_from(&mut Cursor::new(buf)).unwrap();
        assert_eq!(loaded.len(), 6);
        for idx in 0..6u32 {
            assert_eq!(loaded.get(idx).unwrap(), dir.get(idx).unwrap());
        }
    }

    #[test]
    fn load_rejects_implausible_length() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        let err = BucketDirectory::load_from(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, DictError::IllegalState(_)));
    }

    #[test]
    fn load_rejects_truncated_data() {
        let mut dir = BucketDirectory::new(2).unwrap();
        dir.set(0, 7).unwrap();
        dir.set(1, 9).unwrap();

        let mut buf = Vec::new();
        dir.save_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 3);

        let err = BucketDirectory::load_from(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, DictError::FileReadError(_)));
    }
}
