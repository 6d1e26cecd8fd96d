//! # Store — bucket and record layout over a random-access file
//!
//! Fixed-layout (de)serialization for the linear hash data file. The file is
//! a sequence of equally-sized bucket pages, appended as the table grows;
//! nothing in here knows about hashing or splitting.
//!
//! ## Bucket page layout
//!
//! ```text
//! [idx: u32 LE][record_count: u32 LE][overflow_location: u64 LE]
//! [status: u8][key: key_size][value: value_size]   * records_per_bucket
//! ```
//!
//! `overflow_location` is the file offset of the next bucket in the chain, or
//! [`NO_OVERFLOW`] at the end of the chain. Record status is one byte:
//! 0 = empty, 1 = occupied, 2 = tombstone.
//!
//! ## Position transparency
//!
//! Every read/write seeks to its target, performs the whole-header or
//! whole-record operation, and restores the file cursor to its prior
//! position. The single-threaded engine interleaves directory and record
//! access within one call and relies on this contract.
//!
//! There is no write-ahead log: a crash between the writes of one logical
//! operation (notably mid-split) can leave the table inconsistent.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use dict::DictError;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Sentinel offset marking the end of an overflow chain.
pub const NO_OVERFLOW: u64 = u64::MAX;

/// Size of the bucket header in bytes: 4 (`idx`) + 4 (`record_count`) +
/// 8 (`overflow_location`).
pub const BUCKET_HEADER_LEN: u64 = 4 + 4 + 8;

/// Occupancy state of a record slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordStatus {
    /// Never written.
    Empty = 0,
    /// Holds a live record.
    Occupied = 1,
    /// Deleted but not reclaimed; reusable by later inserts.
    Tombstone = 2,
}

impl RecordStatus {
    fn from_byte(byte: u8) -> Result<Self, DictError> {
        match byte {
            0 => Ok(RecordStatus::Empty),
            1 => Ok(RecordStatus::Occupied),
            2 => Ok(RecordStatus::Tombstone),
            _ => Err(DictError::IllegalState("unknown record status byte")),
        }
    }
}

/// In-memory form of a bucket page header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketHeader {
    /// Logical bucket index this page belongs to. Overflow pages carry the
    /// same index as their primary page.
    pub idx: u32,
    /// Live records in this physical page (occupied slots).
    pub record_count: u32,
    /// Offset of the next page in the chain, or [`NO_OVERFLOW`].
    pub overflow_location: u64,
}

impl BucketHeader {
    /// A fresh header for an empty page of bucket `idx`.
    #[must_use]
    pub fn new(idx: u32) -> Self {
        Self {
            idx,
            record_count: 0,
            overflow_location: NO_OVERFLOW,
        }
    }

    /// Returns `true` if another page follows in the chain.
    #[must_use]
    pub fn has_overflow(&self) -> bool {
        self.overflow_location != NO_OVERFLOW
    }
}

/// A record slot read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub status: RecordStatus,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Random-access bucket/record I/O over the data file.
///
/// Owns the file handle for the lifetime of the engine instance; the handle
/// is opened by [`create`](RecordStore::create) / [`open`](RecordStore::open)
/// and closed on drop.
#[derive(Debug)]
pub struct RecordStore {
    file: File,
    key_size: usize,
    value_size: usize,
    records_per_bucket: usize,
}

impl RecordStore {
    /// Creates a fresh data file at `path`, truncating any previous one.
    pub fn create(
        path: &Path,
        key_size: usize,
        value_size: usize,
        records_per_bucket: usize,
    ) -> Result<Self, DictError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(DictError::FileOpenError)?;
        Ok(Self {
            file,
            key_size,
            value_size,
            records_per_bucket,
        })
    }

    /// Opens an existing data file at `path`.
    pub fn open(
        path: &Path,
        key_size: usize,
        value_size: usize,
        records_per_bucket: usize,
    ) -> Result<Self, DictError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(DictError::FileOpenError)?;
        Ok(Self {
            file,
            key_size,
            value_size,
            records_per_bucket,
        })
    }

    #[must_use]
    pub fn key_size(&self) -> usize {
        self.key_size
    }

    #[must_use]
    pub fn value_size(&self) -> usize {
        self.value_size
    }

    #[must_use]
    pub fn records_per_bucket(&self) -> usize {
        self.records_per_bucket
    }

    /// Bytes occupied by one record slot: status + key + value.
    #[must_use]
    pub fn record_len(&self) -> u64 {
        1 + self.key_size as u64 + self.value_size as u64
    }

    /// Bytes occupied by one bucket page: header + all record slots.
    #[must_use]
    pub fn bucket_len(&self) -> u64 {
        BUCKET_HEADER_LEN + self.records_per_bucket as u64 * self.record_len()
    }

    /// File offset of slot `slot` inside the bucket page at `bucket_loc`.
    #[must_use]
    pub fn slot_loc(&self, bucket_loc: u64, slot: usize) -> u64 {
        bucket_loc + BUCKET_HEADER_LEN + slot as u64 * self.record_len()
    }

    /// Appends an empty bucket page for bucket `idx` at the end of the file
    /// and returns its offset.
    pub fn append_bucket(&mut self, idx: u32) -> Result<u64, DictError> {
        let mut page = Vec::with_capacity(self.bucket_len() as usize);
        let header = BucketHeader::new(idx);
        page.write_u32::<LittleEndian>(header.idx)
            .map_err(DictError::FileWriteError)?;
        page.write_u32::<LittleEndian>(header.record_count)
            .map_err(DictError::FileWriteError)?;
        page.write_u64::<LittleEndian>(header.overflow_location)
            .map_err(DictError::FileWriteError)?;
        // Empty slots are all-zero: status Empty plus blank key/value bytes.
        page.resize(self.bucket_len() as usize, 0);

        self.with_restored_position(|file| {
            let loc = file.seek(SeekFrom::End(0))?;
            file.write_all(&page)?;
            Ok(loc)
        })
        .map_err(DictError::FileWriteError)
    }

    /// Reads the bucket header at `loc`.
    pub fn read_header(&mut self, loc: u64) -> Result<BucketHeader, DictError> {
        self.with_restored_position(|file| {
            file.seek(SeekFrom::Start(loc))?;
            let idx = file.read_u32::<LittleEndian>()?;
            let record_count = file.read_u32::<LittleEndian>()?;
            let overflow_location = file.read_u64::<LittleEndian>()?;
            Ok(BucketHeader {
                idx,
                record_count,
                overflow_location,
            })
        })
        .map_err(DictError::FileReadError)
    }

    /// Writes the bucket header at `loc`.
    pub fn write_header(&mut self, loc: u64, header: &BucketHeader) -> Result<(), DictError> {
        let mut buf = [0u8; BUCKET_HEADER_LEN as usize];
        buf[0..4].copy_from_slice(&header.idx.to_le_bytes());
        buf[4..8].copy_from_slice(&header.record_count.to_le_bytes());
        buf[8..16].copy_from_slice(&header.overflow_location.to_le_bytes());
        self.with_restored_position(|file| {
            file.seek(SeekFrom::Start(loc))?;
            file.write_all(&buf)
        })
        .map_err(DictError::FileWriteError)
    }

    /// Reads the whole record slot at `loc`.
    pub fn read_record(&mut self, loc: u64) -> Result<StoredRecord, DictError> {
        let key_size = self.key_size;
        let value_size = self.value_size;
        let (status_byte, key, value) = self
            .with_restored_position(|file| {
                file.seek(SeekFrom::Start(loc))?;
                let status_byte = file.read_u8()?;
                let mut key = vec![0u8; key_size];
                file.read_exact(&mut key)?;
                let mut value = vec![0u8; value_size];
                file.read_exact(&mut value)?;
                Ok((status_byte, key, value))
            })
            .map_err(DictError::FileReadError)?;
        Ok(StoredRecord {
            status: RecordStatus::from_byte(status_byte)?,
            key,
            value,
        })
    }

    /// Reads only the status byte of the record slot at `loc`.
    ///
    /// Slot scans looking for free space use this instead of
    /// [`read_record`](Self::read_record) to avoid pulling key and value
    /// bytes they will never look at.
    pub fn read_status(&mut self, loc: u64) -> Result<RecordStatus, DictError> {
        let byte = self
            .with_restored_position(|file| {
                file.seek(SeekFrom::Start(loc))?;
                file.read_u8()
            })
            .map_err(DictError::FileReadError)?;
        RecordStatus::from_byte(byte)
    }

    /// Writes a whole record slot at `loc`.
    ///
    /// `key` and `value` must already have the configured sizes; the engine
    /// validates caller input before it gets here.
    pub fn write_record(
        &mut self,
        loc: u64,
        status: RecordStatus,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), DictError> {
        debug_assert_eq!(key.len(), self.key_size);
        debug_assert_eq!(value.len(), self.value_size);
        let mut buf = Vec::with_capacity(self.record_len() as usize);
        buf.push(status as u8);
        buf.extend_from_slice(key);
        buf.extend_from_slice(value);
        self.with_restored_position(|file| {
            file.seek(SeekFrom::Start(loc))?;
            file.write_all(&buf)
        })
        .map_err(DictError::FileWriteError)
    }

    /// Overwrites only the status byte of the record slot at `loc`.
    /// Tombstoning a record touches nothing else.
    pub fn write_status(&mut self, loc: u64, status: RecordStatus) -> Result<(), DictError> {
        self.with_restored_position(|file| {
            file.seek(SeekFrom::Start(loc))?;
            file.write_all(&[status as u8])
        })
        .map_err(DictError::FileWriteError)
    }

    /// Overwrites only the value bytes of the record slot at `loc`.
    pub fn write_value(&mut self, loc: u64, value: &[u8]) -> Result<(), DictError> {
        debug_assert_eq!(value.len(), self.value_size);
        let value_loc = loc + 1 + self.key_size as u64;
        self.with_restored_position(|file| {
            file.seek(SeekFrom::Start(value_loc))?;
            file.write_all(value)
        })
        .map_err(DictError::FileWriteError)
    }

    /// Flushes file contents to disk via `sync_all`.
    pub fn sync_to_disk(&mut self) -> Result<(), DictError> {
        self.file.flush().map_err(DictError::FileWriteError)?;
        self.file.sync_all().map_err(DictError::FileWriteError)
    }

    /// Runs `op` against the file, restoring the stream position afterwards
    /// whether or not `op` succeeded.
    fn with_restored_position<T>(
        &mut self,
        op: impl FnOnce(&mut File) -> io::Result<T>,
    ) -> io::Result<T> {
        let prior = self.file.stream_position()?;
        let out = op(&mut self.file);
        let restored = self.file.seek(SeekFrom::Start(prior));
        let value = out?;
        restored?;
        Ok(value)
    }
}
