//! Engine state persistence — the `<id>.lhs` file.
//!
//! Written by `close` (and best-effort on drop), read by `open`. The data
//! file alone is not self-describing: bucket count, split pointer, and the
//! directory all live here.
//!
//! ## Layout (magic `LHS1`, `0x4C48_5331`)
//!
//! ```text
//! [magic: u32 LE]
//! [key_type: u8][key_size: u32][value_size: u32][records_per_bucket: u32]
//! [initial_size: u32][next_split: u32][split_threshold: u32]
//! [num_buckets: u32][num_records: u64]
//! [directory: len-prefixed entries]
//! [crc32: u32 LE]           over everything after the magic
//! ```

use crate::{LinearHashConfig, LinearHashTable};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use dict::{state_filename, DictError, DictionaryId, KeyType};
use directory::BucketDirectory;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use store::RecordStore;
use tracing::debug;

/// Magic number identifying a linear hash state file (ASCII "LHS1").
pub(crate) const STATE_MAGIC: u32 = 0x4C48_5331;

fn key_type_to_byte(key_type: KeyType) -> u8 {
    match key_type {
        KeyType::NumericSigned => 0,
        KeyType::NumericUnsigned => 1,
        KeyType::CharArray => 2,
    }
}

fn key_type_from_byte(byte: u8) -> Result<KeyType, DictError> {
    match byte {
        0 => Ok(KeyType::NumericSigned),
        1 => Ok(KeyType::NumericUnsigned),
        2 => Ok(KeyType::CharArray),
        _ => Err(DictError::IllegalState("unknown key type in state file")),
    }
}

impl LinearHashTable {
    /// Serializes the engine state and directory to `<id>.lhs`, replacing
    /// any previous state file.
    pub(crate) fn save_state(&self) -> Result<(), DictError> {
        let mut payload = Vec::new();
        payload.push(key_type_to_byte(self.key_type));
        payload
            .write_u32::<LittleEndian>(self.key_size() as u32)
            .map_err(DictError::FileWriteError)?;
        payload
            .write_u32::<LittleEndian>(self.value_size() as u32)
            .map_err(DictError::FileWriteError)?;
        payload
            .write_u32::<LittleEndian>(self.records_per_bucket() as u32)
            .map_err(DictError::FileWriteError)?;
        payload
            .write_u32::<LittleEndian>(self.initial_size)
            .map_err(DictError::FileWriteError)?;
        payload
            .write_u32::<LittleEndian>(self.next_split)
            .map_err(DictError::FileWriteError)?;
        payload
            .write_u32::<LittleEndian>(self.split_threshold)
            .map_err(DictError::FileWriteError)?;
        payload
            .write_u32::<LittleEndian>(self.num_buckets)
            .map_err(DictError::FileWriteError)?;
        payload
            .write_u64::<LittleEndian>(self.num_records)
            .map_err(DictError::FileWriteError)?;
        self.directory.save_to(&mut payload)?;

        let mut hasher = Crc32::new();
        hasher.update(&payload);
        let crc = hasher.finalize();

        let mut file = File::create(self.state_path()).map_err(DictError::FileOpenError)?;
        file.write_u32::<LittleEndian>(STATE_MAGIC)
            .map_err(DictError::FileWriteError)?;
        file.write_all(&payload).map_err(DictError::FileWriteError)?;
        file.write_u32::<LittleEndian>(crc)
            .map_err(DictError::FileWriteError)?;
        file.sync_all().map_err(DictError::FileWriteError)?;

        debug!(
            "saved state for table {}: {} buckets, {} records",
            self.id, self.num_buckets, self.num_records
        );
        Ok(())
    }

    /// Restores a table previously persisted by [`close`](Self::close):
    /// validates the state file's magic and checksum, rebuilds the engine
    /// state and directory, and re-opens the data file.
    ///
    /// # Errors
    ///
    /// [`DictError::FileOpenError`] if either backing file is missing,
    /// [`DictError::IllegalState`] for a foreign or corrupt state file.
    pub fn open(base: &Path, id: DictionaryId) -> Result<Self, DictError> {
        let state_path = base.join(state_filename(id));
        let mut file = File::open(&state_path).map_err(DictError::FileOpenError)?;

        let magic = file
            .read_u32::<LittleEndian>()
            .map_err(DictError::FileReadError)?;
        if magic != STATE_MAGIC {
            return Err(DictError::IllegalState("not a linear hash state file"));
        }

        let mut rest = Vec::new();
        file.read_to_end(&mut rest).map_err(DictError::FileReadError)?;
        if rest.len() < 4 {
            return Err(DictError::IllegalState("state file truncated"));
        }
        let (payload, crc_bytes) = rest.split_at(rest.len() - 4);
        let stored_crc = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

        let mut hasher = Crc32::new();
        hasher.update(payload);
        if hasher.finalize() != stored_crc {
            return Err(DictError::IllegalState("state file checksum mismatch"));
        }

        let mut r = payload;
        let key_type = key_type_from_byte(r.read_u8().map_err(DictError::FileReadError)?)?;
        let key_size = r
            .read_u32::<LittleEndian>()
            .map_err(DictError::FileReadError)? as usize;
        let value_size = r
            .read_u32::<LittleEndian>()
            .map_err(DictError::FileReadError)? as usize;
        let records_per_bucket = r
            .read_u32::<LittleEndian>()
            .map_err(DictError::FileReadError)? as usize;
        let initial_size = r
            .read_u32::<LittleEndian>()
            .map_err(DictError::FileReadError)?;
        let next_split = r
            .read_u32::<LittleEndian>()
            .map_err(DictError::FileReadError)?;
        let split_threshold = r
            .read_u32::<LittleEndian>()
            .map_err(DictError::FileReadError)?;
        let num_buckets = r
            .read_u32::<LittleEndian>()
            .map_err(DictError::FileReadError)?;
        let num_records = r
            .read_u64::<LittleEndian>()
            .map_err(DictError::FileReadError)?;
        let directory = BucketDirectory::load_from(&mut r)?;

        // The checksummed fields still have to agree with each other.
        let config = LinearHashConfig {
            key_type,
            key_size,
            value_size,
            initial_size,
            split_threshold,
            records_per_bucket,
        };
        config.validate()?;
        if directory.len() != num_buckets as usize {
            return Err(DictError::IllegalState(
                "directory length disagrees with bucket count",
            ));
        }

        let data_path = base.join(dict::data_filename(id));
        let store = RecordStore::open(&data_path, key_size, value_size, records_per_bucket)?;

        debug!(
            "opened table {}: {} buckets, {} records, next split {}",
            id, num_buckets, num_records, next_split
        );

        Ok(Self {
            id,
            base: base.to_path_buf(),
            key_type,
            initial_size,
            next_split,
            split_threshold,
            num_buckets,
            num_records,
            store,
            directory,
            persisted: true,
        })
    }
}
