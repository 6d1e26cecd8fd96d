//! Split controller: load-factor tracking and the incremental split.
//!
//! A split divides exactly one bucket — the one `next_split` points at —
//! between itself and a freshly appended bucket, bounding the work any
//! single insert can trigger to one chain plus one page append. The split
//! runs synchronously inside the triggering insert; there is no background
//! thread.

use crate::hashing;
use crate::LinearHashTable;
use dict::DictError;
use store::RecordStatus;
use tracing::debug;

/// One live record captured before the split starts mutating the chain.
struct SnapshotRecord {
    bucket_loc: u64,
    slot_loc: u64,
    key: Vec<u8>,
    value: Vec<u8>,
}

impl LinearHashTable {
    /// Returns `true` once the load factor exceeds the split threshold:
    /// `100 * num_records / (num_buckets * records_per_bucket) > threshold`,
    /// evaluated by integer cross-multiplication.
    pub(crate) fn above_threshold(&self) -> bool {
        let capacity = u64::from(self.num_buckets) * self.records_per_bucket() as u64;
        100 * self.num_records > u64::from(self.split_threshold) * capacity
    }

    /// Split check run at the end of every insert: if the threshold was
    /// crossed, append one new primary bucket and divide the bucket at
    /// `next_split` into it. Exactly one split per crossing.
    pub(crate) fn maybe_split(&mut self) -> Result<(), DictError> {
        if !self.above_threshold() {
            return Ok(());
        }

        let new_idx = self.num_buckets;
        let loc = self.store.append_bucket(new_idx)?;
        self.directory.set(new_idx, loc)?;
        self.num_buckets += 1;

        self.split()
    }

    /// Divides bucket `next_split` between itself and the bucket appended
    /// by [`maybe_split`], then advances the split pointer (doubling the
    /// generation and resetting the pointer when the round completes).
    ///
    /// The chain is snapshotted — records plus their slot locations —
    /// before any mutation. Each record's post-growth home is
    /// `h1 = hash mod 2N`: either the source bucket (stays put, no I/O) or
    /// the new bucket (old slot tombstoned, record re-inserted through the
    /// normal slot scan). `num_records` is net-unchanged and no nested
    /// split check runs during the migration.
    fn split(&mut self) -> Result<(), DictError> {
        let source = self.next_split;
        let generation = self.initial_size;
        debug_assert_eq!(self.num_buckets, generation + source + 1);

        let records = self.snapshot_chain(source)?;

        let mut migrated = 0usize;
        for record in &records {
            let home = hashing::hash_key(&record.key, self.key_type) % (2 * generation);
            if home == source {
                continue;
            }

            self.store
                .write_status(record.slot_loc, RecordStatus::Tombstone)?;
            let mut header = self.store.read_header(record.bucket_loc)?;
            header.record_count = header
                .record_count
                .checked_sub(1)
                .ok_or(DictError::IllegalState("bucket record count underflow"))?;
            self.store.write_header(record.bucket_loc, &header)?;

            self.insert_into_bucket(home, &record.key, &record.value)?;
            migrated += 1;
        }

        debug!(
            "split bucket {}: {} of {} records migrated to bucket {}",
            source,
            migrated,
            records.len(),
            source + generation
        );

        self.next_split += 1;
        if self.next_split == generation {
            self.initial_size = generation * 2;
            self.next_split = 0;
            debug!(
                "growth round complete, generation size now {}",
                self.initial_size
            );
        }
        self.persisted = false;
        Ok(())
    }

    /// Collects every occupied record in bucket `idx`'s chain (primary page
    /// plus all overflow pages), remembering where each one lives.
    /// Tombstones are skipped — a split is the one pass that sheds them.
    fn snapshot_chain(&mut self, idx: u32) -> Result<Vec<SnapshotRecord>, DictError> {
        let mut records = Vec::new();
        let mut bucket_loc = self.directory.get(idx)?;

        loop {
            let header = self.store.read_header(bucket_loc)?;
            for slot in 0..self.records_per_bucket() {
                let slot_loc = self.store.slot_loc(bucket_loc, slot);
                let record = self.store.read_record(slot_loc)?;
                if record.status == RecordStatus::Occupied {
                    records.push(SnapshotRecord {
                        bucket_loc,
                        slot_loc,
                        key: record.key,
                        value: record.value,
                    });
                }
            }
            if !header.has_overflow() {
                return Ok(records);
            }
            bucket_loc = header.overflow_location;
        }
    }
}
