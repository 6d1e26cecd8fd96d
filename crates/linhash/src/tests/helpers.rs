use crate::{LinearHashConfig, LinearHashTable};
use std::path::Path;

/// Default config: signed 4-byte int keys, 8-byte values, 4 initial buckets,
/// 85% split threshold, 4 records per bucket.
pub fn int_config() -> LinearHashConfig {
    LinearHashConfig::default()
}

pub fn new_table(dir: &Path) -> LinearHashTable {
    LinearHashTable::init(dir, 1, int_config()).unwrap()
}

pub fn key(n: i32) -> [u8; 4] {
    n.to_le_bytes()
}

pub fn val(n: i64) -> [u8; 8] {
    n.to_le_bytes()
}
