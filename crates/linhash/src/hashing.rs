//! Key hashing and bucket routing.
//!
//! Numeric keys hash as their little-endian integer value; byte-string keys
//! use the sdbm string hash. Routing uses the two classical linear-hashing
//! functions: `h0 = hash mod N` and `h1 = hash mod 2N`, where N is the
//! current generation size.

use crate::LinearHashTable;
use dict::KeyType;

/// Hashes a key according to its type.
pub(crate) fn hash_key(key: &[u8], key_type: KeyType) -> u32 {
    match key_type {
        KeyType::NumericSigned | KeyType::NumericUnsigned => int_hash(key),
        KeyType::CharArray => sdbm_hash(key),
    }
}

/// Integer keys hash as themselves: the little-endian value of the first
/// four key bytes (shorter keys are zero-extended).
fn int_hash(key: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    let n = key.len().min(4);
    buf[..n].copy_from_slice(&key[..n]);
    u32::from_le_bytes(buf)
}

/// sdbm hash: `hash = byte + (hash << 6) + (hash << 16) - hash`.
fn sdbm_hash(key: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    for &byte in key {
        hash = u32::from(byte)
            .wrapping_add(hash << 6)
            .wrapping_add(hash << 16)
            .wrapping_sub(hash);
    }
    hash
}

impl LinearHashTable {
    /// Split-aware routing shared by every operation.
    ///
    /// `h0 = hash mod N`; a bucket below `next_split` has already been
    /// divided this round, so keys landing there are rerouted through
    /// `h1 = hash mod 2N`. Inserts and lookups use the same address — a
    /// record placed under one rule and searched under another would be
    /// stranded until the next growth round.
    pub(crate) fn hash_to_bucket(&self, key: &[u8]) -> u32 {
        let hash = hash_key(key, self.key_type);
        let h0 = hash % self.initial_size;
        if h0 < self.next_split {
            hash % (2 * self.initial_size)
        } else {
            h0
        }
    }
}
