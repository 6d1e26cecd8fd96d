//! Dictionary capability bindings.
//!
//! Forwards the [`dict::Dictionary`] surface to the engine's inherent
//! operations, so the dispatch layer can drive a linear hash table through
//! the same trait as any other engine.

use crate::{LinearHashCursor, LinearHashTable};
use dict::{Cursor, CursorStatus, DictError, Dictionary, Predicate, Record};

impl Dictionary for LinearHashTable {
    type Cursor<'a>
        = LinearHashCursor<'a>
    where
        Self: 'a;

    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<usize, DictError> {
        LinearHashTable::insert(self, key, value)
    }

    fn get(&mut self, key: &[u8]) -> Result<Vec<u8>, DictError> {
        LinearHashTable::get(self, key)
    }

    fn update(&mut self, key: &[u8], value: &[u8]) -> Result<usize, DictError> {
        LinearHashTable::update(self, key, value)
    }

    fn remove(&mut self, key: &[u8]) -> Result<usize, DictError> {
        self.delete(key)
    }

    fn find(&mut self, predicate: Predicate) -> Result<LinearHashCursor<'_>, DictError> {
        LinearHashCursor::build(self, predicate)
    }
}

impl Cursor for LinearHashCursor<'_> {
    fn status(&self) -> CursorStatus {
        LinearHashCursor::status(self)
    }

    fn next(&mut self) -> Result<Option<Record>, DictError> {
        LinearHashCursor::next(self)
    }
}
