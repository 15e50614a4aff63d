//! Data storage and persistence
//!
//! The ledger only needs a byte-keyed record store with one atomic
//! multi-write operation. [`SledStore`] is the on-disk backend; [`MemoryStore`]
//! keeps everything in a shared map and is what the unit tests run against.

pub mod memory;
pub mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

use crate::error::Result;

/// A set of writes applied all-or-nothing by [`KeyValueStore::write_batch`].
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    writes: Vec<(Vec<u8>, Vec<u8>)>,
}

impl WriteBatch {
    pub fn new() -> WriteBatch {
        WriteBatch::default()
    }

    pub fn put(mut self, key: &[u8], value: &[u8]) -> WriteBatch {
        self.writes.push((key.to_vec(), value.to_vec()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn writes(&self) -> &[(Vec<u8>, Vec<u8>)] {
        self.writes.as_slice()
    }
}

pub trait KeyValueStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Apply every write in `batch` or none of them. Readers never observe a
    /// partially applied batch.
    fn write_batch(&self, batch: WriteBatch) -> Result<()>;

    /// Human-readable description of where the records live, for error messages.
    fn location(&self) -> String;
}
