use crate::error::{LedgerError, Result};
use crate::storage::{KeyValueStore, WriteBatch};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Records = HashMap<Vec<u8>, Vec<u8>>;

/// In-process store. Clones share the same records, so a second ledger
/// handle can be opened over the same data.
#[derive(Default, Clone, Debug)]
pub struct MemoryStore {
    records: Arc<RwLock<Records>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Records>> {
        self.records
            .read()
            .map_err(|e| LedgerError::StoreUnavailable(format!("Memory store poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Records>> {
        self.records
            .write()
            .map_err(|e| LedgerError::StoreUnavailable(format!("Memory store poisoned: {e}")))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write()?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        // One write guard for the whole batch.
        let mut records = self.write()?;
        records.reserve(batch.len());
        for (key, value) in batch.writes() {
            records.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_records() {
        let store = MemoryStore::new();
        let other = store.clone();

        store
            .write_batch(WriteBatch::new().put(b"a", b"1").put(b"b", b"2"))
            .unwrap();

        assert_eq!(other.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(other.get(b"b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(other.len().unwrap(), 2);
    }

    #[test]
    fn test_batch_len_counts_duplicate_keys() {
        let store = MemoryStore::new();
        let batch = WriteBatch::new().put(b"lh", b"old").put(b"lh", b"new");
        assert_eq!(batch.len(), 2);

        store.write_batch(batch).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.get(b"lh").unwrap(), Some(b"new".to_vec()));

        store.write_batch(WriteBatch::new()).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_set_overwrites() {
        let store = MemoryStore::new();
        assert!(store.is_empty().unwrap());
        store.set(b"lh", b"old").unwrap();
        store.set(b"lh", b"new").unwrap();
        assert_eq!(store.get(b"lh").unwrap(), Some(b"new".to_vec()));
    }
}
