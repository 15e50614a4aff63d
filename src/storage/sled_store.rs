use crate::error::{LedgerError, Result};
use crate::storage::{KeyValueStore, WriteBatch};
use log::debug;
use sled::{Db, Tree};
use std::path::{Path, PathBuf};

// All ledger records live in one tree: block hashes plus the head key.
const BLOCKS_TREE: &str = "blocks";

#[derive(Clone)]
pub struct SledStore {
    db: Db,
    tree: Tree,
    path: PathBuf,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<SledStore> {
        let path = path.as_ref().to_path_buf();
        let db = sled::open(&path).map_err(|e| {
            LedgerError::StoreUnavailable(format!(
                "Failed to open database at {}: {e}",
                path.display()
            ))
        })?;
        let tree = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| LedgerError::StoreUnavailable(format!("Failed to open blocks tree: {e}")))?;
        debug!("Opened sled store at {}", path.display());
        Ok(SledStore { db, tree, path })
    }

    pub fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| LedgerError::StoreUnavailable(format!("Failed to flush database: {e}")))?;
        Ok(())
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self
            .tree
            .get(key)
            .map_err(|e| LedgerError::StoreUnavailable(format!("Failed to read record: {e}")))?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.tree
            .insert(key, value)
            .map_err(|e| LedgerError::StoreUnavailable(format!("Failed to write record: {e}")))?;
        self.flush()
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        debug!("Applying {} writes to {}", batch.len(), self.path.display());
        self.tree
            .transaction(|tx_db| {
                for (key, value) in batch.writes() {
                    tx_db.insert(key.as_slice(), value.as_slice())?;
                }
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError| {
                LedgerError::StoreUnavailable(format!("Failed to apply write batch: {e:?}"))
            })?;
        self.flush()
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
