use crate::error::{LedgerError, Result};
use crate::utils::{deserialize, serialize};
use crate::wallet::Wallet;
use log::{debug, info};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Wallets keyed by address, backed by one bincode file.
pub struct Wallets {
    wallets: HashMap<String, Wallet>,
    path: PathBuf,
}

impl Wallets {
    /// Load the wallet file at `path`. A missing file is an empty collection.
    pub fn load(path: impl AsRef<Path>) -> Result<Wallets> {
        let path = path.as_ref().to_path_buf();
        let mut wallets = Wallets {
            wallets: HashMap::new(),
            path,
        };
        if !wallets.path.exists() {
            debug!("No wallet file at {}", wallets.path.display());
            return Ok(wallets);
        }

        let mut file = File::open(&wallets.path)?;
        let mut buf = vec![];
        file.read_to_end(&mut buf)?;
        wallets.wallets = deserialize(&buf[..]).map_err(|e| {
            LedgerError::Wallet(format!(
                "Could not read wallet file {}: {e}",
                wallets.path.display()
            ))
        })?;
        Ok(wallets)
    }

    /// Generate a wallet, persist the collection and return its address.
    pub fn create_wallet(&mut self) -> Result<String> {
        let wallet = Wallet::new()?;
        let address = wallet.get_address();
        self.wallets.insert(address.clone(), wallet);
        self.save()?;
        info!("Created wallet {address}");
        Ok(address)
    }

    pub fn get_addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.wallets.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn get_wallet(&self, address: &str) -> Option<&Wallet> {
        self.wallets.get(address)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        let wallets_bytes = serialize(&self.wallets)?;
        writer.write_all(wallets_bytes.as_slice())?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let wallets = Wallets::load(dir.path().join("wallets.dat")).unwrap();
        assert!(wallets.get_addresses().is_empty());
    }

    #[test]
    fn test_created_wallets_survive_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("wallets.dat");

        let mut wallets = Wallets::load(&path).unwrap();
        let first = wallets.create_wallet().unwrap();
        let second = wallets.create_wallet().unwrap();

        let reloaded = Wallets::load(&path).unwrap();
        let addresses = reloaded.get_addresses();
        assert_eq!(addresses.len(), 2);
        assert!(addresses.contains(&first));
        assert!(addresses.contains(&second));

        let original = wallets.get_wallet(&first).unwrap();
        let restored = reloaded.get_wallet(&first).unwrap();
        assert_eq!(original.get_pkcs8(), restored.get_pkcs8());
        assert_eq!(original.get_public_key(), restored.get_public_key());
        assert!(reloaded.get_wallet("unknown").is_none());
    }

    #[test]
    fn test_garbage_file_is_a_wallet_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallets.dat");
        fs::write(&path, [0xffu8; 7]).unwrap();

        match Wallets::load(&path) {
            Err(LedgerError::Wallet(_)) => {}
            Err(e) => panic!("expected Wallet error, got {e:?}"),
            Ok(_) => panic!("garbage should not decode"),
        }
    }
}
