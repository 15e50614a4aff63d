//! Helpers shared by the unit tests.

use crate::core::Ledger;
use crate::storage::MemoryStore;
use crate::wallet::Wallet;

pub fn pub_key_hash_of(wallet: &Wallet) -> Vec<u8> {
    wallet.get_pub_key_hash()
}

/// An in-memory ledger whose genesis subsidy belongs to the returned wallet.
pub fn funded_ledger() -> (Ledger<MemoryStore>, Wallet) {
    let wallet = Wallet::new().unwrap();
    let ledger = Ledger::init(MemoryStore::new(), &pub_key_hash_of(&wallet)).unwrap();
    (ledger, wallet)
}
