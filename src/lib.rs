//! # UTXO Ledger
//!
//! A single-node, append-only ledger. Blocks are hash-chained and admitted by
//! proof-of-work; value moves between addresses under the unspent transaction
//! output model, with every input signed by ECDSA P-256.
//!
//! Nothing but blocks and a head pointer is persisted. Balances, spendable
//! outputs and the spent set are all derived by walking the chain from the
//! head back to genesis.
//!
//! ## Layout
//! - `core/`: blocks, transactions, proof-of-work and the [`Ledger`] itself
//! - `storage/`: the [`KeyValueStore`] boundary with sled and in-memory backends
//! - `wallet/`: key pairs, addresses and the wallet file
//! - `utils/`: hashing, signatures and bincode helpers
//! - `config/`, `cli/`: what the `utxo-ledger` binary needs
//!
//! ## Example
//! ```no_run
//! use utxo_ledger::{Ledger, Transaction, Wallet};
//!
//! # fn main() -> utxo_ledger::Result<()> {
//! let alice = Wallet::new()?;
//! let bob = Wallet::new()?;
//! let mut ledger = Ledger::init_at("./data/blocks", &alice.get_pub_key_hash())?;
//!
//! let tx = Transaction::new_transfer(&alice, &bob.get_pub_key_hash(), 30, &ledger)?;
//! ledger.add_block(&[tx])?;
//! assert_eq!(ledger.get_balance(&bob.get_pub_key_hash())?, 30);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testkit;

pub use cli::{Command, Opt};
pub use config::Config;
pub use core::{
    Block, Ledger, LedgerIterator, OutPoint, ProofOfWork, Transaction, TxInput, TxOutput,
    UnspentOutput, SUBSIDY, TARGET_BITS,
};
pub use error::{LedgerError, Result};
pub use storage::{KeyValueStore, MemoryStore, SledStore, WriteBatch};
pub use utils::{
    base58_decode, base58_encode, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    new_key_pair, ripemd160_digest, sha256_digest,
};
pub use wallet::{
    address_to_pub_key_hash, convert_address, hash_pub_key, validate_address, Wallet, Wallets,
    ADDRESS_CHECK_SUM_LEN,
};
