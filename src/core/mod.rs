//! Core ledger functionality
//!
//! Blocks, transactions, the proof-of-work admission rule and the ledger
//! that chains blocks together and derives balances from them.

pub mod block;
pub mod ledger;
pub mod proof_of_work;
pub mod transaction;

pub use block::Block;
pub use ledger::{
    verify_chain, Ledger, LedgerIterator, OutPoint, UnspentOutput, GENESIS_MEMO, HEAD_HASH_KEY,
};
pub use proof_of_work::{ProofOfWork, MAX_NONCE, TARGET_BITS};
pub use transaction::{
    PreviousTransactions, Transaction, TxInput, TxOutput, COINBASE_OUTPUT_INDEX, SUBSIDY,
};
