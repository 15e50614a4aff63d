use crate::core::{ProofOfWork, Transaction, TARGET_BITS};
use crate::error::{LedgerError, Result};
use crate::utils::{deserialize, serialize, sha256_digest};
use data_encoding::HEXLOWER;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    hash: Vec<u8>,
    transactions: Vec<Transaction>,
    prev_hash: Vec<u8>,
    nonce: u64,
}

impl Block {
    /// Mine a block over `transactions` chained to `prev_hash`.
    pub fn new_block(transactions: &[Transaction], prev_hash: &[u8]) -> Result<Block> {
        Self::new_block_with_target_bits(transactions, prev_hash, TARGET_BITS)
    }

    /// Same as [`Block::new_block`] at an explicit difficulty. Blocks mined
    /// below [`TARGET_BITS`] are not admissible to a ledger.
    pub fn new_block_with_target_bits(
        transactions: &[Transaction],
        prev_hash: &[u8],
        target_bits: u32,
    ) -> Result<Block> {
        let mut block = Self::unmined(transactions, prev_hash)?;

        let pow = ProofOfWork::with_target_bits(&block, target_bits)?;
        let (nonce, hash) = pow.run()?;
        block.nonce = nonce;
        block.hash = hash;
        info!(
            "Mined block {} with {} transactions (nonce {nonce})",
            HEXLOWER.encode(&block.hash),
            block.transactions.len()
        );

        Ok(block)
    }

    /// A block with nonce 0 and no hash yet, ready for a proof-of-work search.
    pub fn unmined(transactions: &[Transaction], prev_hash: &[u8]) -> Result<Block> {
        if transactions.is_empty() {
            return Err(LedgerError::InvalidBlock(
                "Block must contain at least one transaction".to_string(),
            ));
        }
        Ok(Block {
            hash: vec![],
            transactions: transactions.to_vec(),
            prev_hash: prev_hash.to_vec(),
            nonce: 0,
        })
    }

    pub fn generate_genesis_block(coinbase: &Transaction) -> Result<Block> {
        Block::new_block(std::slice::from_ref(coinbase), &[])
    }

    /// SHA-256 over the concatenated transaction ids, in block order.
    pub fn hash_transactions(&self) -> Vec<u8> {
        let mut tx_hashes = vec![];
        for transaction in &self.transactions {
            tx_hashes.extend(transaction.get_id());
        }
        sha256_digest(tx_hashes.as_slice())
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_prev_hash(&self) -> &[u8] {
        self.prev_hash.as_slice()
    }

    pub fn get_hash(&self) -> &[u8] {
        self.hash.as_slice()
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coinbase(tag: u8) -> Transaction {
        Transaction::new_coinbase_tx(&[tag; 20], "").unwrap()
    }

    #[test]
    fn test_genesis_block() {
        let block = Block::generate_genesis_block(&coinbase(1)).unwrap();

        assert!(block.is_genesis());
        assert_eq!(block.get_transactions().len(), 1);
        assert_eq!(block.get_hash().len(), 32);
        assert!(ProofOfWork::validate(&block));
    }

    #[test]
    fn test_empty_block_rejected() {
        match Block::new_block(&[], &[1u8; 32]) {
            Err(LedgerError::InvalidBlock(_)) => {}
            other => panic!("expected InvalidBlock, got {other:?}"),
        }
    }

    #[test]
    fn test_hash_transactions_is_order_sensitive() {
        let (a, b) = (coinbase(1), coinbase(2));
        let forward = Block::unmined(&[a.clone(), b.clone()], &[]).unwrap();
        let backward = Block::unmined(&[b, a], &[]).unwrap();

        assert_ne!(forward.hash_transactions(), backward.hash_transactions());
    }

    #[test]
    fn test_serialization_round_trip_revalidates() {
        let genesis = Block::generate_genesis_block(&coinbase(3)).unwrap();
        let block = Block::new_block(&[coinbase(4), coinbase(5)], genesis.get_hash()).unwrap();

        let bytes = block.serialize().unwrap();
        let decoded = Block::deserialize(&bytes).unwrap();

        assert_eq!(decoded, block);
        assert_eq!(decoded.serialize().unwrap(), bytes);
        assert_eq!(decoded.get_prev_hash(), genesis.get_hash());
        assert!(ProofOfWork::validate(&decoded));
    }
}
