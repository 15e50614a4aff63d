use crate::core::Block;
use crate::error::{LedgerError, Result};
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use log::debug;
use num_bigint::{BigInt, Sign};
use std::ops::ShlAssign;
use std::sync::atomic::{AtomicBool, Ordering};

/// Difficulty of the ledger: a block hash must be below `2^(256 - TARGET_BITS)`.
/// This is a protocol constant, never adjusted at runtime.
pub const TARGET_BITS: u32 = 12;

/// Upper bound of the nonce search.
pub const MAX_NONCE: u64 = u64::MAX;

pub struct ProofOfWork<'a> {
    block: &'a Block,
    target: BigInt,
    target_bits: u32,
    max_nonce: u64,
    tx_hash: Vec<u8>,
}

impl<'a> ProofOfWork<'a> {
    pub fn new(block: &'a Block) -> ProofOfWork<'a> {
        Self::build(block, TARGET_BITS)
    }

    /// Search at another difficulty (1..=255). Used for building blocks in tests.
    pub fn with_target_bits(block: &'a Block, target_bits: u32) -> Result<ProofOfWork<'a>> {
        if !(1..=255).contains(&target_bits) {
            return Err(LedgerError::InvalidBlock(format!(
                "Target bits must be within 1..=255, got {target_bits}"
            )));
        }
        Ok(Self::build(block, target_bits))
    }

    fn build(block: &'a Block, target_bits: u32) -> ProofOfWork<'a> {
        let mut target = BigInt::from(1);
        target.shl_assign(256 - target_bits);
        ProofOfWork {
            block,
            target,
            target_bits,
            max_nonce: MAX_NONCE,
            tx_hash: block.hash_transactions(),
        }
    }

    /// Stop the search once `max_nonce` has been tried.
    pub fn with_max_nonce(mut self, max_nonce: u64) -> ProofOfWork<'a> {
        self.max_nonce = max_nonce;
        self
    }

    /// Check a stored block against the ledger difficulty.
    pub fn validate(block: &Block) -> bool {
        ProofOfWork::new(block).is_valid()
    }

    /// Recompute the hash at the block's stored nonce and compare it with
    /// both the target and the stored hash.
    pub fn is_valid(&self) -> bool {
        let hash = sha256_digest(self.prepare_data(self.block.get_nonce()).as_slice());
        self.meets_target(&hash) && hash.as_slice() == self.block.get_hash()
    }

    fn meets_target(&self, hash: &[u8]) -> bool {
        BigInt::from_bytes_be(Sign::Plus, hash) < self.target
    }

    /// `prev_hash ‖ hash_transactions ‖ u64be(nonce) ‖ u64be(target_bits)`
    fn prepare_data(&self, nonce: u64) -> Vec<u8> {
        let mut data_bytes = vec![];
        data_bytes.extend(self.block.get_prev_hash());
        data_bytes.extend(self.tx_hash.as_slice());
        data_bytes.extend(nonce.to_be_bytes());
        data_bytes.extend(u64::from(self.target_bits).to_be_bytes());
        data_bytes
    }

    /// Brute-force the first nonce from 0 upward whose hash meets the target.
    pub fn run(&self) -> Result<(u64, Vec<u8>)> {
        self.search(|| false)
    }

    /// Like [`ProofOfWork::run`], checking `stop` between attempts.
    pub fn run_until(&self, stop: &AtomicBool) -> Result<(u64, Vec<u8>)> {
        self.search(|| stop.load(Ordering::Relaxed))
    }

    fn search(&self, should_stop: impl Fn() -> bool) -> Result<(u64, Vec<u8>)> {
        let mut nonce = 0u64;
        loop {
            if should_stop() {
                return Err(LedgerError::MiningCancelled);
            }

            let hash = sha256_digest(self.prepare_data(nonce).as_slice());
            if self.meets_target(&hash) {
                debug!("Found nonce {nonce}: {}", HEXLOWER.encode(&hash));
                return Ok((nonce, hash));
            }

            if nonce >= self.max_nonce {
                return Err(LedgerError::ProofOfWorkExhausted {
                    max_nonce: self.max_nonce,
                });
            }
            nonce += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;

    fn unmined_block() -> Block {
        let coinbase = Transaction::new_coinbase_tx(&[1u8; 20], "").unwrap();
        Block::unmined(&[coinbase], &[]).unwrap()
    }

    #[test]
    fn test_mined_block_validates_at_its_difficulty() {
        let coinbase = Transaction::new_coinbase_tx(&[2u8; 20], "").unwrap();
        for bits in [1, 4, 8] {
            let block = Block::new_block_with_target_bits(
                std::slice::from_ref(&coinbase),
                &[9u8; 32],
                bits,
            )
            .unwrap();
            let pow = ProofOfWork::with_target_bits(&block, bits).unwrap();
            assert!(pow.is_valid(), "block mined at {bits} bits should validate");
        }
    }

    #[test]
    fn test_higher_difficulty_has_smaller_target() {
        let block = unmined_block();
        let easy = ProofOfWork::with_target_bits(&block, 1).unwrap();
        let hard = ProofOfWork::with_target_bits(&block, 2).unwrap();
        assert!(hard.target < easy.target);
        assert!(easy.target > BigInt::from(0));
    }

    #[test]
    fn test_first_satisfying_nonce_wins() {
        let block = unmined_block();
        let pow = ProofOfWork::with_target_bits(&block, 6).unwrap();
        let (nonce, _) = pow.run().unwrap();

        for earlier in 0..nonce {
            let hash = sha256_digest(pow.prepare_data(earlier).as_slice());
            assert!(!pow.meets_target(&hash));
        }
    }

    #[test]
    fn test_forged_hash_fails_validation() {
        let coinbase = Transaction::new_coinbase_tx(&[3u8; 20], "").unwrap();
        let block = Block::new_block(&[coinbase], &[]).unwrap();
        assert!(ProofOfWork::validate(&block));

        let mut bytes = block.serialize().unwrap();
        // Swap in the hash of a different block.
        let other = Block::new_block(&[Transaction::new_coinbase_tx(&[4u8; 20], "").unwrap()], &[])
            .unwrap();
        let position = bytes
            .windows(32)
            .position(|w| w == block.get_hash())
            .unwrap();
        bytes[position..position + 32].copy_from_slice(other.get_hash());
        let forged = Block::deserialize(&bytes).unwrap();

        assert!(!ProofOfWork::validate(&forged));
    }

    #[test]
    fn test_exhausted_nonce_space_is_an_error() {
        let block = unmined_block();
        let pow = ProofOfWork::with_target_bits(&block, 255)
            .unwrap()
            .with_max_nonce(16);
        match pow.run() {
            Err(LedgerError::ProofOfWorkExhausted { max_nonce }) => assert_eq!(max_nonce, 16),
            other => panic!("expected ProofOfWorkExhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_stop_signal_cancels_search() {
        let block = unmined_block();
        let pow = ProofOfWork::with_target_bits(&block, 255).unwrap();
        let stop = AtomicBool::new(true);
        assert_eq!(pow.run_until(&stop), Err(LedgerError::MiningCancelled));
    }

    #[test]
    fn test_target_bits_out_of_range() {
        let block = unmined_block();
        assert!(ProofOfWork::with_target_bits(&block, 0).is_err());
        assert!(ProofOfWork::with_target_bits(&block, 256).is_err());
    }

    #[test]
    fn test_prepare_data_depends_on_nonce() {
        let block = unmined_block();
        let pow = ProofOfWork::new(&block);
        assert_eq!(pow.prepare_data(12345), pow.prepare_data(12345));
        assert_ne!(pow.prepare_data(12345), pow.prepare_data(54321));
    }
}
