// The ledger is an append-only chain of blocks in a key-value store, keyed by
// block hash, with one reserved key pointing at the head. Balances and
// spendable outputs are never indexed: every query walks the chain from the
// head back to genesis.

use crate::core::{Block, PreviousTransactions, ProofOfWork, Transaction, TxOutput, SUBSIDY};
use crate::error::{LedgerError, Result};
use crate::storage::{KeyValueStore, SledStore, WriteBatch};
use data_encoding::HEXLOWER;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::Path;

/// Reserved key holding the hash of the most recently appended block.
pub const HEAD_HASH_KEY: &[u8] = b"lh";

/// Memo of the coinbase in the genesis block.
pub const GENESIS_MEMO: &str = "Genesis Block Data";

/// Reference to one output: `(transaction id, output index)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub tx_id: Vec<u8>,
    pub index: i32,
}

impl OutPoint {
    pub fn new(tx_id: &[u8], index: i32) -> OutPoint {
        OutPoint {
            tx_id: tx_id.to_vec(),
            index,
        }
    }
}

/// An output not referenced by any input in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    pub outpoint: OutPoint,
    pub output: TxOutput,
}

pub struct Ledger<S: KeyValueStore> {
    head_hash: Vec<u8>,
    store: S,
}

impl Ledger<SledStore> {
    /// Create a new on-disk ledger at `path` whose genesis pays `genesis_pub_key_hash`.
    pub fn init_at(path: impl AsRef<Path>, genesis_pub_key_hash: &[u8]) -> Result<Self> {
        Self::init(SledStore::open(path)?, genesis_pub_key_hash)
    }

    /// Open the on-disk ledger at `path`. Nothing is created when it is missing.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LedgerError::LedgerNotFound(path.display().to_string()));
        }
        Self::open(SledStore::open(path)?)
    }
}

impl<S: KeyValueStore> Ledger<S> {
    pub fn init(store: S, genesis_pub_key_hash: &[u8]) -> Result<Self> {
        if store.get(HEAD_HASH_KEY)?.is_some() {
            return Err(LedgerError::LedgerAlreadyExists(store.location()));
        }

        let coinbase = Transaction::new_coinbase_tx(genesis_pub_key_hash, GENESIS_MEMO)?;
        let genesis = Block::generate_genesis_block(&coinbase)?;
        Self::persist_block(&store, &genesis)?;
        info!(
            "Created genesis block {} at {}",
            HEXLOWER.encode(genesis.get_hash()),
            store.location()
        );

        Ok(Ledger {
            head_hash: genesis.get_hash().to_vec(),
            store,
        })
    }

    pub fn open(store: S) -> Result<Self> {
        let head_hash = store
            .get(HEAD_HASH_KEY)?
            .ok_or_else(|| LedgerError::LedgerNotFound(store.location()))?;
        debug!("Opened ledger with head {}", HEXLOWER.encode(&head_hash));
        Ok(Ledger { head_hash, store })
    }

    // Block and head pointer go in one batch so neither is ever visible alone.
    fn persist_block(store: &S, block: &Block) -> Result<()> {
        let block_data = block.serialize()?;
        let batch = WriteBatch::new()
            .put(block.get_hash(), block_data.as_slice())
            .put(HEAD_HASH_KEY, block.get_hash());
        store.write_batch(batch)
    }

    pub fn get_head_hash(&self) -> &[u8] {
        self.head_hash.as_slice()
    }

    pub fn get_store(&self) -> &S {
        &self.store
    }

    /// Verify `transactions`, mine them into a block on top of the current head,
    /// persist it and advance the head. Nothing is written when any check fails.
    pub fn add_block(&mut self, transactions: &[Transaction]) -> Result<Block> {
        if transactions.is_empty() {
            return Err(LedgerError::InvalidBlock(
                "Block must contain at least one transaction".to_string(),
            ));
        }

        // Another handle over the same store may have appended since this
        // one last looked; validate and chain against the stored head.
        self.head_hash = self
            .store
            .get(HEAD_HASH_KEY)?
            .ok_or_else(|| LedgerError::LedgerNotFound(self.store.location()))?;
        self.validate_transactions(transactions)?;

        let block = Block::new_block(transactions, &self.head_hash)?;
        Self::persist_block(&self.store, &block)?;
        self.head_hash = block.get_hash().to_vec();

        info!(
            "Appended block {} with {} transactions",
            HEXLOWER.encode(block.get_hash()),
            block.get_transactions().len()
        );
        Ok(block)
    }

    fn validate_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        let spent_in_chain = self.collect_spent_outpoints()?;
        let mut spent_in_batch = HashSet::new();

        for (i, tx) in transactions.iter().enumerate() {
            let tx_hex = HEXLOWER.encode(tx.get_id());
            Self::check_shape(tx, &tx_hex)?;
            if !self.verify_transaction(tx)? {
                warn!("Rejecting transaction {tx_hex}: signature verification failed");
                return Err(LedgerError::InvalidTransaction(format!(
                    "Transaction {tx_hex} at index {i} failed verification"
                )));
            }
            if tx.is_coinbase() {
                continue;
            }

            for input in tx.get_inputs() {
                let outpoint = input.outpoint();
                if spent_in_chain.contains(&outpoint) {
                    warn!("Rejecting transaction {tx_hex}: input already spent");
                    return Err(LedgerError::InvalidTransaction(format!(
                        "Output {}:{} is already spent",
                        HEXLOWER.encode(&outpoint.tx_id),
                        outpoint.index
                    )));
                }
                if !spent_in_batch.insert(outpoint.clone()) {
                    warn!("Rejecting transaction {tx_hex}: double spend within block");
                    return Err(LedgerError::InvalidTransaction(format!(
                        "Output {}:{} is spent twice in this block",
                        HEXLOWER.encode(&outpoint.tx_id),
                        outpoint.index
                    )));
                }
            }

            let prev_txs = self.previous_transactions(tx)?;
            let input_value = tx.get_input_value(&prev_txs)?;
            let output_value = tx.get_output_value()?;
            if input_value != output_value {
                warn!("Rejecting transaction {tx_hex}: inputs {input_value} != outputs {output_value}");
                return Err(LedgerError::InvalidTransaction(format!(
                    "Transaction {tx_hex} spends {input_value} but pays out {output_value}"
                )));
            }
        }
        Ok(())
    }

    // A coinbase issues exactly one SUBSIDY output; a spend has at least one
    // input and one output.
    fn check_shape(tx: &Transaction, tx_hex: &str) -> Result<()> {
        if tx.is_coinbase() {
            let issued: Vec<u64> = tx.get_outputs().iter().map(TxOutput::get_value).collect();
            if issued != [SUBSIDY] {
                warn!("Rejecting coinbase {tx_hex}: issues {issued:?}");
                return Err(LedgerError::InvalidTransaction(format!(
                    "Coinbase {tx_hex} must issue a single output of {SUBSIDY}"
                )));
            }
        } else if tx.get_inputs().is_empty() || tx.get_outputs().is_empty() {
            warn!("Rejecting transaction {tx_hex}: no inputs or no outputs");
            return Err(LedgerError::InvalidTransaction(format!(
                "Transaction {tx_hex} needs at least one input and one output"
            )));
        }
        Ok(())
    }

    /// Blocks from the head back to genesis.
    pub fn iterator(&self) -> LedgerIterator<'_, S> {
        LedgerIterator::new(self.head_hash.clone(), &self.store)
    }

    pub fn get_block(&self, hash: &[u8]) -> Result<Option<Block>> {
        match self.store.get(hash)? {
            Some(bytes) => Ok(Some(Block::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn block_count(&self) -> Result<usize> {
        let mut count = 0;
        for block in self.iterator() {
            block?;
            count += 1;
        }
        Ok(count)
    }

    /// Every output locked to `pub_key_hash` that no input in the chain spends.
    ///
    /// Traversal runs newest to oldest, and within a block last transaction
    /// first, so each spend is recorded before the output it consumes is reached.
    pub fn find_unspent_outputs(&self, pub_key_hash: &[u8]) -> Result<Vec<UnspentOutput>> {
        let mut spent: HashSet<OutPoint> = HashSet::new();
        let mut unspent = vec![];

        for block in self.iterator() {
            let block = block?;
            for tx in block.get_transactions().iter().rev() {
                for (idx, output) in tx.get_outputs().iter().enumerate() {
                    let outpoint = OutPoint::new(tx.get_id(), output_index(idx)?);
                    if spent.contains(&outpoint) {
                        continue;
                    }
                    if output.is_locked_with_key(pub_key_hash) {
                        unspent.push(UnspentOutput {
                            outpoint,
                            output: output.clone(),
                        });
                    }
                }

                if tx.is_coinbase() {
                    continue;
                }
                for input in tx.get_inputs() {
                    spent.insert(input.outpoint());
                }
            }
        }

        debug!(
            "Found {} unspent outputs for {}",
            unspent.len(),
            HEXLOWER.encode(pub_key_hash)
        );
        Ok(unspent)
    }

    /// Greedily take unspent outputs in traversal order until their sum
    /// reaches `amount`. Returns the sum and the outputs taken; the sum is
    /// below `amount` only when the whole balance is.
    pub fn find_spendable_outputs(
        &self,
        pub_key_hash: &[u8],
        amount: u64,
    ) -> Result<(u64, Vec<OutPoint>)> {
        let mut accumulated = 0u64;
        let mut selected = vec![];

        for unspent in self.find_unspent_outputs(pub_key_hash)? {
            if accumulated >= amount {
                break;
            }
            accumulated = accumulated.saturating_add(unspent.output.get_value());
            selected.push(unspent.outpoint);
        }
        Ok((accumulated, selected))
    }

    pub fn get_balance(&self, pub_key_hash: &[u8]) -> Result<u64> {
        let mut balance = 0u64;
        for unspent in self.find_unspent_outputs(pub_key_hash)? {
            balance = balance.saturating_add(unspent.output.get_value());
        }
        Ok(balance)
    }

    pub fn find_transaction(&self, id: &[u8]) -> Result<Transaction> {
        for block in self.iterator() {
            let block = block?;
            if let Some(tx) = block.get_transactions().iter().find(|tx| tx.get_id() == id) {
                return Ok(tx.clone());
            }
        }
        Err(LedgerError::TransactionNotFound(HEXLOWER.encode(id)))
    }

    fn previous_transactions(&self, tx: &Transaction) -> Result<PreviousTransactions> {
        let mut prev_txs = PreviousTransactions::new();
        if tx.is_coinbase() {
            return Ok(prev_txs);
        }
        for input in tx.get_inputs() {
            let id_hex = HEXLOWER.encode(input.get_prev_tx_id());
            if prev_txs.contains_key(&id_hex) {
                continue;
            }
            let prev_tx = self
                .find_transaction(input.get_prev_tx_id())
                .map_err(|e| match e {
                    LedgerError::TransactionNotFound(id) => {
                        LedgerError::ReferencedTransactionNotFound(id)
                    }
                    other => other,
                })?;
            prev_txs.insert(id_hex, prev_tx);
        }
        Ok(prev_txs)
    }

    pub fn sign_transaction(&self, tx: &mut Transaction, pkcs8: &[u8]) -> Result<()> {
        let prev_txs = self.previous_transactions(tx)?;
        tx.sign(pkcs8, &prev_txs)
    }

    pub fn verify_transaction(&self, tx: &Transaction) -> Result<bool> {
        let prev_txs = self.previous_transactions(tx)?;
        tx.verify(&prev_txs)
    }

    // Every output referenced by any input in the chain.
    fn collect_spent_outpoints(&self) -> Result<HashSet<OutPoint>> {
        let mut spent = HashSet::new();
        for block in self.iterator() {
            for tx in block?.get_transactions() {
                if tx.is_coinbase() {
                    continue;
                }
                spent.extend(tx.get_inputs().iter().map(|input| input.outpoint()));
            }
        }
        Ok(spent)
    }
}

fn output_index(idx: usize) -> Result<i32> {
    i32::try_from(idx)
        .map_err(|_| LedgerError::InvalidTransaction(format!("Output index {idx} out of range")))
}

/// Lazy walk from a starting hash back to genesis. One-shot: once it has
/// yielded the genesis block (or an error) it yields nothing more.
pub struct LedgerIterator<'a, S: KeyValueStore> {
    store: &'a S,
    current_hash: Vec<u8>,
    finished: bool,
}

impl<'a, S: KeyValueStore> LedgerIterator<'a, S> {
    fn new(head_hash: Vec<u8>, store: &'a S) -> LedgerIterator<'a, S> {
        LedgerIterator {
            store,
            current_hash: head_hash,
            finished: false,
        }
    }

    fn load_current(&self) -> Result<Block> {
        let bytes = self.store.get(&self.current_hash)?.ok_or_else(|| {
            LedgerError::InvalidBlock(format!(
                "Block {} is referenced but not stored",
                HEXLOWER.encode(&self.current_hash)
            ))
        })?;
        Block::deserialize(&bytes)
    }
}

impl<'a, S: KeyValueStore> Iterator for LedgerIterator<'a, S> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.load_current() {
            Ok(block) => {
                if block.is_genesis() {
                    self.finished = true;
                } else {
                    self.current_hash = block.get_prev_hash().to_vec();
                }
                Some(Ok(block))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// True when every stored block meets the ledger difficulty and links to its
/// predecessor.
pub fn verify_chain<S: KeyValueStore>(ledger: &Ledger<S>) -> Result<bool> {
    let mut expected_hash = ledger.get_head_hash().to_vec();
    for block in ledger.iterator() {
        let block = block?;
        if block.get_hash() != expected_hash.as_slice() || !ProofOfWork::validate(&block) {
            return Ok(false);
        }
        expected_hash = block.get_prev_hash().to_vec();
    }
    Ok(true)
}
