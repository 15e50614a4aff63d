// Transactions move value under the UTXO model: every input consumes one
// earlier output, every output is locked to the hash of a public key.
// "Spent" is never stored; the ledger derives it by walking the chain.

use crate::core::{Ledger, OutPoint};
use crate::error::{LedgerError, Result};
use crate::storage::KeyValueStore;
use crate::utils::{
    deserialize, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, hash_pub_key,
    serialize, sha256_digest,
};
use crate::wallet::Wallet;
use data_encoding::HEXLOWER;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Value of the single output of every coinbase transaction.
pub const SUBSIDY: u64 = 100;

/// Output index carried by the coinbase input; it references nothing.
pub const COINBASE_OUTPUT_INDEX: i32 = -1;

/// Previous transactions needed to sign or verify, keyed by hex id.
pub type PreviousTransactions = HashMap<String, Transaction>;

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TxInput {
    prev_tx_id: Vec<u8>,
    output_index: i32,
    signature: Vec<u8>,
    pub_key: Vec<u8>,
}

impl TxInput {
    /// An unsigned input spending `(prev_tx_id, output_index)` with `pub_key`.
    pub fn new(prev_tx_id: &[u8], output_index: i32, pub_key: &[u8]) -> TxInput {
        TxInput {
            prev_tx_id: prev_tx_id.to_vec(),
            output_index,
            signature: vec![],
            pub_key: pub_key.to_vec(),
        }
    }

    pub fn get_prev_tx_id(&self) -> &[u8] {
        self.prev_tx_id.as_slice()
    }

    pub fn get_output_index(&self) -> i32 {
        self.output_index
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn get_pub_key(&self) -> &[u8] {
        self.pub_key.as_slice()
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.prev_tx_id.as_slice(), self.output_index)
    }

    pub fn uses_key(&self, pub_key_hash: &[u8]) -> bool {
        hash_pub_key(self.pub_key.as_slice()).eq(pub_key_hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TxOutput {
    value: u64,
    pub_key_hash: Vec<u8>,
}

impl TxOutput {
    pub fn new(value: u64, pub_key_hash: &[u8]) -> Result<TxOutput> {
        if value == 0 {
            return Err(LedgerError::InvalidTransaction(
                "Output value must be positive".to_string(),
            ));
        }
        Ok(TxOutput {
            value,
            pub_key_hash: pub_key_hash.to_vec(),
        })
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_pub_key_hash(&self) -> &[u8] {
        self.pub_key_hash.as_slice()
    }

    pub fn is_locked_with_key(&self, pub_key_hash: &[u8]) -> bool {
        self.pub_key_hash.eq(pub_key_hash)
    }
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    id: Vec<u8>,
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Issue [`SUBSIDY`] to `to`. An empty memo becomes "Coins to <hex>".
    pub fn new_coinbase_tx(to: &[u8], memo: &str) -> Result<Transaction> {
        let memo = if memo.is_empty() {
            format!("Coins to {}", HEXLOWER.encode(to))
        } else {
            memo.to_string()
        };

        let tx_input = TxInput {
            prev_tx_id: vec![],
            output_index: COINBASE_OUTPUT_INDEX,
            // salt so that two coinbases to the same recipient get distinct ids
            signature: Uuid::new_v4().as_bytes().to_vec(),
            pub_key: memo.into_bytes(),
        };

        let mut tx = Transaction {
            id: vec![],
            inputs: vec![tx_input],
            outputs: vec![TxOutput::new(SUBSIDY, to)?],
        };
        tx.id = tx.hash();
        Ok(tx)
    }

    /// Build and sign a transfer of `amount` from `from` to the key hash `to`.
    ///
    /// Inputs are picked greedily by [`Ledger::find_spendable_outputs`]; any
    /// surplus goes back to the sender as a second "change" output.
    pub fn new_transfer<S: KeyValueStore>(
        from: &Wallet,
        to: &[u8],
        amount: u64,
        ledger: &Ledger<S>,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(LedgerError::InvalidTransaction(
                "Amount must be positive".to_string(),
            ));
        }

        let from_pub_key_hash = hash_pub_key(from.get_public_key());
        let (accumulated, spendable) =
            ledger.find_spendable_outputs(from_pub_key_hash.as_slice(), amount)?;

        if accumulated < amount {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let inputs = spendable
            .iter()
            .map(|outpoint| {
                TxInput::new(
                    outpoint.tx_id.as_slice(),
                    outpoint.index,
                    from.get_public_key(),
                )
            })
            .collect();

        let mut outputs = vec![TxOutput::new(amount, to)?];
        if accumulated > amount {
            outputs.push(TxOutput::new(accumulated - amount, &from_pub_key_hash)?);
        }

        let mut tx = Transaction {
            id: vec![],
            inputs,
            outputs,
        };
        tx.id = tx.hash();
        debug!(
            "Built transfer {} spending {} outputs worth {accumulated}",
            HEXLOWER.encode(&tx.id),
            tx.inputs.len()
        );

        ledger.sign_transaction(&mut tx, from.get_pkcs8())?;
        Ok(tx)
    }

    /// Assemble a transaction from parts; the id is computed here.
    pub fn from_parts(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Transaction {
        let mut tx = Transaction {
            id: vec![],
            inputs,
            outputs,
        };
        tx.id = tx.hash();
        tx
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1
            && self.inputs[0].prev_tx_id.is_empty()
            && self.inputs[0].output_index == COINBASE_OUTPUT_INDEX
    }

    /// SHA-256 over [`Transaction::content_bytes`]. The id field never takes part.
    pub fn hash(&self) -> Vec<u8> {
        sha256_digest(self.content_bytes().as_slice())
    }

    /// Order-fixed encoding of every field except `id`.
    ///
    /// Layout: `u32be(#inputs)`, then per input `lp(prev_tx_id) ‖
    /// i32be(output_index) ‖ lp(signature) ‖ lp(pub_key)`, then
    /// `u32be(#outputs)`, then per output `u64be(value) ‖ lp(pub_key_hash)`,
    /// where `lp(x) = u32be(len x) ‖ x`. Signatures depend on this layout.
    pub fn content_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![];
        put_len(&mut bytes, self.inputs.len());
        for input in &self.inputs {
            put_prefixed(&mut bytes, &input.prev_tx_id);
            bytes.extend(input.output_index.to_be_bytes());
            put_prefixed(&mut bytes, &input.signature);
            put_prefixed(&mut bytes, &input.pub_key);
        }
        put_len(&mut bytes, self.outputs.len());
        for output in &self.outputs {
            bytes.extend(output.value.to_be_bytes());
            put_prefixed(&mut bytes, &output.pub_key_hash);
        }
        bytes
    }

    fn trimmed_copy(&self) -> Transaction {
        let inputs = self
            .inputs
            .iter()
            .map(|input| TxInput {
                prev_tx_id: input.prev_tx_id.clone(),
                output_index: input.output_index,
                signature: vec![],
                pub_key: vec![],
            })
            .collect();
        Transaction {
            id: self.id.clone(),
            inputs,
            outputs: self.outputs.clone(),
        }
    }

    /// The output spent by input `idx`, or `None` when the index is out of range.
    fn referenced_output<'a>(
        &self,
        idx: usize,
        prev_txs: &'a PreviousTransactions,
    ) -> Result<Option<&'a TxOutput>> {
        let input = &self.inputs[idx];
        let prev_tx_hex = HEXLOWER.encode(&input.prev_tx_id);
        let prev_tx = prev_txs
            .get(&prev_tx_hex)
            .ok_or(LedgerError::ReferencedTransactionNotFound(prev_tx_hex))?;
        Ok(usize::try_from(input.output_index)
            .ok()
            .and_then(|out_idx| prev_tx.outputs.get(out_idx)))
    }

    /// Digest signed for input `idx`: the trimmed copy with only that input's
    /// pubkey set to the locking hash of the output it spends.
    fn signing_digest(trimmed: &mut Transaction, idx: usize, locking_hash: &[u8]) -> Vec<u8> {
        trimmed.inputs[idx].signature = vec![];
        trimmed.inputs[idx].pub_key = locking_hash.to_vec();
        let digest = trimmed.hash();
        trimmed.inputs[idx].pub_key = vec![];
        digest
    }

    /// Sign every input with `pkcs8`. Coinbase transactions are left alone.
    pub fn sign(&mut self, pkcs8: &[u8], prev_txs: &PreviousTransactions) -> Result<()> {
        if self.is_coinbase() {
            return Ok(());
        }

        let mut tx_copy = self.trimmed_copy();
        for idx in 0..self.inputs.len() {
            let locking_hash = self
                .referenced_output(idx, prev_txs)?
                .ok_or_else(|| {
                    LedgerError::InvalidTransaction(format!(
                        "Input {idx} references output {} which does not exist",
                        self.inputs[idx].output_index
                    ))
                })?
                .pub_key_hash
                .clone();

            let digest = Self::signing_digest(&mut tx_copy, idx, &locking_hash);
            self.inputs[idx].signature = ecdsa_p256_sha256_sign_digest(pkcs8, &digest)?;
        }
        Ok(())
    }

    /// True when every input carries a valid signature by the owner of the
    /// output it spends. Coinbase transactions always verify.
    pub fn verify(&self, prev_txs: &PreviousTransactions) -> Result<bool> {
        if self.is_coinbase() {
            return Ok(true);
        }

        let mut tx_copy = self.trimmed_copy();
        for (idx, input) in self.inputs.iter().enumerate() {
            let referenced = match self.referenced_output(idx, prev_txs)? {
                Some(output) => output,
                None => {
                    debug!("Input {idx} references a missing output index");
                    return Ok(false);
                }
            };

            if !input.uses_key(referenced.get_pub_key_hash()) {
                debug!("Input {idx} is not signed by the owner of the output it spends");
                return Ok(false);
            }

            let digest = Self::signing_digest(&mut tx_copy, idx, referenced.get_pub_key_hash());
            if !ecdsa_p256_sha256_sign_verify(
                input.pub_key.as_slice(),
                input.signature.as_slice(),
                &digest,
            ) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Sum of the outputs this transaction spends.
    pub fn get_input_value(&self, prev_txs: &PreviousTransactions) -> Result<u64> {
        if self.is_coinbase() {
            return Ok(0);
        }

        let mut total = 0u64;
        for idx in 0..self.inputs.len() {
            let output = self.referenced_output(idx, prev_txs)?.ok_or_else(|| {
                LedgerError::InvalidTransaction(format!("Input {idx} has an invalid output index"))
            })?;
            total = total
                .checked_add(output.get_value())
                .ok_or_else(|| LedgerError::InvalidTransaction("Input value overflow".to_string()))?;
        }
        Ok(total)
    }

    pub fn get_output_value(&self) -> Result<u64> {
        let mut total = 0u64;
        for output in &self.outputs {
            total = total
                .checked_add(output.get_value())
                .ok_or_else(|| LedgerError::InvalidTransaction("Output value overflow".to_string()))?;
        }
        Ok(total)
    }

    pub fn get_id(&self) -> &[u8] {
        self.id.as_slice()
    }

    pub fn get_inputs(&self) -> &[TxInput] {
        self.inputs.as_slice()
    }

    pub fn get_outputs(&self) -> &[TxOutput] {
        self.outputs.as_slice()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }

    #[cfg(test)]
    pub(crate) fn inputs_mut(&mut self) -> &mut Vec<TxInput> {
        &mut self.inputs
    }

    #[cfg(test)]
    pub(crate) fn outputs_mut(&mut self) -> &mut Vec<TxOutput> {
        &mut self.outputs
    }
}

fn put_len(bytes: &mut Vec<u8>, len: usize) {
    // Field lengths are bounded far below u32::MAX by the block encoding.
    bytes.extend((len as u32).to_be_bytes());
}

fn put_prefixed(bytes: &mut Vec<u8>, field: &[u8]) {
    put_len(bytes, field.len());
    bytes.extend(field);
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Transaction {}:", HEXLOWER.encode(&self.id))?;
        for (i, input) in self.inputs.iter().enumerate() {
            writeln!(f, "     Input {i}:")?;
            writeln!(f, "       TXID:      {}", HEXLOWER.encode(&input.prev_tx_id))?;
            writeln!(f, "       Out:       {}", input.output_index)?;
            writeln!(f, "       Signature: {}", HEXLOWER.encode(&input.signature))?;
            writeln!(f, "       PubKey:    {}", HEXLOWER.encode(&input.pub_key))?;
        }
        for (i, output) in self.outputs.iter().enumerate() {
            writeln!(f, "     Output {i}:")?;
            writeln!(f, "       Value:      {}", output.value)?;
            write!(f, "       PubKeyHash: {}", HEXLOWER.encode(&output.pub_key_hash))?;
            if i + 1 < self.outputs.len() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
