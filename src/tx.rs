//! Transaction decoding for the byte-oriented entry point.

use bitcoin::{consensus, Transaction};

use crate::error::ScriptError;

/// A decoded spending transaction.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    tx: Transaction,
}

impl TransactionContext {
    /// Parses a transaction from wire bytes, rejecting trailing or non-canonical data.
    pub fn parse(tx_bytes: &[u8]) -> Result<Self, ScriptError> {
        let tx: Transaction =
            consensus::deserialize(tx_bytes).map_err(|_| ScriptError::ScriptFormat)?;

        let canonical = consensus::serialize(&tx);
        if canonical.len() != tx_bytes.len() {
            return Err(ScriptError::ScriptFormat);
        }

        Ok(Self { tx })
    }

    pub fn tx(&self) -> &Transaction {
        &self.tx
    }

    /// Ensures `input_index` points to an existing transaction input.
    pub fn ensure_input_index(&self, input_index: usize) -> Result<(), ScriptError> {
        if input_index >= self.tx.input.len() {
            Err(ScriptError::InvalidIndex)
        } else {
            Ok(())
        }
    }

    /// The unlocking script carried by input `input_index`.
    pub fn unlocking_script(&self, input_index: usize) -> Result<&[u8], ScriptError> {
        self.ensure_input_index(input_index)?;
        Ok(self.tx.input[input_index].script_sig.as_bytes())
    }
}

impl From<Transaction> for TransactionContext {
    fn from(tx: Transaction) -> Self {
        Self { tx }
    }
}
