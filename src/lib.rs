//! Deterministic, resource-bounded script execution for spend verification.
//!
//! A spend is verified by running the unlocking script supplied by a
//! transaction input, then the locking script of the output it spends, then
//! (for pay-to-script-hash outputs) the redeem script the unlocking script
//! pushed. The verdict is a pure function of the scripts, the transaction, the
//! flags and the [`ScriptConfig`] limits.

mod cond;
mod config;
mod engine;
mod error;
mod num;
mod opcode;
mod parser;
mod sigcheck;
mod stack;
mod standard;
mod tx;

pub use cond::{CondFrame, CondStack};
pub use config::{LoopOpCounting, ScriptConfig, ScriptFlags};
pub use engine::Engine;
pub use error::ScriptError;
pub use num::{
    cast_to_bool, is_minimally_encoded, ScriptNum, DEFAULT_SCRIPT_NUM_LEN, LOCKTIME_SCRIPT_NUM_LEN,
};
pub use opcode::{Opcode, LOOP_SCRIPT_VERSION};
pub use parser::{disasm, encode_ops, is_push_only, parse_script, pushed_data, Instructions, ParsedOp};
pub use sigcheck::SignatureChecker;
pub use stack::StackMachine;
pub use standard::{
    address, asset_script, classify, multisig_script, pay_to_address_script,
    pay_to_contract_hash_script, pay_to_pubkey_hash_script, pay_to_script_hash_script,
    script_hash, script_info, sig_op_count, AddressTemplate, AssetId, ContractHash, ScriptClass,
    ScriptInfo,
};
pub use tx::TransactionContext;

use bitcoin::Transaction;
use log::debug;

/// Do not enable any verification.
pub const VERIFY_NONE: u32 = 0;
/// Evaluate pay-to-script-hash redeem scripts.
pub const VERIFY_P2SH: u32 = 1 << 0;
/// Require strict DER signatures with a defined hash type.
pub const VERIFY_STRICTENC: u32 = 1 << 1;
/// Require signatures to use low-S form.
pub const VERIFY_LOW_S: u32 = 1 << 2;
/// Require compressed or uncompressed SEC1 public keys.
pub const VERIFY_STRICT_PUBKEY: u32 = 1 << 3;
/// Require minimal data pushes and minimally encoded numbers.
pub const VERIFY_MINIMALDATA: u32 = 1 << 4;
/// Require exactly one element on the stack after evaluation.
pub const VERIFY_CLEANSTACK: u32 = 1 << 5;
/// Require a push-only unlocking script for pay-to-script-hash spends.
pub const VERIFY_P2SH_PUSHONLY: u32 = 1 << 6;
/// Gate loop and extended arithmetic opcodes on the transaction version.
pub const VERIFY_SCRIPT_VERSION: u32 = 1 << 7;

/// Policy bundle applied to relayed transactions.
pub const VERIFY_STANDARD: u32 = VERIFY_P2SH
    | VERIFY_STRICTENC
    | VERIFY_LOW_S
    | VERIFY_STRICT_PUBKEY
    | VERIFY_MINIMALDATA
    | VERIFY_CLEANSTACK
    | VERIFY_P2SH_PUSHONLY
    | VERIFY_SCRIPT_VERSION;

/// Verifies input `input_index` of `tx` against the output's locking script
/// using the default limits.
pub fn verify(
    tx: &Transaction,
    input_index: usize,
    locking_script: &[u8],
    unlocking_script: &[u8],
    flags: u32,
) -> Result<(), ScriptError> {
    verify_with_config(
        tx,
        input_index,
        locking_script,
        unlocking_script,
        flags,
        &ScriptConfig::default(),
    )
}

/// Same as [`verify`] but with explicit limits.
pub fn verify_with_config(
    tx: &Transaction,
    input_index: usize,
    locking_script: &[u8],
    unlocking_script: &[u8],
    flags: u32,
    config: &ScriptConfig,
) -> Result<(), ScriptError> {
    let result = ScriptFlags::from_bits(flags).and_then(|flags| {
        let mut engine = Engine::new(
            tx,
            input_index,
            locking_script,
            unlocking_script,
            flags,
            *config,
        )?;
        engine.execute()
    });
    if let Err(err) = result {
        debug!("input {input_index} failed verification: {err}");
    }
    result
}

/// Verifies a serialized transaction's input against the script it spends,
/// taking the unlocking script from the input itself.
pub fn verify_with_flags(
    spent_output_script: &[u8],
    spending_transaction: &[u8],
    input_index: usize,
    flags: u32,
) -> Result<(), ScriptError> {
    let tx_ctx = TransactionContext::parse(spending_transaction)?;
    let unlocking_script = tx_ctx.unlocking_script(input_index)?;
    verify(
        tx_ctx.tx(),
        input_index,
        spent_output_script,
        unlocking_script,
        flags,
    )
}
