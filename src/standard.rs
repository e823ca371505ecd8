//! Standard locking-script templates.
//!
//! Recognition never fails: anything that is not one of the known shapes,
//! including scripts that do not decode, is [`AddressTemplate::Unknown`].

use core::fmt;

use bitcoin::{
    hashes::{hash160, sha256, Hash},
    opcodes::all,
    script::{Builder, PushBytes},
};

use crate::{
    error::ScriptError,
    opcode::Opcode,
    parser::{Instructions, ParsedOp},
};

/// Signature operations charged for a multisig whose key count is not known.
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;

macro_rules! hash32_newtype {
    ($name:ident, $err:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const LEN: usize = 32;

            pub fn from_byte_array(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn from_slice(bytes: &[u8]) -> Result<Self, ScriptError> {
                let array: [u8; 32] = bytes.try_into().map_err(|_| $err)?;
                Ok(Self(array))
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(", stringify!($name))?;
                for byte in &self.0 {
                    write!(f, "{byte:02x}")?;
                }
                f.write_str(")")
            }
        }
    };
}

hash32_newtype!(
    ContractHash,
    ScriptError::ContractHashLength,
    "SHA-256 commitment a contract-hash output is locked to."
);
hash32_newtype!(AssetId, ScriptError::AssetIdLength, "Asset identifier tagging an output.");

impl ContractHash {
    /// Commitment to a contract preimage.
    pub fn of(contract: &[u8]) -> Self {
        Self(sha256::Hash::hash(contract).to_byte_array())
    }
}

/// Addressing information extracted from a locking script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressTemplate {
    PubKeyHash([u8; 20]),
    ScriptHash([u8; 20]),
    MultiSig { required: usize, pubkeys: Vec<Vec<u8>> },
    ContractHash(ContractHash),
    Asset { asset_id: AssetId, inner: Box<AddressTemplate> },
    Unknown,
}

/// Coarse classification of a template.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScriptClass {
    NonStandard,
    PubKeyHash,
    ScriptHash,
    MultiSig,
    ContractHash,
    Asset,
}

impl fmt::Display for ScriptClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScriptClass::NonStandard => "nonstandard",
            ScriptClass::PubKeyHash => "pubkeyhash",
            ScriptClass::ScriptHash => "scripthash",
            ScriptClass::MultiSig => "multisig",
            ScriptClass::ContractHash => "contracthash",
            ScriptClass::Asset => "asset",
        };
        f.write_str(name)
    }
}

impl AddressTemplate {
    pub fn class(&self) -> ScriptClass {
        match self {
            AddressTemplate::PubKeyHash(_) => ScriptClass::PubKeyHash,
            AddressTemplate::ScriptHash(_) => ScriptClass::ScriptHash,
            AddressTemplate::MultiSig { .. } => ScriptClass::MultiSig,
            AddressTemplate::ContractHash(_) => ScriptClass::ContractHash,
            AddressTemplate::Asset { .. } => ScriptClass::Asset,
            AddressTemplate::Unknown => ScriptClass::NonStandard,
        }
    }

    /// Number of unlocking-script pushes a spend of this template needs.
    /// For script-hash outputs this excludes the redeem script's own inputs.
    pub fn expected_inputs(&self) -> Option<usize> {
        match self {
            AddressTemplate::PubKeyHash(_) => Some(2),
            AddressTemplate::ScriptHash(_) => Some(1),
            AddressTemplate::MultiSig { required, .. } => Some(required + 1),
            AddressTemplate::ContractHash(_) => Some(1),
            AddressTemplate::Asset { inner, .. } => inner.expected_inputs(),
            AddressTemplate::Unknown => None,
        }
    }
}

/// Recognizes the template of a locking script.
pub fn classify(script: &[u8]) -> AddressTemplate {
    match Instructions::new(script).collect::<Result<Vec<_>, _>>() {
        Ok(ops) => classify_ops(&ops),
        Err(_) => AddressTemplate::Unknown,
    }
}

/// Like [`classify`], but an unrecognised script is an error.
pub fn address(script: &[u8]) -> Result<AddressTemplate, ScriptError> {
    match classify(script) {
        AddressTemplate::Unknown => Err(ScriptError::UnknownAddress),
        template => Ok(template),
    }
}

fn classify_ops(ops: &[ParsedOp]) -> AddressTemplate {
    if let [id, drop, inner @ ..] = ops {
        if is_push_of(id, 32) && drop.opcode == Opcode::OP_DROP {
            let inner = classify_base(inner);
            if inner == AddressTemplate::Unknown {
                return AddressTemplate::Unknown;
            }
            let mut asset_id = [0u8; 32];
            asset_id.copy_from_slice(&id.data);
            return AddressTemplate::Asset {
                asset_id: AssetId(asset_id),
                inner: Box::new(inner),
            };
        }
    }
    classify_base(ops)
}

fn classify_base(ops: &[ParsedOp]) -> AddressTemplate {
    use Opcode::*;

    match ops {
        [dup, hash160, hash, equalverify, checksig]
            if dup.opcode == OP_DUP
                && hash160.opcode == OP_HASH160
                && is_push_of(hash, 20)
                && equalverify.opcode == OP_EQUALVERIFY
                && checksig.opcode == OP_CHECKSIG =>
        {
            AddressTemplate::PubKeyHash(to_array20(&hash.data))
        }
        [hash160, hash, equal]
            if hash160.opcode == OP_HASH160 && is_push_of(hash, 20) && equal.opcode == OP_EQUAL =>
        {
            AddressTemplate::ScriptHash(to_array20(&hash.data))
        }
        [sha256, hash, equal]
            if sha256.opcode == OP_SHA256 && is_push_of(hash, 32) && equal.opcode == OP_EQUAL =>
        {
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(&hash.data);
            AddressTemplate::ContractHash(ContractHash(bytes))
        }
        _ => classify_multisig(ops).unwrap_or(AddressTemplate::Unknown),
    }
}

fn classify_multisig(ops: &[ParsedOp]) -> Option<AddressTemplate> {
    let (last, rest) = ops.split_last()?;
    if last.opcode != Opcode::OP_CHECKMULTISIG {
        return None;
    }
    let (n_op, rest) = rest.split_last()?;
    let (m_op, keys) = rest.split_first()?;
    let required = positive_small_int(m_op)?;
    let total = positive_small_int(n_op)?;
    if required > total || keys.len() != total {
        return None;
    }
    if !keys.iter().all(|key| key.opcode.is_data_push() && !key.data.is_empty()) {
        return None;
    }
    Some(AddressTemplate::MultiSig {
        required,
        pubkeys: keys.iter().map(|key| key.data.clone()).collect(),
    })
}

fn positive_small_int(op: &ParsedOp) -> Option<usize> {
    match op.opcode.small_int() {
        Some(n) if n >= 1 => Some(n as usize),
        _ => None,
    }
}

fn is_push_of(op: &ParsedOp, len: usize) -> bool {
    op.opcode.is_data_push() && op.data.len() == len
}

fn to_array20(data: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(data);
    out
}

/// HASH160 of a redeem script, as committed to by a script-hash output.
pub fn script_hash(redeem_script: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(redeem_script).to_byte_array()
}

pub fn pay_to_pubkey_hash_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    Builder::new()
        .push_opcode(all::OP_DUP)
        .push_opcode(all::OP_HASH160)
        .push_slice(pubkey_hash)
        .push_opcode(all::OP_EQUALVERIFY)
        .push_opcode(all::OP_CHECKSIG)
        .into_bytes()
}

pub fn pay_to_script_hash_script(script_hash: &[u8; 20]) -> Vec<u8> {
    Builder::new()
        .push_opcode(all::OP_HASH160)
        .push_slice(script_hash)
        .push_opcode(all::OP_EQUAL)
        .into_bytes()
}

/// `OP_m <keys...> OP_n CHECKMULTISIG`.
pub fn multisig_script(pubkeys: &[Vec<u8>], required: usize) -> Result<Vec<u8>, ScriptError> {
    if required > pubkeys.len() {
        return Err(ScriptError::BadNumRequired);
    }
    let mut builder = Builder::new().push_int(required as i64);
    for key in pubkeys {
        let key = <&PushBytes>::try_from(key.as_slice()).map_err(|_| ScriptError::ElementTooBig)?;
        builder = builder.push_slice(key);
    }
    Ok(builder
        .push_int(pubkeys.len() as i64)
        .push_opcode(all::OP_CHECKMULTISIG)
        .into_bytes())
}

pub fn pay_to_contract_hash_script(contract_hash: &ContractHash) -> Vec<u8> {
    Builder::new()
        .push_opcode(all::OP_SHA256)
        .push_slice(contract_hash.as_bytes())
        .push_opcode(all::OP_EQUAL)
        .into_bytes()
}

/// Prefixes `inner` with an asset tag: `<asset id> DROP <inner>`.
pub fn asset_script(asset_id: &AssetId, inner: &[u8]) -> Vec<u8> {
    let mut script = Builder::new()
        .push_slice(asset_id.as_bytes())
        .push_opcode(all::OP_DROP)
        .into_bytes();
    script.extend_from_slice(inner);
    script
}

/// Rebuilds the locking script a template was recognised from.
pub fn pay_to_address_script(template: &AddressTemplate) -> Result<Vec<u8>, ScriptError> {
    match template {
        AddressTemplate::PubKeyHash(hash) => Ok(pay_to_pubkey_hash_script(hash)),
        AddressTemplate::ScriptHash(hash) => Ok(pay_to_script_hash_script(hash)),
        AddressTemplate::MultiSig { required, pubkeys } => multisig_script(pubkeys, *required),
        AddressTemplate::ContractHash(hash) => Ok(pay_to_contract_hash_script(hash)),
        AddressTemplate::Asset { asset_id, inner } => {
            let inner = pay_to_address_script(inner)?;
            Ok(asset_script(asset_id, &inner))
        }
        AddressTemplate::Unknown => Err(ScriptError::UnsupportedAddress),
    }
}

/// Counts signature operations in a script. Decoding stops silently at the
/// first malformed op. With `precise`, a multisig preceded by `OP_n` counts `n`
/// instead of the maximum.
pub fn sig_op_count(script: &[u8], precise: bool) -> usize {
    use Opcode::*;

    let mut total = 0usize;
    let mut last_op: Option<Opcode> = None;
    for op in Instructions::new(script) {
        let Ok(op) = op else {
            break;
        };
        match op.opcode {
            OP_CHECKSIG | OP_CHECKSIGVERIFY => total += 1,
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                total += match last_op.and_then(Opcode::small_int) {
                    Some(n) if precise && (1..=16).contains(&n) => n as usize,
                    _ => MAX_PUBKEYS_PER_MULTISIG,
                };
            }
            _ => {}
        }
        last_op = Some(op.opcode);
    }
    total
}

/// Summary of a prospective spend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInfo {
    /// Template of the locking script (or of the redeem script for script-hash spends).
    pub class: ScriptClass,
    /// Pushes supplied by the unlocking script.
    pub num_inputs: usize,
    /// Pushes the templates expect, when they are all known.
    pub expected_inputs: Option<usize>,
    pub sig_ops: usize,
}

/// Analyses an unlocking/locking script pair. The unlocking script must be push-only.
pub fn script_info(sig_script: &[u8], pk_script: &[u8], p2sh: bool) -> Result<ScriptInfo, ScriptError> {
    let pushes = crate::parser::pushed_data(sig_script)?;
    let template = classify(pk_script);
    let mut expected_inputs = template.expected_inputs();

    if p2sh && template.class() == ScriptClass::ScriptHash {
        let redeem = pushes.last().cloned().unwrap_or_default();
        let inner = classify(&redeem);
        expected_inputs = match (expected_inputs, inner.expected_inputs()) {
            (Some(outer), Some(inner)) => Some(outer + inner),
            _ => None,
        };
        return Ok(ScriptInfo {
            class: inner.class(),
            num_inputs: pushes.len(),
            expected_inputs,
            sig_ops: sig_op_count(&redeem, true),
        });
    }

    Ok(ScriptInfo {
        class: template.class(),
        num_inputs: pushes.len(),
        expected_inputs,
        sig_ops: sig_op_count(pk_script, true),
    })
}
