//! ECDSA signature checks for `CHECKSIG` and `CHECKMULTISIG`.

use std::sync::OnceLock;

use bitcoin::{
    hashes::Hash,
    script::ScriptBuf,
    secp256k1::{self, ecdsa::Signature as EcdsaSignature, Message, PublicKey, Secp256k1},
    sighash::SighashCache,
    Transaction,
};

use crate::{
    config::ScriptFlags,
    error::ScriptError,
    opcode::Opcode,
    parser::{encode_ops, ParsedOp},
};

type VerificationContext = Secp256k1<secp256k1::VerifyOnly>;

static SECP256K1: OnceLock<VerificationContext> = OnceLock::new();

fn with_secp256k1_verification_ctx<R>(f: impl FnOnce(&VerificationContext) -> R) -> R {
    f(SECP256K1.get_or_init(Secp256k1::verification_only))
}

/// Signature verifier bound to one transaction input.
pub struct SignatureChecker<'tx> {
    sighash_cache: SighashCache<&'tx Transaction>,
    input_index: usize,
    flags: ScriptFlags,
}

impl<'tx> SignatureChecker<'tx> {
    pub fn new(tx: &'tx Transaction, input_index: usize, flags: ScriptFlags) -> Self {
        Self {
            sighash_cache: SighashCache::new(tx),
            input_index,
            flags,
        }
    }

    /// Checks a single signature against a key.
    ///
    /// Policy violations are errors; a signature that simply does not verify,
    /// or that cannot be parsed outside the strict policies, yields `false`.
    pub fn check_sig(&self, sig: &[u8], pubkey: &[u8], script_code: &ScriptBuf) -> Result<bool, ScriptError> {
        let Some((&hash_type, der)) = sig.split_last() else {
            return Ok(false);
        };

        self.check_signature_encoding(sig)?;
        self.check_pubkey_encoding(pubkey)?;

        let signature = match EcdsaSignature::from_der_lax(der) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };
        let mut normalized = signature;
        normalized.normalize_s();
        if self.flags.low_s() && normalized != signature {
            return Err(ScriptError::InvalidLowSSignature);
        }

        let pubkey = match PublicKey::from_slice(pubkey) {
            Ok(pk) => pk,
            Err(_) => return Ok(false),
        };

        let sighash = self
            .sighash_cache
            .legacy_signature_hash(self.input_index, script_code, hash_type as u32)
            .map_err(|_| ScriptError::InvalidIndex)?;
        let message = Message::from_digest(sighash.to_byte_array());

        Ok(with_secp256k1_verification_ctx(|secp| {
            secp.verify_ecdsa(&message, &normalized, &pubkey).is_ok()
        }))
    }

    /// Greedy threshold check: signatures and keys are both in script order and
    /// each signature must match a key after the previous match.
    pub fn check_multisig(
        &self,
        sigs: &[Vec<u8>],
        pubkeys: &[Vec<u8>],
        script_code: &ScriptBuf,
    ) -> Result<bool, ScriptError> {
        let mut sig_index = 0usize;
        let mut key_index = 0usize;

        while sig_index < sigs.len() {
            if pubkeys.len() - key_index < sigs.len() - sig_index {
                return Ok(false);
            }
            if self.check_sig(&sigs[sig_index], &pubkeys[key_index], script_code)? {
                sig_index += 1;
            }
            key_index += 1;
        }

        Ok(true)
    }

    fn check_signature_encoding(&self, sig: &[u8]) -> Result<(), ScriptError> {
        if self.flags.strict_encoding()
            && !(is_valid_signature_encoding(sig) && is_defined_hashtype_signature(sig))
        {
            return Err(ScriptError::InvalidStrictEncoding);
        }
        Ok(())
    }

    fn check_pubkey_encoding(&self, pubkey: &[u8]) -> Result<(), ScriptError> {
        if self.flags.strict_pubkey() && !is_valid_pubkey_encoding(pubkey) {
            return Err(ScriptError::InvalidStrictEncoding);
        }
        Ok(())
    }
}

/// Builds the script that signatures commit to: everything after the last
/// executed `CODESEPARATOR`, without separators and without any push of one of
/// the signatures being checked.
pub fn script_code(ops: &[ParsedOp], separator: usize, sigs: &[Vec<u8>]) -> ScriptBuf {
    let start = separator.min(ops.len());
    let kept: Vec<ParsedOp> = ops[start..]
        .iter()
        .filter(|op| op.opcode != Opcode::OP_CODESEPARATOR)
        .filter(|op| {
            !(op.opcode.is_data_push() && !op.data.is_empty() && sigs.iter().any(|sig| *sig == op.data))
        })
        .cloned()
        .collect();
    ScriptBuf::from_bytes(encode_ops(&kept))
}

/// Strict DER: `0x30 len 0x02 len(R) R 0x02 len(S) S hashtype`, with both
/// integers positive and minimally encoded.
pub(crate) fn is_valid_signature_encoding(sig: &[u8]) -> bool {
    if !(9..=73).contains(&sig.len()) {
        return false;
    }
    let [0x30, declared, body @ .., _hashtype] = sig else {
        return false;
    };
    if usize::from(*declared) != body.len() {
        return false;
    }
    let Some(rest) = der_integer(body) else {
        return false;
    };
    matches!(der_integer(rest), Some([]))
}

/// Splits one canonical DER integer off the front of `bytes`.
fn der_integer(bytes: &[u8]) -> Option<&[u8]> {
    let [0x02, len, rest @ ..] = bytes else {
        return None;
    };
    let len = usize::from(*len);
    if len > rest.len() {
        return None;
    }
    let (value, rest) = rest.split_at(len);
    match value {
        [] => None,
        [first, ..] if first & 0x80 != 0 => None,
        [0x00, next, ..] if next & 0x80 == 0 => None,
        _ => Some(rest),
    }
}

pub(crate) fn is_defined_hashtype_signature(sig: &[u8]) -> bool {
    let Some(&last) = sig.last() else {
        return false;
    };
    let base = last & !0x80;
    matches!(base, 0x01..=0x03)
}

pub(crate) fn is_valid_pubkey_encoding(pubkey: &[u8]) -> bool {
    match pubkey.len() {
        33 => matches!(pubkey[0], 0x02 | 0x03),
        65 => pubkey[0] == 0x04,
        _ => false,
    }
}
