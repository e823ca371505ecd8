#![allow(dead_code)]

use bitcoin::{
    absolute::LockTime,
    hashes::Hash,
    script::PushBytesBuf,
    secp256k1::{Message, PublicKey, Secp256k1, SecretKey},
    sighash::SighashCache,
    transaction::Version,
    Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness,
};

pub const SIGHASH_ALL: u32 = 0x01;

pub fn spending_tx(version: i32) -> Transaction {
    Transaction {
        version: Version(version),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::default(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(1_000),
            script_pubkey: ScriptBuf::new(),
        }],
    }
}

/// Owned push payload for `bitcoin::script::Builder::push_slice`.
pub fn push_bytes(data: &[u8]) -> PushBytesBuf {
    PushBytesBuf::try_from(data.to_vec()).expect("push fits in a script")
}

pub fn secret_key(seed: u8) -> SecretKey {
    SecretKey::from_slice(&[seed; 32]).expect("seed is a valid scalar")
}

pub fn compressed_pubkey(sk: &SecretKey) -> Vec<u8> {
    let secp = Secp256k1::signing_only();
    PublicKey::from_secret_key(&secp, sk).serialize().to_vec()
}

/// DER signature with a trailing SIGHASH_ALL byte over `script_code`.
pub fn sign(tx: &Transaction, input_index: usize, script_code: &[u8], sk: &SecretKey) -> Vec<u8> {
    let secp = Secp256k1::signing_only();
    let sighash = SighashCache::new(tx)
        .legacy_signature_hash(
            input_index,
            &ScriptBuf::from_bytes(script_code.to_vec()),
            SIGHASH_ALL,
        )
        .expect("input index in range");
    let message = Message::from_digest(sighash.to_byte_array());
    let mut sig = secp.sign_ecdsa(&message, sk).serialize_der().to_vec();
    sig.push(SIGHASH_ALL as u8);
    sig
}
