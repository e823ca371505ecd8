use bitcoin::{
    absolute::LockTime,
    consensus,
    hashes::{hash160, Hash},
    opcodes::all,
    script::{Builder, PushBytesBuf},
    secp256k1::{Message, PublicKey, Secp256k1, SecretKey},
    sighash::SighashCache,
    transaction::Version,
    Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness,
};
use consensus_script::{
    multisig_script, pay_to_pubkey_hash_script, pay_to_script_hash_script, script_hash,
    verify_with_config, verify_with_flags, LoopOpCounting, Opcode, ScriptConfig,
    VERIFY_NONE, VERIFY_STANDARD,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

struct BenchCase {
    name: &'static str,
    locking: Vec<u8>,
    tx_bytes: Vec<u8>,
    flags: u32,
}

pub fn verification_bench(c: &mut Criterion) {
    let cases = vec![p2pkh_case(), p2sh_multisig_case(), countdown_case()];

    let mut group = c.benchmark_group("verify");
    for case in cases {
        group.bench_with_input(BenchmarkId::new("verify_with_flags", case.name), &case, |b, case| {
            b.iter(|| {
                verify_with_flags(&case.locking, &case.tx_bytes, 0, case.flags)
                    .expect("bench case verifies")
            });
        });
    }
    group.finish();
}

pub fn loop_counting_bench(c: &mut Criterion) {
    let tx = base_tx(2);
    let locking = countdown_script(2_000);
    let first_pass = ScriptConfig {
        loop_ops: LoopOpCounting::FirstPassOnly { max_iterations: 10_000 },
        ..ScriptConfig::default()
    };
    c.bench_function("countdown_2000_first_pass", |b| {
        b.iter(|| {
            verify_with_config(&tx, 0, &locking, &[], VERIFY_NONE, &first_pass)
                .expect("loop terminates")
        });
    });
}

fn base_tx(version: i32) -> Transaction {
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
            value: Amount::from_sat(50_000),
            script_pubkey: ScriptBuf::new(),
        }],
    }
}

fn push_bytes(data: &[u8]) -> PushBytesBuf {
    PushBytesBuf::try_from(data.to_vec()).expect("push fits in a script")
}

fn sign(tx: &Transaction, script_code: &[u8], sk: &SecretKey) -> Vec<u8> {
    let secp = Secp256k1::signing_only();
    let sighash = SighashCache::new(tx)
        .legacy_signature_hash(0, &ScriptBuf::from_bytes(script_code.to_vec()), 1)
        .expect("sighash");
    let mut sig = secp
        .sign_ecdsa(&Message::from_digest(sighash.to_byte_array()), sk)
        .serialize_der()
        .to_vec();
    sig.push(0x01);
    sig
}

fn finish(name: &'static str, locking: Vec<u8>, mut tx: Transaction, unlocking: Vec<u8>) -> BenchCase {
    tx.input[0].script_sig = ScriptBuf::from_bytes(unlocking);
    BenchCase {
        name,
        locking,
        tx_bytes: consensus::serialize(&tx),
        flags: VERIFY_STANDARD,
    }
}

fn p2pkh_case() -> BenchCase {
    let secp = Secp256k1::signing_only();
    let sk = SecretKey::from_slice(&[0x42; 32]).expect("secret key");
    let pubkey = PublicKey::from_secret_key(&secp, &sk).serialize();
    let locking = pay_to_pubkey_hash_script(&hash160::Hash::hash(&pubkey).to_byte_array());
    let tx = base_tx(1);
    let sig = sign(&tx, &locking, &sk);
    let unlocking = Builder::new()
        .push_slice(push_bytes(&sig))
        .push_slice(pubkey)
        .into_bytes();
    finish("p2pkh", locking, tx, unlocking)
}

fn p2sh_multisig_case() -> BenchCase {
    let secp = Secp256k1::signing_only();
    let keys: Vec<SecretKey> = (1u8..=3)
        .map(|seed| SecretKey::from_slice(&[seed; 32]).expect("secret key"))
        .collect();
    let pubkeys: Vec<Vec<u8>> = keys
        .iter()
        .map(|sk| PublicKey::from_secret_key(&secp, sk).serialize().to_vec())
        .collect();
    let redeem = multisig_script(&pubkeys, 2).expect("2-of-3");
    let locking = pay_to_script_hash_script(&script_hash(&redeem));
    let tx = base_tx(1);
    let unlocking = Builder::new()
        .push_opcode(all::OP_PUSHBYTES_0)
        .push_slice(push_bytes(&sign(&tx, &redeem, &keys[0])))
        .push_slice(push_bytes(&sign(&tx, &redeem, &keys[2])))
        .push_slice(push_bytes(&redeem))
        .into_bytes();
    finish("p2sh_multisig_2_of_3", locking, tx, unlocking)
}

fn countdown_script(n: i64) -> Vec<u8> {
    Builder::new()
        .push_int(n)
        .push_opcode(Opcode::OP_DUP.into())
        .push_opcode(Opcode::OP_WHILE.into())
        .push_opcode(Opcode::OP_1SUB.into())
        .push_opcode(Opcode::OP_DUP.into())
        .push_opcode(Opcode::OP_ENDWHILE.into())
        .push_opcode(Opcode::OP_DROP.into())
        .push_opcode(Opcode::OP_1.into())
        .into_bytes()
}

fn countdown_case() -> BenchCase {
    finish("countdown_40", countdown_script(40), base_tx(2), Vec::new())
}

criterion_group!(benches, verification_bench, loop_counting_bench);
criterion_main!(benches);
