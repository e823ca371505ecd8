mod script_asm;

use bitcoin::{
    absolute::LockTime, consensus, script::Builder, transaction::Version, Amount, OutPoint,
    ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness,
};
use consensus_script::{
    verify_with_flags, ScriptError, VERIFY_CLEANSTACK, VERIFY_LOW_S, VERIFY_MINIMALDATA,
    VERIFY_NONE, VERIFY_P2SH, VERIFY_P2SH_PUSHONLY, VERIFY_SCRIPT_VERSION, VERIFY_STRICTENC,
    VERIFY_STRICT_PUBKEY,
};
use script_asm::{parse_script, ParseScriptError};
use serde_json::Value;

const SCRIPT_VECTORS: &str = include_str!("data/script_vectors.json");

#[test]
fn script_vectors() {
    let tests: Vec<Value> =
        serde_json::from_str(SCRIPT_VECTORS).expect("script_vectors.json deserializes");

    let mut checked = 0usize;
    for (index, test) in tests.into_iter().enumerate() {
        let Some(arr) = test.as_array() else {
            continue;
        };
        if arr.len() < 4 {
            continue;
        }

        let field = |position: usize| {
            arr[position]
                .as_str()
                .unwrap_or_else(|| panic!("non-string field {position} in entry #{index}"))
        };
        let unlocking_str = field(0);
        let locking_str = field(1);
        let flags_str = field(2);
        let expected_str = field(3);

        let unlocking = parse_script(unlocking_str)
            .unwrap_or_else(|err| panic_parse(index, err, unlocking_str));
        let locking =
            parse_script(locking_str).unwrap_or_else(|err| panic_parse(index, err, locking_str));
        let flags = parse_flags(flags_str)
            .unwrap_or_else(|token| panic!("entry #{index} unknown flag `{token}`"));
        let expected = parse_expected(expected_str)
            .unwrap_or_else(|| panic!("entry #{index} unknown expected result `{expected_str}`"));

        let tx_bytes = spending_tx_bytes(&locking, unlocking);
        let result = verify_with_flags(&locking, &tx_bytes, 0, flags);
        assert_eq!(
            result.err(),
            expected,
            "entry #{index}: unlocking=`{unlocking_str}` locking=`{locking_str}` flags=`{flags_str}`"
        );
        checked += 1;
    }

    assert!(checked > 40, "only {checked} vectors were run");
}

fn panic_parse(index: usize, err: ParseScriptError, asm: &str) -> ! {
    panic!("failed to parse script for entry #{index}: {err} (asm: `{asm}`)");
}

/// A spend of output 0 of a coinbase-like credit transaction paying to `locking`.
fn spending_tx_bytes(locking: &[u8], unlocking: Vec<u8>) -> Vec<u8> {
    let credit_tx = Transaction {
        version: Version(1),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::default(),
            script_sig: Builder::new().push_int(0).push_int(0).into_script(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(0),
            script_pubkey: ScriptBuf::from_bytes(locking.to_vec()),
        }],
    };
    let spend_tx = Transaction {
        version: Version(1),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: credit_tx.compute_txid(),
                vout: 0,
            },
            script_sig: ScriptBuf::from_bytes(unlocking),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(0),
            script_pubkey: ScriptBuf::new(),
        }],
    };
    consensus::serialize(&spend_tx)
}

fn parse_flags(flags: &str) -> Result<u32, &str> {
    flags
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .try_fold(VERIFY_NONE, |bits, token| {
            let flag = match token {
                "NONE" => VERIFY_NONE,
                "P2SH" => VERIFY_P2SH,
                "STRICTENC" => VERIFY_STRICTENC,
                "LOW_S" => VERIFY_LOW_S,
                "STRICT_PUBKEY" => VERIFY_STRICT_PUBKEY,
                "MINIMALDATA" => VERIFY_MINIMALDATA,
                "CLEANSTACK" => VERIFY_CLEANSTACK,
                "P2SH_PUSHONLY" => VERIFY_P2SH_PUSHONLY,
                "SCRIPT_VERSION" => VERIFY_SCRIPT_VERSION,
                other => return Err(other),
            };
            Ok(bits | flag)
        })
}

/// `None` inside the outer option means the vector expects success.
fn parse_expected(name: &str) -> Option<Option<ScriptError>> {
    use ScriptError::*;

    let err = match name {
        "OK" => return Some(None),
        "ShortScript" => ShortScript,
        "LongScript" => LongScript,
        "StackUnderflow" => StackUnderflow,
        "StackOverflow" => StackOverflow,
        "ElementTooBig" => ElementTooBig,
        "InvalidArgs" => InvalidArgs,
        "NoIf" => NoIf,
        "NoWhile" => NoWhile,
        "MissingEnd" => MissingEnd,
        "EarlyReturn" => EarlyReturn,
        "VerifyFailed" => VerifyFailed,
        "DisabledOpcode" => DisabledOpcode,
        "ReservedOpcode" => ReservedOpcode,
        "InvalidOpcode" => InvalidOpcode,
        "TooManyOperations" => TooManyOperations,
        "ScriptVersion" => ScriptVersion,
        "NumberTooBig" => NumberTooBig,
        "MinimalData" => MinimalData,
        "DivideByZero" => DivideByZero,
        "MulOverflow" => MulOverflow,
        "NegativeShift" => NegativeShift,
        "ShiftOverflow" => ShiftOverflow,
        "EarlyTimestamp" => EarlyTimestamp,
        "InvalidLowSSignature" => InvalidLowSSignature,
        "InvalidStrictEncoding" => InvalidStrictEncoding,
        "TooManyPubKeys" => TooManyPubKeys,
        "EmptyStack" => EmptyStack,
        "ScriptFailed" => ScriptFailed,
        "CleanStack" => CleanStack,
        "P2shNonPushOnly" => P2shNonPushOnly,
        "InvalidFlags" => InvalidFlags,
        _ => return None,
    };
    Some(Some(err))
}

#[test]
fn every_expected_name_matches_the_error_debug_name() {
    for err in [
        ScriptError::ShortScript,
        ScriptError::NoWhile,
        ScriptError::P2shNonPushOnly,
        ScriptError::InvalidLowSSignature,
    ] {
        assert_eq!(parse_expected(&format!("{err:?}")), Some(Some(err)));
    }
    assert_eq!(parse_expected("OK"), Some(None));
    assert_eq!(parse_expected("SIG_DER"), None);
}
