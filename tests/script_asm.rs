//! Assembles the textual script notation used by the test vectors.
//!
//! Tokens are decimal integers, `0x`-prefixed raw hex (copied verbatim),
//! single-quoted strings (pushed as data) or opcode names with or without the
//! `OP_` prefix.

#![allow(dead_code)]

use bitcoin::script::{Builder, PushBytesBuf};
use consensus_script::Opcode;
use core::fmt;

#[derive(Debug)]
pub enum ParseScriptError {
    BadDecimal(String),
    DecimalOutOfRange(i64),
    BadHex(String),
    BadOpcode(String),
}

impl fmt::Display for ParseScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseScriptError::BadDecimal(tok) => write!(f, "bad decimal literal `{tok}`"),
            ParseScriptError::DecimalOutOfRange(n) => write!(
                f,
                "decimal out of range: {n} (allowed: -0xffffffff..=0xffffffff)"
            ),
            ParseScriptError::BadHex(tok) => write!(f, "bad hex literal `{tok}`"),
            ParseScriptError::BadOpcode(tok) => write!(f, "unknown opcode `{tok}`"),
        }
    }
}

pub fn parse_opcode(token: &str) -> Result<Opcode, ParseScriptError> {
    Opcode::from_name(token).ok_or_else(|| ParseScriptError::BadOpcode(token.to_string()))
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_decimal_i64(s: &str) -> Result<i64, ParseScriptError> {
    let num_i64: i64 = s
        .parse()
        .map_err(|_| ParseScriptError::BadDecimal(s.to_string()))?;
    const LIM: i64 = 0xffff_ffff;
    if !(-LIM..=LIM).contains(&num_i64) {
        return Err(ParseScriptError::DecimalOutOfRange(num_i64));
    }
    Ok(num_i64)
}

pub fn decode_hex(s: &str) -> Result<Vec<u8>, ParseScriptError> {
    if s.len() % 2 != 0 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseScriptError::BadHex(s.to_string()));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ParseScriptError::BadHex(s.to_string())))
        .collect()
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

enum Token<'a> {
    Decimal(i64),
    Hex(Vec<u8>),
    Quoted(&'a str),
    Opcode(Opcode),
}

fn classify(token: &str) -> Result<Token<'_>, ParseScriptError> {
    if is_all_digits(token)
        || (token.starts_with('-') && token.len() > 1 && is_all_digits(&token[1..]))
    {
        Ok(Token::Decimal(parse_decimal_i64(token)?))
    } else if let Some(hex) = token.strip_prefix("0x") {
        Ok(Token::Hex(decode_hex(hex)?))
    } else if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        Ok(Token::Quoted(&token[1..token.len() - 1]))
    } else {
        Ok(Token::Opcode(parse_opcode(token)?))
    }
}

pub fn parse_script(s: &str) -> Result<Vec<u8>, ParseScriptError> {
    let mut out = Vec::new();
    for part in s.split([' ', '\t', '\n']).filter(|w| !w.is_empty()) {
        match classify(part)? {
            Token::Decimal(value) => out.extend(Builder::new().push_int(value).into_bytes()),
            Token::Hex(bytes) => out.extend_from_slice(&bytes),
            Token::Quoted(body) => {
                let push = PushBytesBuf::try_from(body.as_bytes().to_vec())
                    .map_err(|_| ParseScriptError::BadOpcode(part.to_string()))?;
                out.extend(Builder::new().push_slice(push).into_bytes());
            }
            Token::Opcode(op) => out.push(op.to_u8()),
        }
    }
    Ok(out)
}
