//! Stack number codec.
//!
//! Numbers are little-endian sign-magnitude with the sign in the high bit of
//! the last byte. Zero is the empty string.

use crate::error::ScriptError;

/// Width allowed for ordinary arithmetic operands.
pub const DEFAULT_SCRIPT_NUM_LEN: usize = 4;
/// Width allowed for the CHECKLOCKTIMEVERIFY operand.
pub const LOCKTIME_SCRIPT_NUM_LEN: usize = 5;

/// Largest magnitude representable in [`DEFAULT_SCRIPT_NUM_LEN`] bytes.
pub const MAX_SCRIPT_NUM: i64 = i32::MAX as i64;

/// A decoded stack number. Arithmetic is carried out in `i64`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ScriptNum(pub i64);

impl ScriptNum {
    pub fn decode(bytes: &[u8], max_width: usize, require_minimal: bool) -> Result<Self, ScriptError> {
        if bytes.len() > max_width {
            return Err(ScriptError::NumberTooBig);
        }
        if require_minimal && !is_minimally_encoded(bytes) {
            return Err(ScriptError::MinimalData);
        }
        Ok(ScriptNum(decode_num(bytes)))
    }

    pub fn encode(self) -> Vec<u8> {
        encode_num(self.0)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    /// Whether the value fits the default four byte operand width.
    pub fn fits_default_width(self) -> bool {
        (-MAX_SCRIPT_NUM..=MAX_SCRIPT_NUM).contains(&self.0)
    }
}

impl From<i64> for ScriptNum {
    fn from(value: i64) -> Self {
        ScriptNum(value)
    }
}

pub(crate) fn encode_num(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut abs_value = value.unsigned_abs();

    while abs_value > 0 {
        result.push((abs_value & 0xff) as u8);
        abs_value >>= 8;
    }

    if let Some(last) = result.last_mut() {
        if *last & 0x80 != 0 {
            result.push(if value < 0 { 0x80 } else { 0x00 });
        } else if value < 0 {
            *last |= 0x80;
        }
    }

    result
}

fn decode_num(bytes: &[u8]) -> i64 {
    let Some(&last) = bytes.last() else {
        return 0;
    };

    let mut result: i64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        result |= (byte as i64) << (8 * i);
    }

    if last & 0x80 != 0 {
        let mask = !(0x80i64 << (8 * (bytes.len() - 1)));
        -(result & mask)
    } else {
        result
    }
}

/// Rejects a trailing zero (or bare sign) byte that a shorter encoding could
/// have absorbed.
pub fn is_minimally_encoded(bytes: &[u8]) -> bool {
    let Some(&last) = bytes.last() else {
        return true;
    };
    if last & 0x7f == 0 {
        if bytes.len() == 1 {
            return false;
        }
        if bytes[bytes.len() - 2] & 0x80 == 0 {
            return false;
        }
    }
    true
}

/// Boolean reading of a stack element. Negative zero is false.
pub fn cast_to_bool(data: &[u8]) -> bool {
    for (i, &byte) in data.iter().enumerate() {
        if byte != 0 {
            if i == data.len() - 1 && byte == 0x80 {
                return false;
            }
            return true;
        }
    }
    false
}
