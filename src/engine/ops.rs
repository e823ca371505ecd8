//! Per-opcode semantics.

use bitcoin::{
    absolute::LOCK_TIME_THRESHOLD,
    hashes::{hash160, ripemd160, sha1, sha256, sha256d, Hash},
    Sequence,
};

use super::Engine;
use crate::{
    error::ScriptError,
    num::{cast_to_bool, ScriptNum, DEFAULT_SCRIPT_NUM_LEN, LOCKTIME_SCRIPT_NUM_LEN},
    opcode::Opcode,
    parser::ParsedOp,
    sigcheck::script_code,
};

impl Engine<'_> {
    /// Applies one op. Returns the index to jump to when control flow loops back.
    pub(super) fn dispatch(&mut self, op: &ParsedOp) -> Result<Option<usize>, ScriptError> {
        use Opcode::*;

        let opcode = op.opcode;
        if opcode.is_data_push() {
            self.stack.push(op.data.clone())?;
            return Ok(None);
        }
        if let Some(n) = opcode.small_int() {
            self.stack.push_num(ScriptNum(n))?;
            return Ok(None);
        }
        if opcode.is_invalid() {
            return Err(ScriptError::InvalidOpcode);
        }

        match opcode {
            OP_RESERVED | OP_VER | OP_RESERVED1 | OP_RESERVED2 => {
                return Err(ScriptError::ReservedOpcode);
            }

            OP_NOP | OP_NOP1 | OP_NOP3 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8
            | OP_NOP9 | OP_NOP10 => {}

            // Flow control.
            OP_IF | OP_NOTIF => {
                let taken = if self.cond.is_executing() {
                    let cond = self.stack.pop_bool()?;
                    if opcode == OP_NOTIF {
                        !cond
                    } else {
                        cond
                    }
                } else {
                    false
                };
                self.cond.open_if(taken);
            }
            OP_ELSE => self.cond.flip_else()?,
            OP_ENDIF => self.cond.close_if()?,
            OP_WHILE => {
                let taken = self.cond.is_executing() && self.stack.pop_bool()?;
                self.cond.open_while(taken, self.pc);
            }
            OP_ENDWHILE => {
                let frame = self.cond.close_while()?;
                if frame.taken {
                    return Ok(Some(frame.loop_start));
                }
            }
            OP_VERIFY => self.verify_top()?,
            OP_RETURN => return Err(ScriptError::EarlyReturn),

            // Stack.
            OP_TOALTSTACK => self.stack.to_alt()?,
            OP_FROMALTSTACK => self.stack.from_alt()?,
            OP_2DROP => self.stack.drop_n(2)?,
            OP_2DUP => self.stack.dup_n(2)?,
            OP_3DUP => self.stack.dup_n(3)?,
            OP_2OVER => self.stack.over_n(2)?,
            OP_2ROT => self.stack.rot_n(2)?,
            OP_2SWAP => self.stack.swap_n(2)?,
            OP_IFDUP => {
                if cast_to_bool(self.stack.peek(0)?) {
                    self.stack.dup_n(1)?;
                }
            }
            OP_DEPTH => {
                let depth = self.stack.depth() as i64;
                self.stack.push_num(ScriptNum(depth))?;
            }
            OP_DROP => self.stack.drop_n(1)?,
            OP_DUP => self.stack.dup_n(1)?,
            OP_NIP => {
                self.stack.nip(1)?;
            }
            OP_OVER => self.stack.over_n(1)?,
            OP_PICK | OP_ROLL => {
                let idx = self.pop_num()?.value();
                if idx < 0 {
                    return Err(ScriptError::InvalidArgs);
                }
                if opcode == OP_PICK {
                    self.stack.pick(idx as usize)?;
                } else {
                    self.stack.roll(idx as usize)?;
                }
            }
            OP_ROT => self.stack.rot_n(1)?,
            OP_SWAP => self.stack.swap_n(1)?,
            OP_TUCK => self.stack.tuck()?,
            OP_SIZE => {
                let len = self.stack.peek(0)?.len() as i64;
                self.stack.push_num(ScriptNum(len))?;
            }

            // Comparison.
            OP_EQUAL | OP_EQUALVERIFY => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                self.stack.push_bool(a == b)?;
                if opcode == OP_EQUALVERIFY {
                    self.verify_top()?;
                }
            }

            // Arithmetic.
            OP_1ADD | OP_1SUB | OP_2MUL | OP_2DIV | OP_NEGATE | OP_ABS | OP_NOT
            | OP_0NOTEQUAL => {
                let a = self.pop_num()?.value();
                let result = match opcode {
                    OP_1ADD => a + 1,
                    OP_1SUB => a - 1,
                    OP_2MUL => checked_mul(a, 2)?,
                    OP_2DIV => a / 2,
                    OP_NEGATE => -a,
                    OP_ABS => a.abs(),
                    OP_NOT => (a == 0) as i64,
                    _ => (a != 0) as i64,
                };
                self.stack.push_num(ScriptNum(result))?;
            }
            OP_ADD | OP_SUB | OP_MUL | OP_DIV | OP_MOD | OP_LSHIFT | OP_RSHIFT | OP_BOOLAND
            | OP_BOOLOR | OP_NUMEQUAL | OP_NUMEQUALVERIFY | OP_NUMNOTEQUAL | OP_LESSTHAN
            | OP_GREATERTHAN | OP_LESSTHANOREQUAL | OP_GREATERTHANOREQUAL | OP_MIN | OP_MAX => {
                let b = self.pop_num()?.value();
                let a = self.pop_num()?.value();
                let result = match opcode {
                    OP_ADD => a + b,
                    OP_SUB => a - b,
                    OP_MUL => checked_mul(a, b)?,
                    OP_DIV => {
                        if b == 0 {
                            return Err(ScriptError::DivideByZero);
                        }
                        a / b
                    }
                    OP_MOD => {
                        if b == 0 {
                            return Err(ScriptError::DivideByZero);
                        }
                        a % b
                    }
                    OP_LSHIFT => left_shift(a, b)?,
                    OP_RSHIFT => {
                        if b < 0 {
                            return Err(ScriptError::NegativeShift);
                        }
                        a >> b.min(63)
                    }
                    OP_BOOLAND => (a != 0 && b != 0) as i64,
                    OP_BOOLOR => (a != 0 || b != 0) as i64,
                    OP_NUMEQUAL | OP_NUMEQUALVERIFY => (a == b) as i64,
                    OP_NUMNOTEQUAL => (a != b) as i64,
                    OP_LESSTHAN => (a < b) as i64,
                    OP_GREATERTHAN => (a > b) as i64,
                    OP_LESSTHANOREQUAL => (a <= b) as i64,
                    OP_GREATERTHANOREQUAL => (a >= b) as i64,
                    OP_MIN => a.min(b),
                    _ => a.max(b),
                };
                self.stack.push_num(ScriptNum(result))?;
                if opcode == OP_NUMEQUALVERIFY {
                    self.verify_top()?;
                }
            }
            OP_WITHIN => {
                let max = self.pop_num()?.value();
                let min = self.pop_num()?.value();
                let x = self.pop_num()?.value();
                self.stack.push_bool(min <= x && x < max)?;
            }

            // Crypto.
            OP_RIPEMD160 => self.hash_top(|data| ripemd160::Hash::hash(data).to_byte_array().to_vec())?,
            OP_SHA1 => self.hash_top(|data| sha1::Hash::hash(data).to_byte_array().to_vec())?,
            OP_SHA256 => self.hash_top(|data| sha256::Hash::hash(data).to_byte_array().to_vec())?,
            OP_HASH160 => self.hash_top(|data| hash160::Hash::hash(data).to_byte_array().to_vec())?,
            OP_HASH256 => self.hash_top(|data| sha256d::Hash::hash(data).to_byte_array().to_vec())?,
            OP_CODESEPARATOR => self.last_separator = self.pc + 1,
            OP_CHECKSIG | OP_CHECKSIGVERIFY => {
                let pubkey = self.stack.pop()?;
                let sig = self.stack.pop()?;
                let code = script_code(
                    &self.scripts[self.script_idx],
                    self.last_separator,
                    core::slice::from_ref(&sig),
                );
                let valid = self.checker.check_sig(&sig, &pubkey, &code)?;
                self.stack.push_bool(valid)?;
                if opcode == OP_CHECKSIGVERIFY {
                    self.verify_top()?;
                }
            }
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                self.op_checkmultisig()?;
                if opcode == OP_CHECKMULTISIGVERIFY {
                    self.verify_top()?;
                }
            }

            OP_CHECKLOCKTIMEVERIFY => self.op_checklocktimeverify()?,

            // Disabled, always-illegal and invalid opcodes are rejected before dispatch.
            _ => return Err(ScriptError::InvalidOpcode),
        }

        Ok(None)
    }

    fn pop_num(&mut self) -> Result<ScriptNum, ScriptError> {
        let minimal = self.flags.minimal_data();
        self.stack.pop_num(DEFAULT_SCRIPT_NUM_LEN, minimal)
    }

    fn verify_top(&mut self) -> Result<(), ScriptError> {
        if self.stack.pop_bool()? {
            Ok(())
        } else {
            Err(ScriptError::VerifyFailed)
        }
    }

    fn hash_top(&mut self, hash: impl FnOnce(&[u8]) -> Vec<u8>) -> Result<(), ScriptError> {
        let data = self.stack.pop()?;
        self.stack.push(hash(&data))
    }

    fn op_checkmultisig(&mut self) -> Result<(), ScriptError> {
        let n_keys = self.pop_num()?.value();
        if n_keys < 0 || n_keys as usize > self.config.max_pubkeys_per_multisig {
            return Err(ScriptError::TooManyPubKeys);
        }
        let n_keys = n_keys as usize;
        if self.op_fresh {
            self.add_ops(n_keys)?;
        }

        let mut pubkeys = Vec::with_capacity(n_keys);
        for _ in 0..n_keys {
            pubkeys.push(self.stack.pop()?);
        }

        let n_sigs = self.pop_num()?.value();
        if n_sigs < 0 || n_sigs as usize > n_keys {
            return Err(ScriptError::InvalidArgs);
        }
        let mut sigs = Vec::with_capacity(n_sigs as usize);
        for _ in 0..n_sigs {
            sigs.push(self.stack.pop()?);
        }

        // Extra element consumed by CHECKMULTISIG.
        self.stack.pop()?;

        pubkeys.reverse();
        sigs.reverse();
        let code = script_code(&self.scripts[self.script_idx], self.last_separator, &sigs);
        let valid = self.checker.check_multisig(&sigs, &pubkeys, &code)?;
        self.stack.push_bool(valid)
    }

    fn op_checklocktimeverify(&mut self) -> Result<(), ScriptError> {
        let minimal = self.flags.minimal_data();
        let lock_time = self.stack.peek_num(0, LOCKTIME_SCRIPT_NUM_LEN, minimal)?.value();
        if lock_time < LOCK_TIME_THRESHOLD as i64 {
            return Err(ScriptError::EarlyTimestamp);
        }

        let tx_lock = self.tx.lock_time.to_consensus_u32() as i64;
        if tx_lock < LOCK_TIME_THRESHOLD as i64 || lock_time > tx_lock {
            return Err(ScriptError::VerifyFailed);
        }
        if self.tx.input[self.input_index].sequence == Sequence::MAX {
            return Err(ScriptError::VerifyFailed);
        }
        Ok(())
    }
}

fn checked_mul(a: i64, b: i64) -> Result<i64, ScriptError> {
    let result = ScriptNum(a * b);
    if !result.fits_default_width() {
        return Err(ScriptError::MulOverflow);
    }
    Ok(result.value())
}

fn left_shift(value: i64, count: i64) -> Result<i64, ScriptError> {
    if count < 0 {
        return Err(ScriptError::NegativeShift);
    }
    if value == 0 {
        return Ok(0);
    }
    if count >= 32 {
        return Err(ScriptError::ShiftOverflow);
    }
    let result = ScriptNum(value << count);
    if !result.fits_default_width() {
        return Err(ScriptError::ShiftOverflow);
    }
    Ok(result.value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_bounds() {
        assert_eq!(checked_mul(65_536, 32_767), Ok(2_147_418_112));
        assert_eq!(checked_mul(i32::MAX as i64, 2), Err(ScriptError::MulOverflow));
        assert_eq!(checked_mul(-(i32::MAX as i64), -1), Ok(i32::MAX as i64));
    }

    #[test]
    fn shift_bounds() {
        assert_eq!(left_shift(1, 30), Ok(1 << 30));
        assert_eq!(left_shift(1, 31), Err(ScriptError::ShiftOverflow));
        assert_eq!(left_shift(0, 100), Ok(0));
        assert_eq!(left_shift(1, -1), Err(ScriptError::NegativeShift));
        assert_eq!(left_shift(-3, 2), Ok(-12));
    }
}
