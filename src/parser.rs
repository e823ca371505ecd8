//! Script decoding.
//!
//! Raw script bytes are turned into [`ParsedOp`]s either lazily through
//! [`Instructions`] or eagerly through [`parse_script`], which also applies the
//! maximum script length.

use core::fmt;

use bitcoin::script::{Instruction, InstructionIndices, Script};

use crate::{error::ScriptError, opcode::Opcode};

/// One decoded operation: the opcode and any inline push data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOp {
    pub opcode: Opcode,
    pub data: Vec<u8>,
}

impl ParsedOp {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            data: Vec::new(),
        }
    }

    pub fn push(opcode: Opcode, data: Vec<u8>) -> Self {
        Self { opcode, data }
    }

    /// Serialized size in bytes, including the length prefix.
    pub fn encoded_len(&self) -> usize {
        1 + self.opcode.length_prefix_width().unwrap_or(0) + self.data.len()
    }

    /// Appends the wire form of this op to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.opcode.to_u8());
        match self.opcode.length_prefix_width() {
            Some(1) => out.push(self.data.len() as u8),
            Some(2) => out.extend_from_slice(&(self.data.len() as u16).to_le_bytes()),
            Some(4) => out.extend_from_slice(&(self.data.len() as u32).to_le_bytes()),
            _ => {}
        }
        out.extend_from_slice(&self.data);
    }

    /// Whether this push uses the smallest encoding available for its data.
    pub fn is_minimal_push(&self) -> bool {
        let data = &self.data;
        let opcode = self.opcode.to_u8();

        if data.is_empty() {
            return self.opcode == Opcode::OP_0;
        }
        if data.len() == 1 {
            let value = data[0];
            if value == 0x81 {
                return self.opcode == Opcode::OP_1NEGATE;
            }
            if (1..=16).contains(&value) {
                return opcode == Opcode::OP_1.to_u8() + value - 1;
            }
        }
        if data.len() <= 75 {
            return opcode as usize == data.len();
        }
        if data.len() <= 0xff {
            return self.opcode == Opcode::OP_PUSHDATA1;
        }
        if data.len() <= 0xffff {
            return self.opcode == Opcode::OP_PUSHDATA2;
        }
        self.opcode == Opcode::OP_PUSHDATA4
    }
}

impl fmt::Display for ParsedOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.opcode.is_data_push() {
            if self.data.is_empty() {
                return f.write_str("0");
            }
            for byte in &self.data {
                write!(f, "{byte:02x}")?;
            }
            return Ok(());
        }
        match self.opcode.small_int() {
            Some(n) => write!(f, "{n}"),
            None => f.write_str(self.opcode.name()),
        }
    }
}

/// Lazy decoder over script bytes, layered on [`bitcoin::Script::instruction_indices`].
/// Yields at most one error, then stops.
#[derive(Debug, Clone)]
pub struct Instructions<'a> {
    bytes: &'a [u8],
    inner: InstructionIndices<'a>,
}

impl<'a> Instructions<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            inner: Script::from_bytes(bytes).instruction_indices(),
        }
    }

    fn to_parsed(&self, pos: usize, instruction: Instruction<'a>) -> ParsedOp {
        // The byte at `pos` distinguishes OP_0, OP_DATA_n and OP_PUSHDATA1/2/4,
        // and carries opcodes the `bitcoin` table does not name.
        let opcode = Opcode::from_u8(self.bytes[pos]);
        match instruction {
            Instruction::PushBytes(data) => ParsedOp::push(opcode, data.as_bytes().to_vec()),
            Instruction::Op(_) => ParsedOp::new(opcode),
        }
    }
}

impl Iterator for Instructions<'_> {
    type Item = Result<ParsedOp, ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        // Without minimal-push enforcement the only failure is a push running
        // past the end of the script.
        let item = self.inner.next()?;
        Some(
            item.map(|(pos, instruction)| self.to_parsed(pos, instruction))
                .map_err(|_| ScriptError::ShortScript),
        )
    }
}

impl core::iter::FusedIterator for Instructions<'_> {}

/// Decodes a whole script, rejecting it if it exceeds `max_size` bytes.
pub fn parse_script(bytes: &[u8], max_size: usize) -> Result<Vec<ParsedOp>, ScriptError> {
    if bytes.len() > max_size {
        return Err(ScriptError::LongScript);
    }
    Instructions::new(bytes).collect()
}

/// Re-serializes a sequence of ops.
pub fn encode_ops(ops: &[ParsedOp]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ops.iter().map(ParsedOp::encoded_len).sum());
    for op in ops {
        op.encode(&mut out);
    }
    out
}

pub(crate) fn ops_push_only(ops: &[ParsedOp]) -> bool {
    ops.iter().all(|op| op.opcode.is_push())
}

/// True when the script parses and contains only push operations.
/// `OP_RESERVED` counts as a push here.
pub fn is_push_only(bytes: &[u8]) -> bool {
    Instructions::new(bytes).all(|op| matches!(op, Ok(op) if op.opcode.is_push()))
}

/// Returns the data of every push in a push-only script.
pub fn pushed_data(bytes: &[u8]) -> Result<Vec<Vec<u8>>, ScriptError> {
    let mut pushes = Vec::new();
    for op in Instructions::new(bytes) {
        let op = op?;
        if !op.opcode.is_push() {
            return Err(ScriptError::NonPushOnly);
        }
        pushes.push(op.data);
    }
    Ok(pushes)
}

pub(crate) fn disasm_ops(ops: &[ParsedOp]) -> String {
    ops.iter()
        .map(ParsedOp::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// One-line disassembly. A malformed tail is rendered as `[error]`.
pub fn disasm(bytes: &[u8]) -> String {
    let mut parts = Vec::new();
    for op in Instructions::new(bytes) {
        match op {
            Ok(op) => parts.push(op.to_string()),
            Err(_) => parts.push("[error]".to_string()),
        }
    }
    parts.join(" ")
}
