//! Verification flags and engine limits.

use crate::{
    error::ScriptError, VERIFY_CLEANSTACK, VERIFY_LOW_S, VERIFY_MINIMALDATA, VERIFY_P2SH,
    VERIFY_P2SH_PUSHONLY, VERIFY_SCRIPT_VERSION, VERIFY_STRICTENC, VERIFY_STRICT_PUBKEY,
};

const SUPPORTED_FLAGS: u32 = VERIFY_P2SH
    | VERIFY_STRICTENC
    | VERIFY_LOW_S
    | VERIFY_STRICT_PUBKEY
    | VERIFY_MINIMALDATA
    | VERIFY_CLEANSTACK
    | VERIFY_P2SH_PUSHONLY
    | VERIFY_SCRIPT_VERSION;

/// Wrapper for script verification flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScriptFlags(u32);

impl ScriptFlags {
    pub fn from_bits(bits: u32) -> Result<Self, ScriptError> {
        if bits & !SUPPORTED_FLAGS != 0 {
            return Err(ScriptError::InvalidFlags);
        }
        if bits & VERIFY_CLEANSTACK != 0 && bits & VERIFY_P2SH == 0 {
            return Err(ScriptError::InvalidFlags);
        }
        Ok(Self(bits))
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn has(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn p2sh(self) -> bool {
        self.has(VERIFY_P2SH)
    }

    pub fn strict_encoding(self) -> bool {
        self.has(VERIFY_STRICTENC)
    }

    pub fn low_s(self) -> bool {
        self.has(VERIFY_LOW_S)
    }

    pub fn strict_pubkey(self) -> bool {
        self.has(VERIFY_STRICT_PUBKEY)
    }

    pub fn minimal_data(self) -> bool {
        self.has(VERIFY_MINIMALDATA)
    }

    pub fn clean_stack(self) -> bool {
        self.has(VERIFY_CLEANSTACK)
    }

    pub fn p2sh_push_only(self) -> bool {
        self.has(VERIFY_P2SH_PUSHONLY)
    }

    pub fn script_version(self) -> bool {
        self.has(VERIFY_SCRIPT_VERSION)
    }
}

/// How opcodes inside loops are charged against `max_ops`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopOpCounting {
    /// Every encounter of an opcode counts, so each iteration consumes budget.
    #[default]
    EveryIteration,
    /// An opcode counts only the first time its position is reached; each
    /// backward jump counts as one iteration instead.
    FirstPassOnly { max_iterations: usize },
}

/// Static resource limits applied to one verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptConfig {
    pub max_script_size: usize,
    pub max_ops: usize,
    pub max_stack_size: usize,
    pub max_element_size: usize,
    pub max_pubkeys_per_multisig: usize,
    pub loop_ops: LoopOpCounting,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            max_script_size: 10_000,
            max_ops: 201,
            max_stack_size: 1000,
            max_element_size: 520,
            max_pubkeys_per_multisig: 20,
            loop_ops: LoopOpCounting::EveryIteration,
        }
    }
}
