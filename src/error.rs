//! The closed set of failures a verification call can report.

use thiserror::Error;

/// Every way a script verification can be rejected.
///
/// The taxonomy is flat: each variant is a terminal outcome of a single
/// verification call and carries no nested cause.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Error)]
pub enum ScriptError {
    // Parsing and format.
    #[error("execute past end of script")]
    ShortScript,
    #[error("script is longer than maximum allowed")]
    LongScript,
    #[error("incorrect script format")]
    ScriptFormat,

    // Stack.
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("element in script too large")]
    ElementTooBig,
    #[error("invalid argument")]
    InvalidArgs,

    // Control flow.
    #[error("OP_ELSE or OP_ENDIF with no matching OP_IF")]
    NoIf,
    #[error("OP_ENDWHILE with no matching OP_WHILE")]
    NoWhile,
    #[error("conditional opened but not closed")]
    MissingEnd,
    #[error("script returned early")]
    EarlyReturn,
    #[error("verify failed")]
    VerifyFailed,

    // Opcodes.
    #[error("disabled opcode")]
    DisabledOpcode,
    #[error("reserved opcode")]
    ReservedOpcode,
    #[error("invalid opcode")]
    InvalidOpcode,
    #[error("too many operations in script")]
    TooManyOperations,
    #[error("script version")]
    ScriptVersion,

    // Numbers.
    #[error("number too big")]
    NumberTooBig,
    #[error("non-minimally encoded script number")]
    MinimalData,
    #[error("divide by zero")]
    DivideByZero,
    #[error("overflow in MUL")]
    MulOverflow,
    #[error("negative shift")]
    NegativeShift,
    #[error("shift overflow")]
    ShiftOverflow,
    #[error("early CHECKLOCKTIMEVERIFY timestamp")]
    EarlyTimestamp,

    // Signature policy.
    #[error("invalid low s signature")]
    InvalidLowSSignature,
    #[error("invalid strict pubkey")]
    InvalidStrictEncoding,
    #[error("invalid pubkey count in OP_CHECKMULTISIG")]
    TooManyPubKeys,

    // Verdict.
    #[error("stack empty at end of execution")]
    EmptyStack,
    #[error("execute fail, fail on stack")]
    ScriptFailed,
    #[error("error check when script unfinished")]
    ScriptUnfinished,
    #[error("stack is not clean")]
    CleanStack,
    #[error("pay to script hash with non pushonly input")]
    P2shNonPushOnly,

    // Templates and caller-side inputs.
    #[error("non-recognised address")]
    UnknownAddress,
    #[error("invalid script index")]
    InvalidScriptIndex,
    #[error("SigScript is non pushonly")]
    NonPushOnly,
    #[error("wrong number of bytes for contract hash")]
    ContractHashLength,
    #[error("wrong number of bytes for asset id")]
    AssetIdLength,
    #[error("invalid flags combination")]
    InvalidFlags,
    #[error("invalid input index")]
    InvalidIndex,
    #[error("unsupported address type")]
    UnsupportedAddress,
    #[error("more signatures required than keys present")]
    BadNumRequired,
}
