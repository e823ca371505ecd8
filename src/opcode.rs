//! The opcode table.
//!
//! Every byte value maps to exactly one [`Opcode`] variant. Bytes `0x01..=0x4b`
//! push that many bytes of inline data, `OP_PUSHDATA1/2/4` carry a little-endian
//! length prefix, and everything above `OP_16` is an operation that counts toward
//! the per-verification op budget.

use core::fmt;

macro_rules! opcodes {
    ($($byte:literal => $name:ident,)*) => {
        /// A single script opcode.
        #[allow(non_camel_case_types)]
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $($name = $byte,)*
        }

        static OPCODE_TABLE: [Opcode; 256] = [$(Opcode::$name,)*];

        impl Opcode {
            /// Canonical `OP_*` name.
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$name => stringify!($name),)*
                }
            }
        }
    };
}

opcodes! {
    0x00 => OP_0,
    0x01 => OP_DATA_1,
    0x02 => OP_DATA_2,
    0x03 => OP_DATA_3,
    0x04 => OP_DATA_4,
    0x05 => OP_DATA_5,
    0x06 => OP_DATA_6,
    0x07 => OP_DATA_7,
    0x08 => OP_DATA_8,
    0x09 => OP_DATA_9,
    0x0a => OP_DATA_10,
    0x0b => OP_DATA_11,
    0x0c => OP_DATA_12,
    0x0d => OP_DATA_13,
    0x0e => OP_DATA_14,
    0x0f => OP_DATA_15,
    0x10 => OP_DATA_16,
    0x11 => OP_DATA_17,
    0x12 => OP_DATA_18,
    0x13 => OP_DATA_19,
    0x14 => OP_DATA_20,
    0x15 => OP_DATA_21,
    0x16 => OP_DATA_22,
    0x17 => OP_DATA_23,
    0x18 => OP_DATA_24,
    0x19 => OP_DATA_25,
    0x1a => OP_DATA_26,
    0x1b => OP_DATA_27,
    0x1c => OP_DATA_28,
    0x1d => OP_DATA_29,
    0x1e => OP_DATA_30,
    0x1f => OP_DATA_31,
    0x20 => OP_DATA_32,
    0x21 => OP_DATA_33,
    0x22 => OP_DATA_34,
    0x23 => OP_DATA_35,
    0x24 => OP_DATA_36,
    0x25 => OP_DATA_37,
    0x26 => OP_DATA_38,
    0x27 => OP_DATA_39,
    0x28 => OP_DATA_40,
    0x29 => OP_DATA_41,
    0x2a => OP_DATA_42,
    0x2b => OP_DATA_43,
    0x2c => OP_DATA_44,
    0x2d => OP_DATA_45,
    0x2e => OP_DATA_46,
    0x2f => OP_DATA_47,
    0x30 => OP_DATA_48,
    0x31 => OP_DATA_49,
    0x32 => OP_DATA_50,
    0x33 => OP_DATA_51,
    0x34 => OP_DATA_52,
    0x35 => OP_DATA_53,
    0x36 => OP_DATA_54,
    0x37 => OP_DATA_55,
    0x38 => OP_DATA_56,
    0x39 => OP_DATA_57,
    0x3a => OP_DATA_58,
    0x3b => OP_DATA_59,
    0x3c => OP_DATA_60,
    0x3d => OP_DATA_61,
    0x3e => OP_DATA_62,
    0x3f => OP_DATA_63,
    0x40 => OP_DATA_64,
    0x41 => OP_DATA_65,
    0x42 => OP_DATA_66,
    0x43 => OP_DATA_67,
    0x44 => OP_DATA_68,
    0x45 => OP_DATA_69,
    0x46 => OP_DATA_70,
    0x47 => OP_DATA_71,
    0x48 => OP_DATA_72,
    0x49 => OP_DATA_73,
    0x4a => OP_DATA_74,
    0x4b => OP_DATA_75,
    0x4c => OP_PUSHDATA1,
    0x4d => OP_PUSHDATA2,
    0x4e => OP_PUSHDATA4,
    0x4f => OP_1NEGATE,
    0x50 => OP_RESERVED,
    0x51 => OP_1,
    0x52 => OP_2,
    0x53 => OP_3,
    0x54 => OP_4,
    0x55 => OP_5,
    0x56 => OP_6,
    0x57 => OP_7,
    0x58 => OP_8,
    0x59 => OP_9,
    0x5a => OP_10,
    0x5b => OP_11,
    0x5c => OP_12,
    0x5d => OP_13,
    0x5e => OP_14,
    0x5f => OP_15,
    0x60 => OP_16,
    0x61 => OP_NOP,
    0x62 => OP_VER,
    0x63 => OP_IF,
    0x64 => OP_NOTIF,
    0x65 => OP_VERIF,
    0x66 => OP_VERNOTIF,
    0x67 => OP_ELSE,
    0x68 => OP_ENDIF,
    0x69 => OP_VERIFY,
    0x6a => OP_RETURN,
    0x6b => OP_TOALTSTACK,
    0x6c => OP_FROMALTSTACK,
    0x6d => OP_2DROP,
    0x6e => OP_2DUP,
    0x6f => OP_3DUP,
    0x70 => OP_2OVER,
    0x71 => OP_2ROT,
    0x72 => OP_2SWAP,
    0x73 => OP_IFDUP,
    0x74 => OP_DEPTH,
    0x75 => OP_DROP,
    0x76 => OP_DUP,
    0x77 => OP_NIP,
    0x78 => OP_OVER,
    0x79 => OP_PICK,
    0x7a => OP_ROLL,
    0x7b => OP_ROT,
    0x7c => OP_SWAP,
    0x7d => OP_TUCK,
    0x7e => OP_CAT,
    0x7f => OP_SUBSTR,
    0x80 => OP_LEFT,
    0x81 => OP_RIGHT,
    0x82 => OP_SIZE,
    0x83 => OP_INVERT,
    0x84 => OP_AND,
    0x85 => OP_OR,
    0x86 => OP_XOR,
    0x87 => OP_EQUAL,
    0x88 => OP_EQUALVERIFY,
    0x89 => OP_RESERVED1,
    0x8a => OP_RESERVED2,
    0x8b => OP_1ADD,
    0x8c => OP_1SUB,
    0x8d => OP_2MUL,
    0x8e => OP_2DIV,
    0x8f => OP_NEGATE,
    0x90 => OP_ABS,
    0x91 => OP_NOT,
    0x92 => OP_0NOTEQUAL,
    0x93 => OP_ADD,
    0x94 => OP_SUB,
    0x95 => OP_MUL,
    0x96 => OP_DIV,
    0x97 => OP_MOD,
    0x98 => OP_LSHIFT,
    0x99 => OP_RSHIFT,
    0x9a => OP_BOOLAND,
    0x9b => OP_BOOLOR,
    0x9c => OP_NUMEQUAL,
    0x9d => OP_NUMEQUALVERIFY,
    0x9e => OP_NUMNOTEQUAL,
    0x9f => OP_LESSTHAN,
    0xa0 => OP_GREATERTHAN,
    0xa1 => OP_LESSTHANOREQUAL,
    0xa2 => OP_GREATERTHANOREQUAL,
    0xa3 => OP_MIN,
    0xa4 => OP_MAX,
    0xa5 => OP_WITHIN,
    0xa6 => OP_RIPEMD160,
    0xa7 => OP_SHA1,
    0xa8 => OP_SHA256,
    0xa9 => OP_HASH160,
    0xaa => OP_HASH256,
    0xab => OP_CODESEPARATOR,
    0xac => OP_CHECKSIG,
    0xad => OP_CHECKSIGVERIFY,
    0xae => OP_CHECKMULTISIG,
    0xaf => OP_CHECKMULTISIGVERIFY,
    0xb0 => OP_NOP1,
    0xb1 => OP_CHECKLOCKTIMEVERIFY,
    0xb2 => OP_NOP3,
    0xb3 => OP_NOP4,
    0xb4 => OP_NOP5,
    0xb5 => OP_NOP6,
    0xb6 => OP_NOP7,
    0xb7 => OP_NOP8,
    0xb8 => OP_NOP9,
    0xb9 => OP_NOP10,
    0xba => OP_UNKNOWN186,
    0xbb => OP_WHILE,
    0xbc => OP_ENDWHILE,
    0xbd => OP_UNKNOWN189,
    0xbe => OP_UNKNOWN190,
    0xbf => OP_UNKNOWN191,
    0xc0 => OP_UNKNOWN192,
    0xc1 => OP_UNKNOWN193,
    0xc2 => OP_UNKNOWN194,
    0xc3 => OP_UNKNOWN195,
    0xc4 => OP_UNKNOWN196,
    0xc5 => OP_UNKNOWN197,
    0xc6 => OP_UNKNOWN198,
    0xc7 => OP_UNKNOWN199,
    0xc8 => OP_UNKNOWN200,
    0xc9 => OP_UNKNOWN201,
    0xca => OP_UNKNOWN202,
    0xcb => OP_UNKNOWN203,
    0xcc => OP_UNKNOWN204,
    0xcd => OP_UNKNOWN205,
    0xce => OP_UNKNOWN206,
    0xcf => OP_UNKNOWN207,
    0xd0 => OP_UNKNOWN208,
    0xd1 => OP_UNKNOWN209,
    0xd2 => OP_UNKNOWN210,
    0xd3 => OP_UNKNOWN211,
    0xd4 => OP_UNKNOWN212,
    0xd5 => OP_UNKNOWN213,
    0xd6 => OP_UNKNOWN214,
    0xd7 => OP_UNKNOWN215,
    0xd8 => OP_UNKNOWN216,
    0xd9 => OP_UNKNOWN217,
    0xda => OP_UNKNOWN218,
    0xdb => OP_UNKNOWN219,
    0xdc => OP_UNKNOWN220,
    0xdd => OP_UNKNOWN221,
    0xde => OP_UNKNOWN222,
    0xdf => OP_UNKNOWN223,
    0xe0 => OP_UNKNOWN224,
    0xe1 => OP_UNKNOWN225,
    0xe2 => OP_UNKNOWN226,
    0xe3 => OP_UNKNOWN227,
    0xe4 => OP_UNKNOWN228,
    0xe5 => OP_UNKNOWN229,
    0xe6 => OP_UNKNOWN230,
    0xe7 => OP_UNKNOWN231,
    0xe8 => OP_UNKNOWN232,
    0xe9 => OP_UNKNOWN233,
    0xea => OP_UNKNOWN234,
    0xeb => OP_UNKNOWN235,
    0xec => OP_UNKNOWN236,
    0xed => OP_UNKNOWN237,
    0xee => OP_UNKNOWN238,
    0xef => OP_UNKNOWN239,
    0xf0 => OP_UNKNOWN240,
    0xf1 => OP_UNKNOWN241,
    0xf2 => OP_UNKNOWN242,
    0xf3 => OP_UNKNOWN243,
    0xf4 => OP_UNKNOWN244,
    0xf5 => OP_UNKNOWN245,
    0xf6 => OP_UNKNOWN246,
    0xf7 => OP_UNKNOWN247,
    0xf8 => OP_UNKNOWN248,
    0xf9 => OP_UNKNOWN249,
    0xfa => OP_UNKNOWN250,
    0xfb => OP_UNKNOWN251,
    0xfc => OP_UNKNOWN252,
    0xfd => OP_UNKNOWN253,
    0xfe => OP_UNKNOWN254,
    0xff => OP_INVALIDOPCODE,
}

/// Script version at which the loop and extended arithmetic opcodes become legal.
pub const LOOP_SCRIPT_VERSION: i32 = 2;

impl Opcode {
    #[inline]
    pub fn from_u8(byte: u8) -> Self {
        OPCODE_TABLE[byte as usize]
    }

    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Looks an opcode up by name, with or without the `OP_` prefix.
    pub fn from_name(name: &str) -> Option<Self> {
        let bare = name.strip_prefix("OP_").unwrap_or(name);
        OPCODE_TABLE
            .iter()
            .copied()
            .find(|op| &op.name()[3..] == bare)
            .or(match bare {
                "FALSE" => Some(Opcode::OP_0),
                "TRUE" => Some(Opcode::OP_1),
                "CLTV" => Some(Opcode::OP_CHECKLOCKTIMEVERIFY),
                _ => None,
            })
    }

    /// Number of bytes in the length prefix for `OP_PUSHDATA*`.
    pub fn length_prefix_width(self) -> Option<usize> {
        match self {
            Opcode::OP_PUSHDATA1 => Some(1),
            Opcode::OP_PUSHDATA2 => Some(2),
            Opcode::OP_PUSHDATA4 => Some(4),
            _ => None,
        }
    }

    /// Opcodes that push inline data: `OP_0`, `OP_DATA_*` and `OP_PUSHDATA*`.
    #[inline]
    pub fn is_data_push(self) -> bool {
        self.to_u8() <= Opcode::OP_PUSHDATA4.to_u8()
    }

    /// True for everything that only pushes, which includes the small integers
    /// and `OP_RESERVED`.
    #[inline]
    pub fn is_push(self) -> bool {
        self.to_u8() <= Opcode::OP_16.to_u8()
    }

    #[inline]
    pub fn counts_toward_op_limit(self) -> bool {
        !self.is_push()
    }

    /// Value of `OP_0`, `OP_1NEGATE` and `OP_1`..`OP_16`.
    pub fn small_int(self) -> Option<i64> {
        match self {
            Opcode::OP_0 => Some(0),
            Opcode::OP_1NEGATE => Some(-1),
            op if (Opcode::OP_1.to_u8()..=Opcode::OP_16.to_u8()).contains(&op.to_u8()) => {
                Some((op.to_u8() - Opcode::OP_1.to_u8() + 1) as i64)
            }
            _ => None,
        }
    }

    /// The opcode pushing the small integer `n` (`0..=16`).
    pub fn from_small_int(n: u8) -> Option<Self> {
        match n {
            0 => Some(Opcode::OP_0),
            1..=16 => Some(Opcode::from_u8(Opcode::OP_1.to_u8() + n - 1)),
            _ => None,
        }
    }

    /// Disabled opcodes fail wherever they appear, including untaken branches.
    pub fn is_disabled(self) -> bool {
        use Opcode::*;

        matches!(
            self,
            OP_CAT | OP_SUBSTR | OP_LEFT | OP_RIGHT | OP_INVERT | OP_AND | OP_OR | OP_XOR
        )
    }

    /// Reserved opcodes that fail even when not executed.
    pub fn is_always_illegal(self) -> bool {
        matches!(self, Opcode::OP_VERIF | Opcode::OP_VERNOTIF)
    }

    /// Opcodes the control-flow tracker must see inside skipped blocks.
    pub fn is_conditional(self) -> bool {
        use Opcode::*;

        matches!(
            self,
            OP_IF | OP_NOTIF | OP_ELSE | OP_ENDIF | OP_WHILE | OP_ENDWHILE
        )
    }

    /// Lowest script version allowed to use this opcode.
    pub fn min_script_version(self) -> i32 {
        use Opcode::*;

        match self {
            OP_WHILE | OP_ENDWHILE | OP_2MUL | OP_2DIV | OP_MUL | OP_DIV | OP_MOD | OP_LSHIFT
            | OP_RSHIFT => LOOP_SCRIPT_VERSION,
            _ => 1,
        }
    }

    /// Unassigned byte values and `OP_INVALIDOPCODE`.
    pub fn is_invalid(self) -> bool {
        let byte = self.to_u8();
        byte == Opcode::OP_UNKNOWN186.to_u8() || byte > Opcode::OP_ENDWHILE.to_u8()
    }
}

impl From<u8> for Opcode {
    fn from(byte: u8) -> Self {
        Opcode::from_u8(byte)
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        op.to_u8()
    }
}

impl From<Opcode> for bitcoin::opcodes::Opcode {
    fn from(op: Opcode) -> Self {
        bitcoin::opcodes::Opcode::from(op.to_u8())
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
