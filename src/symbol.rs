use std::fmt;

/// Opcode words are written as the code point `OPCODE_BASE + index` in hex, so `10` is `MOV` and
/// `16` is `OUT`.
pub const OPCODE_BASE: i64 = 0x10;

/// Amount of general purpose registers.
pub const REGISTER_COUNT: usize = 8;

/// Leading character of a label token (case-insensitive).
pub const LABEL_SIGIL: char = 'A';
/// Leading character of a register operand (case-insensitive).
pub const REGISTER_SIGIL: char = 'R';
/// Leading character of an immediate operand (case-insensitive).
pub const IMMEDIATE_SIGIL: char = 'C';

/// The closed set of instructions, in code point order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Opcode {
    /// `dst <- src`
    Mov = 0,
    /// `dst <- dst + src`
    Add,
    /// `dst <- dst * src`
    Mul,
    /// `flag <- a < b`
    Clt,
    /// Jump if flag is false
    Jne,
    /// Jump if flag is true
    Jeq,
    /// Print a value
    Out,
}

impl Opcode {
    /// Every opcode, indexed by its table position.
    pub const ALL: [Opcode; 7] = [
        Opcode::Mov,
        Opcode::Add,
        Opcode::Mul,
        Opcode::Clt,
        Opcode::Jne,
        Opcode::Jeq,
        Opcode::Out,
    ];

    /// Look up an opcode by table index. Indices past [`Opcode::Out`] are not opcodes, including
    /// the slots reserved for operand and label markers.
    pub fn from_index(index: i64) -> Option<Opcode> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i))
            .copied()
    }

    /// Look up an opcode by its decoded code point.
    pub fn from_code_point(code: i64) -> Option<Opcode> {
        Self::from_index(code.checked_sub(OPCODE_BASE)?)
    }

    pub fn code_point(self) -> i64 {
        OPCODE_BASE + self as i64
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Amount of operand slots consumed after the opcode itself.
    pub fn arity(self) -> usize {
        match self {
            Opcode::Mov | Opcode::Add | Opcode::Mul | Opcode::Clt => 2,
            Opcode::Jne | Opcode::Jeq | Opcode::Out => 1,
        }
    }

    pub fn is_cond_jump(self) -> bool {
        matches!(self, Opcode::Jne | Opcode::Jeq)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Mov => "MOV",
            Opcode::Add => "ADD",
            Opcode::Mul => "MUL",
            Opcode::Clt => "CLT",
            Opcode::Jne => "JNE",
            Opcode::Jeq => "JEQ",
            Opcode::Out => "OUT",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.mnemonic())
    }
}

/// Role of a token, decided once while building.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tag {
    Op(Opcode),
    Reg,
    Imm,
    Label,
    /// Matched no rule. Only an error if executed.
    Unresolved,
}

impl Tag {
    pub fn describe(&self) -> &'static str {
        match self {
            Tag::Op(_) => "opcode",
            Tag::Reg => "register",
            Tag::Imm => "immediate",
            Tag::Label => "label",
            Tag::Unresolved => "unknown token",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Op(op) => f.pad(op.mnemonic()),
            Tag::Reg => f.pad("REG"),
            Tag::Imm => f.pad("IMM"),
            Tag::Label => f.pad("LBL"),
            Tag::Unresolved => f.pad("???"),
        }
    }
}

/// Index into the register file, always within `0..REGISTER_COUNT`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Register(u8);

impl Register {
    pub fn new(index: i64) -> Option<Register> {
        if (0..REGISTER_COUNT as i64).contains(&index) {
            Some(Register(index as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Result of the last `CLT`, consumed by the next conditional jump.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum CmpFlag {
    True,
    False,
    #[default]
    Indeterminate,
}

impl From<bool> for CmpFlag {
    fn from(value: bool) -> Self {
        if value {
            CmpFlag::True
        } else {
            CmpFlag::False
        }
    }
}

impl fmt::Display for CmpFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CmpFlag::True => f.write_str("T"),
            CmpFlag::False => f.write_str("F"),
            CmpFlag::Indeterminate => f.write_str("-"),
        }
    }
}

/// Reason a hex numeral could not be decoded.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HexError {
    /// Not a numeral at all.
    Malformed,
    /// A numeral, but too large for 64 bits.
    Overflow,
}

/// Decode a whole string as a signed base-16 numeral. Accepts an optional sign followed by an
/// optional `0x` prefix.
pub fn decode_hex(text: &str) -> Result<i64, HexError> {
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
        .unwrap_or(rest);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HexError::Malformed);
    }
    // Parse unsigned so that `-8000000000000000` still fits
    let magnitude = u64::from_str_radix(digits, 16).map_err(|_| HexError::Overflow)?;
    if negative {
        0i64.checked_sub_unsigned(magnitude).ok_or(HexError::Overflow)
    } else {
        i64::try_from(magnitude).map_err(|_| HexError::Overflow)
    }
}

/// Case-insensitive check of a token's leading character.
pub fn has_sigil(text: &str, sigil: char) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.eq_ignore_ascii_case(&sigil))
}
