//! Decides the role of a single word.
//!
//! Rules are tried in order:
//! 1. A leading label sigil makes a label.
//! 2. A hex numeral whose code point is in the opcode table makes an opcode.
//! 3. A leading register sigil makes a register operand.
//! 4. A leading immediate sigil makes an immediate operand.
//!
//! A numeral that failed rule 2 and matched neither operand rule is an unknown opcode. Anything
//! else stays unresolved.

use crate::symbol::{
    decode_hex, has_sigil, HexError, Opcode, Tag, IMMEDIATE_SIGIL, LABEL_SIGIL, REGISTER_SIGIL,
};

/// Outcome of classifying one word.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Class {
    Tagged(Tag),
    /// A numeral outside the opcode table.
    UnknownOpcode,
}

/// Whether a label token marks a position or names a jump target.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LabelRole {
    Definition,
    Reference,
}

pub fn classify(text: &str) -> Class {
    if has_sigil(text, LABEL_SIGIL) {
        return Class::Tagged(Tag::Label);
    }

    // Failure here only defers to the operand rules
    let numeral = decode_hex(text);
    if let Some(op) = numeral.ok().and_then(Opcode::from_code_point) {
        return Class::Tagged(Tag::Op(op));
    }

    if has_sigil(text, REGISTER_SIGIL) {
        Class::Tagged(Tag::Reg)
    } else if has_sigil(text, IMMEDIATE_SIGIL) {
        Class::Tagged(Tag::Imm)
    } else if numeral != Err(HexError::Malformed) {
        Class::UnknownOpcode
    } else {
        Class::Tagged(Tag::Unresolved)
    }
}

/// A label directly after a conditional jump is that jump's target; any other label defines one.
pub fn label_role(prev: Option<Tag>) -> LabelRole {
    match prev {
        Some(Tag::Op(op)) if op.is_cond_jump() => LabelRole::Reference,
        _ => LabelRole::Definition,
    }
}
