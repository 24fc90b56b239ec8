// Column stream instructions.
//
// Each instruction is zero or more prefix bytes (high bit set) followed by
// one opcode byte (high bit clear). The opcode's high nibble names the
// operation, its low nibble is part of the argument:
//
//     Skip / Delta / Copy       count = prefix * 16 + low nibble
//     SetDelta / SetNegDelta    delta = (prefix + 1) << (low nibble * 4)
//
// Literal0/Literal1 opcodes are special: the opcode byte IS the embedded
// scalar's type tag and the scalar body follows in place of a prefix. A zero
// opcode is the end-of-sequence sentinel.

use super::scalar::{Scalar, ScalarType};
use super::varint::{self, VarIntError};

// ---------------------------------------------------------------------------
// Operation kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Kind {
    /// Embedded scalar with type tag 0x00..=0x0F (0x00 is the sentinel).
    Literal0 = 0,
    /// Embedded scalar with type tag 0x10..=0x1F.
    Literal1 = 1,
    /// Advance the logical index without emitting values.
    Skip = 2,
    /// Re-apply the current delta `count` times.
    Delta = 3,
    /// Repeat the current value `count` times.
    Copy = 4,
    /// Set the current delta to a negative value and apply it once.
    SetNegDelta = 5,
    /// Set the current delta to a positive value and apply it once.
    SetDelta = 6,
}

impl Kind {
    fn from_opcode(op: u8) -> Option<Kind> {
        match op >> 4 {
            0 => Some(Kind::Literal0),
            1 => Some(Kind::Literal1),
            2 => Some(Kind::Skip),
            3 => Some(Kind::Delta),
            4 => Some(Kind::Copy),
            5 => Some(Kind::SetNegDelta),
            6 => Some(Kind::SetDelta),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Literal0 => "Literal0",
            Kind::Literal1 => "Literal1",
            Kind::Skip => "Skip",
            Kind::Delta => "Delta",
            Kind::Copy => "Copy",
            Kind::SetNegDelta => "SetNegDelta",
            Kind::SetDelta => "SetDelta",
        }
    }
}

// ---------------------------------------------------------------------------
// Instruction
// ---------------------------------------------------------------------------

/// A parsed or to-be-emitted stream instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    op: u8,
    prefix: u64,
}

impl Instruction {
    fn counted(kind: Kind, count: u64) -> Instruction {
        debug_assert!(matches!(kind, Kind::Skip | Kind::Delta | Kind::Copy));
        Instruction {
            op: ((kind as u8) << 4) | (count % 16) as u8,
            prefix: count / 16,
        }
    }

    pub fn skip(count: u64) -> Instruction {
        debug_assert!(count >= 1);
        Instruction::counted(Kind::Skip, count)
    }

    pub fn delta_run(count: u64) -> Instruction {
        debug_assert!(count >= 1);
        Instruction::counted(Kind::Delta, count)
    }

    pub fn copy(count: u64) -> Instruction {
        debug_assert!(count >= 1);
        Instruction::counted(Kind::Copy, count)
    }

    /// Build a Set(Neg)Delta, factoring out as many trailing zero nibbles of
    /// `arg` as the shift nibble can hold so the prefix stays minimal.
    fn set(kind: Kind, mut arg: u64) -> Instruction {
        debug_assert!(matches!(kind, Kind::SetNegDelta | Kind::SetDelta));
        debug_assert!(arg != 0);
        let mut op = (kind as u8) << 4;
        while arg % 16 == 0 && op % 16 < 15 {
            op += 1;
            arg /= 16;
        }
        Instruction { op, prefix: arg - 1 }
    }

    pub fn set_delta(delta: u64) -> Instruction {
        Instruction::set(Kind::SetDelta, delta)
    }

    /// `magnitude` is the negated delta, i.e. `delta.wrapping_neg()`.
    pub fn set_neg_delta(magnitude: u64) -> Instruction {
        Instruction::set(Kind::SetNegDelta, magnitude)
    }

    /// The smallest instruction encoding `delta`: the shorter of
    /// `SetDelta(delta)` and `SetNegDelta(-delta)`, positive on ties.
    pub fn best_delta(delta: u64) -> Instruction {
        let pos = Instruction::set_delta(delta);
        let neg = Instruction::set_neg_delta(delta.wrapping_neg());
        if neg.encoded_len() < pos.encoded_len() { neg } else { pos }
    }

    /// Parse one instruction from the front of `data`. Returns the
    /// instruction and the number of bytes consumed (prefix plus opcode).
    ///
    /// For literal kinds the consumed count covers only the opcode byte; the
    /// scalar body that follows is the caller's to read, starting at the
    /// opcode position.
    pub fn parse(data: &[u8]) -> Result<(Instruction, usize), InstructionError> {
        let (prefix, used) = varint::read_prefix(data)?;
        let op = data[used];
        if Kind::from_opcode(op).is_none() {
            return Err(InstructionError::UnknownOpcode(op));
        }
        Ok((Instruction { op, prefix }, used + 1))
    }

    #[inline]
    pub fn kind(&self) -> Kind {
        // The opcode was validated by `parse` or built by a constructor.
        Kind::from_opcode(self.op).unwrap_or(Kind::Literal0)
    }

    #[inline]
    pub fn opcode(&self) -> u8 {
        self.op
    }

    #[inline]
    pub fn prefix(&self) -> u64 {
        self.prefix
    }

    /// Count argument for Skip/Delta/Copy. `None` if the prefix is too large
    /// for the count to fit 64 bits.
    pub fn count_arg(&self) -> Option<u64> {
        self.prefix
            .checked_mul(16)?
            .checked_add(u64::from(self.op % 16))
    }

    /// Delta argument for Set(Neg)Delta. Wraps modulo 2^64, so a hostile
    /// prefix can produce zero; callers must reject zero deltas.
    pub fn delta_arg(&self) -> u64 {
        self.prefix
            .wrapping_add(1)
            .wrapping_shl(u32::from(self.op % 16) * 4)
    }

    /// Serialised length in bytes: the opcode plus the minimal prefix.
    pub fn encoded_len(&self) -> usize {
        1 + varint::prefix_len(self.prefix)
    }

    /// Append the serialised instruction to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        varint::write_prefix(out, self.prefix);
        out.push(self.op);
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            Kind::Literal0 | Kind::Literal1 => match ScalarType::from_tag(self.op) {
                Some(ty) => write!(f, "Literal {}", ty.name()),
                None => write!(f, "Literal {:#04X}", self.op),
            },
            kind @ (Kind::Skip | Kind::Delta | Kind::Copy) => match self.count_arg() {
                Some(count) => write!(f, "{} {}", kind.name(), count),
                None => write!(f, "{} <overflow>", kind.name()),
            },
            kind @ (Kind::SetNegDelta | Kind::SetDelta) => {
                write!(f, "{} {:#x} << {}", kind.name(), self.prefix.wrapping_add(1), self.op % 16)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Disassembly
// ---------------------------------------------------------------------------

/// Render an instruction stream as human-readable text, one entry per
/// instruction, ending at the sentinel.
pub fn disassemble(body: &[u8]) -> Result<String, InstructionError> {
    let mut out = String::from("[ ");
    let mut pos = 0;
    while pos < body.len() {
        if body[pos] == 0 {
            out.push_str("EOO");
            break;
        }
        let (insn, used) = Instruction::parse(&body[pos..])?;
        pos += used;
        if matches!(insn.kind(), Kind::Literal0 | Kind::Literal1) {
            let scalar =
                Scalar::read(&body[pos - 1..]).map_err(|_| InstructionError::TruncatedLiteral)?;
            pos += scalar.size() - 1;
        }
        out.push_str(&insn.to_string());
        out.push_str(", ");
    }
    out.push_str(" ]");
    Ok(out)
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionError {
    /// Prefix truncated or overflowing 64 bits.
    BadPrefix(VarIntError),
    /// Opcode high nibble does not name an operation.
    UnknownOpcode(u8),
    /// A literal opcode was not followed by a complete scalar body.
    TruncatedLiteral,
}

impl From<VarIntError> for InstructionError {
    fn from(e: VarIntError) -> Self {
        InstructionError::BadPrefix(e)
    }
}

impl std::fmt::Display for InstructionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstructionError::BadPrefix(e) => write!(f, "bad instruction prefix: {e}"),
            InstructionError::UnknownOpcode(op) => write!(f, "unknown opcode {op:#04X}"),
            InstructionError::TruncatedLiteral => write!(f, "truncated literal scalar"),
        }
    }
}

impl std::error::Error for InstructionError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
