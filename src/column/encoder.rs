// Column encoding: the deferred-emission builder.
//
// The builder consumes (index, scalar) inputs in non-decreasing index order
// and writes the instruction stream into a caller-supplied buffer. Emission
// of Copy and Delta instructions is deferred so runs collapse into a single
// counted instruction: the signed `deferrals` counter holds pending copies
// when positive and pending delta applications when negative. Changing the
// run kind, emitting a gap, a literal or a new delta, and finishing all
// flush the pending run first.

use super::decoder::{COLUMN_SUBTYPE, CONTAINER_TYPE, Column, DecodeError};
use super::instruction::Instruction;
use super::scalar::{MAX_VALUE_SIZE, Scalar};
use super::store::calculate_delta;

// ---------------------------------------------------------------------------
// Encoder error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The appended index precedes the next open position.
    IndexNotMonotonic { index: u64, next_index: u64 },
    /// The scalar's payload exceeds what a literal can carry.
    ValueTooLarge { size: usize },
    /// A prior `IndexNotMonotonic` left the builder unusable.
    Poisoned,
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexNotMonotonic { index, next_index } => {
                write!(f, "index {index} not monotonic (next open position is {next_index})")
            }
            Self::ValueTooLarge { size } => {
                write!(f, "value payload of {size} bytes exceeds the literal maximum")
            }
            Self::Poisoned => write!(f, "builder poisoned by an earlier index error"),
        }
    }
}

impl std::error::Error for EncodeError {}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds an encoded column in a caller-supplied buffer.
pub struct ColumnBuilder<'a> {
    out: &'a mut Vec<u8>,
    /// Start of the column framing within `out`.
    offset: usize,
    /// Start of the instruction stream within `out`.
    body_offset: usize,
    /// Last committed base value, for Copy and Delta comparison.
    last: Option<Scalar>,
    /// Last emitted delta; zero means no delta run can continue.
    delta: u64,
    /// Logical position of the next value.
    next_index: u64,
    /// Pending run: positive counts copies, negative counts deltas.
    deferrals: i64,
    finished: bool,
    poisoned: bool,
}

impl<'a> ColumnBuilder<'a> {
    /// Start a column named `name` at the current end of `out`.
    ///
    /// `name` must not contain a NUL byte.
    pub fn new(out: &'a mut Vec<u8>, name: &str) -> ColumnBuilder<'a> {
        debug_assert!(!name.contains('\0'));
        let offset = out.len();
        out.push(CONTAINER_TYPE);
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        out.extend_from_slice(&[0u8; 4]); // body length, patched by `seal`
        out.push(COLUMN_SUBTYPE);
        let body_offset = out.len();
        ColumnBuilder {
            out,
            offset,
            body_offset,
            last: None,
            delta: 0,
            next_index: 0,
            deferrals: 0,
            finished: false,
            poisoned: false,
        }
    }

    /// Append `elem` at logical position `index`, emitting a skip for any
    /// gap since the previous append. Appending the sentinel scalar is
    /// equivalent to `finish`.
    pub fn append(&mut self, index: u64, elem: &Scalar) -> Result<(), EncodeError> {
        if self.poisoned {
            return Err(EncodeError::Poisoned);
        }
        if elem.is_eoo() {
            self.seal();
            return Ok(());
        }
        if elem.value_size() > MAX_VALUE_SIZE {
            return Err(EncodeError::ValueTooLarge {
                size: elem.value_size(),
            });
        }
        if index < self.next_index {
            self.poisoned = true;
            return Err(EncodeError::IndexNotMonotonic {
                index,
                next_index: self.next_index,
            });
        }

        self.reopen();
        if index > self.next_index {
            self.flush_deferrals();
            Instruction::skip(index - self.next_index).write(self.out);
            self.next_index = index;
        }

        if !self.try_copy(elem) && !self.try_delta(elem) {
            self.emit_literal(elem);
        }
        self.next_index += 1;
        Ok(())
    }

    /// Append at the next open position, without a gap.
    pub fn append_next(&mut self, elem: &Scalar) -> Result<(), EncodeError> {
        self.append(self.next_index, elem)
    }

    /// The logical position the next `append_next` would fill.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Flush pending runs, append the sentinel and patch the length prefix.
    /// Idempotent; a later `append` truncates the sentinel and resumes.
    /// Returns the finished column bytes.
    pub fn finish(&mut self) -> &[u8] {
        self.seal();
        &self.out[self.offset..]
    }

    /// Finish and return a decodable handle over the written bytes.
    pub fn into_column(mut self) -> Result<Column<'a>, DecodeError> {
        self.seal();
        let offset = self.offset;
        let out: &'a Vec<u8> = self.out;
        Column::parse(&out[offset..])
    }

    // -----------------------------------------------------------------------
    // Internal: emission
    // -----------------------------------------------------------------------

    fn seal(&mut self) {
        if self.finished {
            return;
        }
        self.flush_deferrals();
        self.out.push(0);
        let body_len = (self.out.len() - self.body_offset) as u32;
        let at = self.body_offset - 5;
        self.out[at..at + 4].copy_from_slice(&body_len.to_le_bytes());
        self.finished = true;
    }

    fn reopen(&mut self) {
        if self.finished {
            self.out.truncate(self.out.len() - 1);
            self.finished = false;
        }
    }

    fn flush_deferrals(&mut self) {
        self.flush_deferred_copies();
        self.flush_deferred_deltas();
    }

    fn flush_deferred_copies(&mut self) {
        if self.deferrals > 0 {
            Instruction::copy(self.deferrals as u64).write(self.out);
            self.deferrals = 0;
        }
    }

    fn flush_deferred_deltas(&mut self) {
        if self.deferrals < 0 {
            Instruction::delta_run(self.deferrals.unsigned_abs()).write(self.out);
            self.deferrals = 0;
        }
    }

    /// Defer a Copy if `elem` repeats the last value byte for byte.
    fn try_copy(&mut self, elem: &Scalar) -> bool {
        let Some(last) = &self.last else {
            return false;
        };
        if elem != last {
            return false;
        }
        self.flush_deferred_deltas();
        self.deferrals += 1;
        true
    }

    /// Defer or emit a Delta if `elem` is a small numeric step from the last
    /// value. A fresh delta instruction is only emitted when it is strictly
    /// shorter than the literal it replaces.
    fn try_delta(&mut self, elem: &Scalar) -> bool {
        let Some(last) = &self.last else {
            return false;
        };
        let delta = calculate_delta(last, elem);
        if delta == 0 {
            return false;
        }

        self.flush_deferred_copies();
        if delta == self.delta {
            self.deferrals -= 1;
        } else {
            let insn = Instruction::best_delta(delta);
            if insn.encoded_len() >= elem.size() {
                return false;
            }
            insn.write(self.out);
            self.delta = delta;
        }
        self.last = Some(*elem);
        true
    }

    /// Store `elem` verbatim and reset the delta state.
    fn emit_literal(&mut self, elem: &Scalar) {
        self.flush_deferrals();
        self.out.extend_from_slice(elem.raw());
        self.last = Some(*elem);
        self.delta = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
