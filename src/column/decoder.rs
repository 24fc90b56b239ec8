// Column decoding: container validation and the forward cursor.
//
// A column is a length-prefixed binary blob whose body is the instruction
// stream, terminated by a single zero byte:
//
//     [0x05] [name, NUL-terminated] [body_len: u32 LE] [0x07] [body]
//
// The cursor executes instructions one at a time and yields (index, value)
// pairs. Runs are tracked with a signed counter: positive means pending
// copies of the current value, negative means pending delta applications.
// Materialised deltas live in a store shared by all cursors of a column;
// every forward pass applies the same deltas in the same order, so cursors
// never disagree about a cell.

use std::cell::RefCell;

use super::instruction::{Instruction, Kind};
use super::scalar::Scalar;
use super::store::{DeltaStore, MAX_DELTA_VALUE_SIZE};

/// Container type tag for a framed column.
pub const CONTAINER_TYPE: u8 = 0x05;

/// Subtype tag marking the blob as a column.
pub const COLUMN_SUBTYPE: u8 = 0x07;

/// Hard cap on the body length accepted at decode time.
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Logical indices are confined to 63 bits.
const MAX_INDEX: u64 = 1 << 63;

// ---------------------------------------------------------------------------
// Decoder error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Framing invalid: bad tags, bad length, missing terminator.
    MalformedContainer(String),
    /// Instruction decoding failed at the given body offset.
    MalformedStream { offset: usize, reason: String },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedContainer(msg) => write!(f, "malformed container: {msg}"),
            Self::MalformedStream { offset, reason } => {
                write!(f, "malformed stream at byte {offset}: {reason}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// A validated, immutable view of an encoded column.
///
/// The column owns the store backing delta-materialised values, behind a
/// `RefCell` so any number of cursors can share it within one thread.
pub struct Column<'a> {
    raw: &'a [u8],
    name: &'a str,
    body: &'a [u8],
    store: RefCell<DeltaStore>,
}

impl<'a> Column<'a> {
    /// Validate the framing of `bytes` and return a decodable handle.
    pub fn parse(bytes: &'a [u8]) -> Result<Column<'a>, DecodeError> {
        let fail = |msg: &str| Err(DecodeError::MalformedContainer(msg.into()));

        if bytes.len() < 8 {
            return fail("too short for a column container");
        }
        if bytes[0] != CONTAINER_TYPE {
            return fail("wrong container type tag");
        }
        let Some(nul) = bytes[1..].iter().position(|&b| b == 0) else {
            return fail("unterminated name");
        };
        let name_end = 1 + nul;
        let Ok(name) = std::str::from_utf8(&bytes[1..name_end]) else {
            return fail("name is not valid UTF-8");
        };

        let header_len = name_end + 1 + 4 + 1;
        if bytes.len() < header_len + 1 {
            return fail("truncated header");
        }
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&bytes[name_end + 1..name_end + 5]);
        let body_len = u32::from_le_bytes(len_bytes) as usize;
        if bytes[name_end + 5] != COLUMN_SUBTYPE {
            return fail("wrong column subtype tag");
        }

        let body = &bytes[header_len..];
        if body_len == 0 || body_len > MAX_BODY_SIZE {
            return fail("body length out of range");
        }
        if body.len() != body_len {
            return fail("body length does not match input");
        }
        if body[body.len() - 1] != 0 {
            return fail("body does not end at the sentinel");
        }
        if body.len() > 1 {
            if body[0] == 0 {
                return fail("content after the sentinel");
            }
            // Delta and Copy runs need a base value; only a literal or a
            // leading gap may open the stream. Parse failures are left for
            // the cursor to report with an offset.
            if let Ok((insn, _)) = Instruction::parse(body)
                && !matches!(insn.kind(), Kind::Literal0 | Kind::Literal1 | Kind::Skip)
            {
                return fail("column must begin with a literal or a skip");
            }
        }

        Ok(Column {
            raw: bytes,
            name,
            body,
            store: RefCell::new(DeltaStore::new()),
        })
    }

    /// The field name carried in the framing.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// The complete framed bytes.
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    /// The instruction stream, terminator included.
    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// True iff the body is the lone sentinel byte.
    pub fn is_empty(&self) -> bool {
        self.body.len() == 1
    }

    /// A cursor positioned before the first value.
    pub fn iter(&self) -> Cursor<'_> {
        Cursor {
            body: self.body,
            store: &self.store,
            pos: 0,
            current: Scalar::eoo(),
            count: 0,
            next_index: 0,
            cur_index: 0,
            delta: 1,
            delta_index: 0,
            done: false,
            failed: false,
        }
    }

    /// Positional lookup: the value at `index`, or `None` when that position
    /// is absent or past the end. A linear scan, as the format admits no
    /// faster access.
    pub fn at(&self, index: u64) -> Result<Option<Scalar>, DecodeError> {
        for item in self.iter() {
            let (i, value) = item?;
            if i == index {
                return Ok(Some(value));
            }
            if i > index {
                break;
            }
        }
        Ok(None)
    }

    /// Count the present values without materialising any deltas.
    pub fn num_values(&self) -> Result<u64, DecodeError> {
        let mut pos = 0;
        let mut n: u64 = 0;
        while pos < self.body.len() {
            if self.body[pos] == 0 {
                return Ok(n);
            }
            let at = pos;
            let (insn, used) = Instruction::parse(&self.body[pos..])
                .map_err(|e| stream_error(at, e.to_string()))?;
            pos += used;
            match insn.kind() {
                Kind::Literal0 | Kind::Literal1 => {
                    let scalar = Scalar::read(&self.body[at..])
                        .map_err(|e| stream_error(at, e.to_string()))?;
                    pos = at + scalar.size();
                    n += 1;
                }
                Kind::Skip => {}
                Kind::Delta | Kind::Copy => {
                    let count = insn
                        .count_arg()
                        .filter(|&c| c >= 1)
                        .ok_or_else(|| stream_error(at, "bad run count".into()))?;
                    n = n
                        .checked_add(count)
                        .ok_or_else(|| stream_error(at, "value count overflow".into()))?;
                }
                Kind::SetNegDelta | Kind::SetDelta => {
                    if insn.delta_arg() == 0 {
                        return Err(stream_error(at, "zero delta".into()));
                    }
                    n += 1;
                }
            }
        }
        Err(stream_error(self.body.len(), "missing terminator".into()))
    }
}

impl<'a, 'c> IntoIterator for &'c Column<'a> {
    type Item = Result<(u64, Scalar), DecodeError>;
    type IntoIter = Cursor<'c>;

    fn into_iter(self) -> Cursor<'c> {
        self.iter()
    }
}

impl std::fmt::Debug for Column<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("body_len", &self.body.len())
            .finish()
    }
}

fn stream_error(offset: usize, reason: String) -> DecodeError {
    DecodeError::MalformedStream { offset, reason }
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// Forward cursor over a column, yielding `(index, value)` pairs in strictly
/// increasing index order. The first decode error fuses the cursor.
pub struct Cursor<'a> {
    body: &'a [u8],
    store: &'a RefCell<DeltaStore>,
    /// Byte offset of the next instruction.
    pos: usize,
    /// Most recently decoded value.
    current: Scalar,
    /// Remaining repetitions: positive for a Copy run, negative for a Delta
    /// run, zero when the next instruction must be fetched.
    count: i64,
    /// Logical position of the next value to yield.
    next_index: u64,
    /// Logical position of the most recently yielded value.
    cur_index: u64,
    /// Most recently set delta. Starts at an arbitrary non-zero value; a
    /// stream applies a delta before setting one only if hand-crafted.
    delta: u64,
    delta_index: usize,
    done: bool,
    failed: bool,
}

impl Cursor<'_> {
    /// Logical index of the most recently yielded value.
    pub fn index(&self) -> u64 {
        self.cur_index
    }

    /// The most recently yielded value, or the sentinel before the first
    /// yield and after the end.
    pub fn value(&self) -> &Scalar {
        &self.current
    }

    /// True once the cursor has reached the end-of-sequence sentinel.
    pub fn is_exhausted(&self) -> bool {
        self.done
    }

    /// Fast-forward over the remaining repetitions of the current Copy run
    /// and yield the next value that differs from the repeated one (deltas
    /// always differ, so only pending copies are dropped).
    pub fn skip_run(&mut self) -> Option<Result<(u64, Scalar), DecodeError>> {
        if self.count > 0 {
            self.next_index += self.count as u64;
            self.count = 0;
        }
        self.next()
    }

    fn fail(&mut self, offset: usize, reason: impl Into<String>) -> DecodeError {
        self.failed = true;
        stream_error(offset, reason.into())
    }

    /// Apply the current delta to the current value through the shared store.
    fn apply_delta(&mut self, at: usize) -> Result<(), DecodeError> {
        let size = self.current.value_size();
        if size == 0 || size > MAX_DELTA_VALUE_SIZE {
            return Err(self.fail(at, "delta applied to a non-numeric base"));
        }
        self.current = self
            .store
            .borrow_mut()
            .apply(self.delta_index, &self.current, self.delta);
        self.delta_index += 1;
        Ok(())
    }
}

impl Iterator for Cursor<'_> {
    type Item = Result<(u64, Scalar), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.failed {
            return None;
        }

        // Fetch instructions until one produces values.
        let mut insn_at = self.pos;
        while self.count == 0 {
            insn_at = self.pos;
            let (insn, used) = match Instruction::parse(&self.body[self.pos..]) {
                Ok(parsed) => parsed,
                Err(e) => return Some(Err(self.fail(insn_at, e.to_string()))),
            };
            self.pos += used;

            match insn.kind() {
                Kind::Literal0 | Kind::Literal1 => {
                    if insn.opcode() == 0 {
                        self.done = true;
                        self.current = Scalar::eoo();
                        return None;
                    }
                    if insn.prefix() != 0 {
                        return Some(Err(self.fail(insn_at, "literal preceded by prefix bytes")));
                    }
                    // The opcode byte is the scalar's type tag; re-read from
                    // one byte back.
                    let start = self.pos - 1;
                    let scalar = match Scalar::read(&self.body[start..]) {
                        Ok(s) => s,
                        Err(e) => return Some(Err(self.fail(start, e.to_string()))),
                    };
                    self.pos = start + scalar.size();
                    self.current = scalar;
                    self.count = 1;
                }
                Kind::Skip => {
                    let Some(n) = insn.count_arg() else {
                        return Some(Err(self.fail(insn_at, "skip count overflow")));
                    };
                    match self.next_index.checked_add(n) {
                        Some(next) if next < MAX_INDEX => self.next_index = next,
                        _ => return Some(Err(self.fail(insn_at, "logical index overflow"))),
                    }
                }
                kind @ (Kind::Delta | Kind::Copy) => {
                    if self.current.is_eoo() {
                        return Some(Err(self.fail(insn_at, "run without a base value")));
                    }
                    let count = match insn.count_arg() {
                        Some(c) if c >= 1 && c <= i64::MAX as u64 => c as i64,
                        _ => return Some(Err(self.fail(insn_at, "bad run count"))),
                    };
                    self.count = if kind == Kind::Copy { count } else { -count };
                }
                kind @ (Kind::SetNegDelta | Kind::SetDelta) => {
                    let arg = insn.delta_arg();
                    if arg == 0 {
                        return Some(Err(self.fail(insn_at, "zero delta")));
                    }
                    self.delta = if kind == Kind::SetDelta {
                        arg
                    } else {
                        arg.wrapping_neg()
                    };
                    if let Err(e) = self.apply_delta(insn_at) {
                        return Some(Err(e));
                    }
                    self.count = 1;
                }
            }
        }

        // Emit one value from the pending run.
        if self.count > 0 {
            self.count -= 1;
        } else {
            self.count += 1;
            if let Err(e) = self.apply_delta(insn_at) {
                return Some(Err(e));
            }
        }

        if self.next_index >= MAX_INDEX {
            return Some(Err(self.fail(self.pos, "logical index overflow")));
        }
        self.cur_index = self.next_index;
        self.next_index += 1;
        Some(Ok((self.cur_index, self.current)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
