// Column-stream prefix integers.
//
// A non-negative integer is encoded as zero or more prefix bytes, each with
// the high bit set, accumulated most-significant group first:
//
//     prefix = prefix * 128 + (byte & 0x7F)
//
// The terminating byte (high bit clear) is the instruction opcode and is NOT
// part of the accumulated value; decoding stops in front of it. An empty
// prefix encodes zero, so a prefix-free instruction is a single opcode byte.

/// Maximum prefix length for a 64-bit value (ceil(64/7) = 10).
pub const MAX_PREFIX_LEN: usize = 10;

/// Overflow guard for the 64-bit accumulator: if any of these bits are set
/// before a shift, the next `<< 7` would overflow.
const U64_OVERFLOW_MASK: u64 = 0xFE00_0000_0000_0000;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Append the minimal prefix encoding of `prefix` to `out`.
///
/// Writes nothing when `prefix == 0`. Returns the number of bytes written
/// (0..=10).
pub fn write_prefix(out: &mut Vec<u8>, mut prefix: u64) -> usize {
    if prefix == 0 {
        return 0;
    }
    let mut buf = [0u8; MAX_PREFIX_LEN];
    let mut i = MAX_PREFIX_LEN;
    while prefix != 0 {
        i -= 1;
        buf[i] = (prefix as u8 & 0x7F) | 0x80;
        prefix >>= 7;
    }
    out.extend_from_slice(&buf[i..]);
    MAX_PREFIX_LEN - i
}

/// Return the encoded byte-length of a prefix value (0 for zero).
#[inline]
pub fn prefix_len(prefix: u64) -> usize {
    if prefix == 0 {
        return 0;
    }
    let bits = 64 - prefix.leading_zeros();
    (bits.div_ceil(7) as usize).min(MAX_PREFIX_LEN)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Accumulate prefix bytes from the front of `data`.
///
/// Returns `(prefix, consumed)` where `consumed` counts only the prefix
/// bytes; `data[consumed]` is the terminating opcode byte, which is left for
/// the caller.
pub fn read_prefix(data: &[u8]) -> Result<(u64, usize), VarIntError> {
    let mut prefix: u64 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if byte & 0x80 == 0 {
            return Ok((prefix, i));
        }
        if prefix & U64_OVERFLOW_MASK != 0 {
            return Err(VarIntError::Overflow);
        }
        prefix = (prefix << 7) | u64::from(byte & 0x7F);
    }
    Err(VarIntError::Underflow)
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarIntError {
    /// Input ended before a terminating opcode byte was seen.
    Underflow,
    /// Accumulated prefix would overflow 64 bits.
    Overflow,
}

impl std::fmt::Display for VarIntError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarIntError::Underflow => write!(f, "prefix underflow (truncated input)"),
            VarIntError::Overflow => write!(f, "prefix overflow"),
        }
    }
}

impl std::error::Error for VarIntError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(val: u64) -> (u64, usize) {
        let mut out = Vec::new();
        let written = write_prefix(&mut out, val);
        assert_eq!(written, out.len());
        out.push(0x42); // arbitrary opcode terminator
        let (decoded, consumed) = read_prefix(&out).unwrap();
        (decoded, consumed)
    }

    #[test]
    fn roundtrip_values() {
        let cases: &[u64] = &[0, 1, 6, 127, 128, 255, 16383, 16384, u32::MAX as u64, u64::MAX];
        for &val in cases {
            let (decoded, consumed) = roundtrip(val);
            assert_eq!(decoded, val, "roundtrip failed for {val}");
            assert_eq!(consumed, prefix_len(val), "length mismatch for {val}");
        }
    }

    #[test]
    fn zero_prefix_is_empty() {
        let mut out = Vec::new();
        assert_eq!(write_prefix(&mut out, 0), 0);
        assert!(out.is_empty());
        assert_eq!(prefix_len(0), 0);
    }

    #[test]
    fn encoding_is_most_significant_first() {
        // 300 = 2 * 128 + 44: groups (10) (0101100), both with the high bit set.
        let mut out = Vec::new();
        write_prefix(&mut out, 300);
        assert_eq!(out, [0x82, 0xAC]);
    }

    #[test]
    fn single_byte_values() {
        for val in 1..=127u64 {
            let mut out = Vec::new();
            assert_eq!(write_prefix(&mut out, val), 1);
            assert_eq!(out[0], val as u8 | 0x80);
        }
    }

    #[test]
    fn terminator_is_not_consumed() {
        let data = [0x86, 0x43, 0x99];
        let (prefix, consumed) = read_prefix(&data).unwrap();
        assert_eq!(prefix, 6);
        assert_eq!(consumed, 1);
        assert_eq!(data[consumed], 0x43);
    }

    #[test]
    fn underflow_detection() {
        // All continuation bytes, no terminator.
        let data = [0x80, 0x80, 0x80];
        assert_eq!(read_prefix(&data), Err(VarIntError::Underflow));
        assert_eq!(read_prefix(&[]), Err(VarIntError::Underflow));
    }

    #[test]
    fn overflow_detection() {
        // Eleven maximal continuation bytes overflow a 64-bit accumulator.
        let mut data = vec![0xFF; 11];
        data.push(0x00);
        assert_eq!(read_prefix(&data), Err(VarIntError::Overflow));
    }

    #[test]
    fn max_value_fits_in_ten_bytes() {
        let mut out = Vec::new();
        assert_eq!(write_prefix(&mut out, u64::MAX), MAX_PREFIX_LEN);
    }
}
