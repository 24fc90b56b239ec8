// Materialised delta elements.
//
// The store is an append-only sequence of scalars produced by applying
// 64-bit deltas to a base scalar. Every forward pass over a column applies
// the same deltas to the same bases in the same order, so the k-th cell is
// written once and later applications at the same index must reproduce it
// byte for byte.

use super::scalar::Scalar;

/// Widest payload the store will materialise; larger payloads are only ever
/// embedded as literals.
pub const MAX_DELTA_VALUE_SIZE: usize = 8;

/// Append-only arena of delta-materialised scalars.
#[derive(Default)]
pub struct DeltaStore {
    cells: Vec<Scalar>,
}

impl DeltaStore {
    pub fn new() -> DeltaStore {
        DeltaStore::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Materialise the `index`-th delta result: `base`'s payload, zero-
    /// extended to 64 bits little-endian, plus `delta` modulo 2^64,
    /// truncated back to the base's payload width.
    ///
    /// The caller guarantees `index` never exceeds `len()` and that `base`
    /// has a payload of 1..=8 bytes; both hold by construction for forward
    /// iteration over a validated stream.
    pub fn apply(&mut self, index: usize, base: &Scalar, delta: u64) -> Scalar {
        let size = base.value_size();
        debug_assert!(size >= 1 && size <= MAX_DELTA_VALUE_SIZE);
        debug_assert!(index <= self.cells.len());

        let mut value = [0u8; 8];
        value[..size].copy_from_slice(base.value());
        let value = u64::from_le_bytes(value).wrapping_add(delta);

        let elem = Scalar::from_parts(base.scalar_type(), &value.to_le_bytes()[..size]);

        if index == self.cells.len() {
            self.cells.push(elem);
        }
        debug_assert_eq!(self.cells[index], elem, "delta re-materialisation diverged");
        self.cells[index]
    }
}

/// Compute the 64-bit delta `modified - base` modulo 2^64.
///
/// Returns 0 when the two are not delta-compatible (different type tags,
/// different payload widths, or a payload empty or wider than 8 bytes).
/// Binary-equal scalars also yield 0; repetition is cheaper than a delta.
pub fn calculate_delta(base: &Scalar, modified: &Scalar) -> u64 {
    let size = base.value_size();
    if base.type_tag() != modified.type_tag()
        || size != modified.value_size()
        || size == 0
        || size > MAX_DELTA_VALUE_SIZE
    {
        return 0;
    }

    let mut b = [0u8; 8];
    b[..size].copy_from_slice(base.value());
    let mut m = [0u8; 8];
    m[..size].copy_from_slice(modified.value());
    u64::from_le_bytes(m).wrapping_sub(u64::from_le_bytes(b))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_adds_little_endian() {
        let mut store = DeltaStore::new();
        let base = Scalar::int64(10);
        let out = store.apply(0, &base, 1);
        assert_eq!(out.as_int64(), Some(11));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn apply_wraps_modulo_2_64() {
        let mut store = DeltaStore::new();
        let base = Scalar::timestamp(u64::MAX);
        let out = store.apply(0, &base, 2);
        assert_eq!(out.as_timestamp(), Some(1));
    }

    #[test]
    fn apply_truncates_to_payload_width() {
        let mut store = DeltaStore::new();
        let base = Scalar::int32(-1);
        // Adding 1 to 0x0000_0000_FFFF_FFFF carries into bit 32, which a
        // 4-byte payload discards.
        let out = store.apply(0, &base, 1);
        assert_eq!(out.as_int32(), Some(0));
        assert_eq!(out.value_size(), 4);
    }

    #[test]
    fn replay_at_same_index_returns_stored_cell() {
        let mut store = DeltaStore::new();
        let base = Scalar::double(72.0);
        let delta = 0x2_0000_0000_0000u64;
        let first = store.apply(0, &base, delta);
        let second = store.apply(0, &base, delta);
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        assert_eq!(first.as_double(), Some(72.5));
    }

    #[test]
    fn negative_delta_via_wrapping() {
        let mut store = DeltaStore::new();
        let base = Scalar::double(72.5);
        let delta = 0x2_0000_0000_0000u64.wrapping_neg();
        let out = store.apply(0, &base, delta);
        assert_eq!(out.as_double(), Some(72.0));
    }

    #[test]
    fn calculate_requires_compatible_scalars() {
        // Type mismatch.
        assert_eq!(calculate_delta(&Scalar::int32(1), &Scalar::int64(2)), 0);
        // Empty payloads.
        assert_eq!(calculate_delta(&Scalar::null(), &Scalar::null()), 0);
        // Oversized payloads.
        assert_eq!(
            calculate_delta(&Scalar::decimal128([1; 16]), &Scalar::decimal128([2; 16])),
            0
        );
        // Binary-equal values.
        assert_eq!(calculate_delta(&Scalar::int64(7), &Scalar::int64(7)), 0);
    }

    #[test]
    fn calculate_matches_apply() {
        let mut store = DeltaStore::new();
        let cases = [
            (Scalar::int64(10), Scalar::int64(11)),
            (Scalar::int64(11), Scalar::int64(7)),
            (Scalar::double(72.0), Scalar::double(72.5)),
            (Scalar::int32(-5), Scalar::int32(5)),
            (Scalar::timestamp(0), Scalar::timestamp(u64::MAX)),
        ];
        for (i, (base, modified)) in cases.iter().enumerate() {
            let delta = calculate_delta(base, modified);
            assert_ne!(delta, 0);
            assert_eq!(store.apply(i, base, delta), *modified);
        }
    }
}
