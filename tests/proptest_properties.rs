use deltacol::column::{Column, ColumnBuilder, Scalar};
use proptest::prelude::*;

fn scalar_strategy() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        any::<f64>().prop_map(Scalar::double),
        any::<i32>().prop_map(Scalar::int32),
        any::<i64>().prop_map(Scalar::int64),
        any::<bool>().prop_map(Scalar::boolean),
        any::<i64>().prop_map(Scalar::datetime),
        any::<u64>().prop_map(Scalar::timestamp),
        Just(Scalar::null()),
        any::<[u8; 12]>().prop_map(Scalar::object_id),
        any::<[u8; 16]>().prop_map(Scalar::decimal128),
    ]
}

/// A sparse column input: per-entry gap before the value, so indices are
/// strictly increasing by construction.
fn pairs_strategy() -> impl Strategy<Value = Vec<(u64, Scalar)>> {
    proptest::collection::vec((0u64..1 << 40, scalar_strategy()), 0..200).prop_map(|entries| {
        let mut index = 0u64;
        entries
            .into_iter()
            .map(|(gap, scalar)| {
                index += gap;
                let pair = (index, scalar);
                index += 1;
                pair
            })
            .collect()
    })
}

fn encode(pairs: &[(u64, Scalar)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut builder = ColumnBuilder::new(&mut out, "col");
    for (index, elem) in pairs {
        builder.append(*index, elem).unwrap();
    }
    builder.finish();
    out
}

proptest! {
    #[test]
    fn prop_encode_decode_roundtrip(pairs in pairs_strategy()) {
        let bytes = encode(&pairs);
        let column = Column::parse(&bytes).unwrap();
        let decoded: Vec<_> = column.iter().collect::<Result<_, _>>().unwrap();
        prop_assert_eq!(decoded, pairs);
    }

    #[test]
    fn prop_indices_strictly_increase(pairs in pairs_strategy()) {
        let bytes = encode(&pairs);
        let column = Column::parse(&bytes).unwrap();
        let mut previous: Option<u64> = None;
        for item in column.iter() {
            let (index, _) = item.unwrap();
            if let Some(prev) = previous {
                prop_assert!(index > prev);
            }
            prop_assert!(index < 1 << 63);
            previous = Some(index);
        }
    }

    #[test]
    fn prop_dense_encoding_never_worse_than_literals(
        scalars in proptest::collection::vec(scalar_strategy(), 0..100)
    ) {
        let pairs: Vec<_> = scalars
            .into_iter()
            .enumerate()
            .map(|(i, s)| (i as u64, s))
            .collect();
        let bytes = encode(&pairs);
        let column = Column::parse(&bytes).unwrap();
        let naive: usize = pairs.iter().map(|(_, s)| s.size()).sum();
        // Profitability only admits instructions shorter than the literal
        // they replace; the terminator is the single fixed cost.
        prop_assert!(column.body().len() <= naive + 1);
    }

    #[test]
    fn prop_encoder_is_deterministic(pairs in pairs_strategy()) {
        prop_assert_eq!(encode(&pairs), encode(&pairs));
    }

    #[test]
    fn prop_num_values_matches_iteration(pairs in pairs_strategy()) {
        let bytes = encode(&pairs);
        let column = Column::parse(&bytes).unwrap();
        prop_assert_eq!(column.num_values().unwrap(), pairs.len() as u64);
    }

    #[test]
    fn prop_interleaved_cursors_agree(pairs in pairs_strategy()) {
        let bytes = encode(&pairs);
        let column = Column::parse(&bytes).unwrap();
        let mut a = column.iter();
        let mut b = column.iter();
        let mut c = column.iter();
        loop {
            // Advance the cursors at staggered rates.
            let x = a.next();
            let y = b.next();
            match (x, y) {
                (None, None) => break,
                (Some(Ok(p)), Some(Ok(q))) => prop_assert_eq!(p, q),
                other => prop_assert!(false, "cursors diverged: {other:?}"),
            }
            if let Some(item) = c.skip_run() {
                prop_assert!(item.is_ok());
            }
        }
    }

    #[test]
    fn prop_decoder_never_panics_on_arbitrary_bodies(
        body in proptest::collection::vec(any::<u8>(), 1..512)
    ) {
        let mut framed = vec![0x05];
        framed.extend_from_slice(b"col\0");
        framed.extend_from_slice(&(body.len() as u32).to_le_bytes());
        framed.push(0x07);
        framed.extend_from_slice(&body);
        if let Ok(column) = Column::parse(&framed) {
            for item in column.iter().take(10_000) {
                if item.is_err() {
                    break;
                }
            }
            let _ = column.num_values();
        }
    }
}
