#![no_main]
use deltacol::column::{Column, ColumnBuilder, Scalar};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Interpret the input as a sequence of (gap, value) records and check
    // that decoding the encoded column reproduces them exactly.
    let mut pairs = Vec::new();
    let mut index = 0u64;
    let mut chunks = data.chunks_exact(10);
    for chunk in &mut chunks {
        let gap = u64::from(chunk[0]);
        let payload = u64::from_le_bytes(chunk[2..10].try_into().unwrap());
        let scalar = match chunk[1] % 6 {
            0 => Scalar::double(f64::from_bits(payload)),
            1 => Scalar::int32(payload as i32),
            2 => Scalar::int64(payload as i64),
            3 => Scalar::timestamp(payload),
            4 => Scalar::boolean(payload & 1 != 0),
            _ => Scalar::null(),
        };
        index += gap;
        pairs.push((index, scalar));
        index += 1;
    }

    let mut out = Vec::new();
    let mut builder = ColumnBuilder::new(&mut out, "fuzz");
    for (i, elem) in &pairs {
        builder.append(*i, elem).unwrap();
    }
    builder.finish();

    let column = Column::parse(&out).unwrap();
    let decoded: Vec<_> = column
        .iter()
        .collect::<Result<_, _>>()
        .expect("own output must decode");
    assert_eq!(decoded, pairs);
});
