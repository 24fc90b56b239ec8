#![no_main]
use deltacol::column::Column;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Fuzz the container parser and decoder with arbitrary bytes.
    // Neither must ever panic — only return errors.
    if let Ok(column) = Column::parse(data) {
        for item in column.iter() {
            if item.is_err() {
                break;
            }
        }
        let _ = column.num_values();
    }

    // Also fuzz arbitrary bytes wrapped in valid framing so the stream
    // decoder is reached for inputs the container check would reject.
    let mut framed = vec![0x05];
    framed.extend_from_slice(b"f\0");
    framed.extend_from_slice(&(data.len() as u32).to_le_bytes());
    framed.push(0x07);
    framed.extend_from_slice(data);
    if let Ok(column) = Column::parse(&framed) {
        let mut a = column.iter();
        let mut b = column.iter();
        loop {
            match (a.next(), b.next()) {
                (None, None) => break,
                (Some(Ok(x)), Some(Ok(y))) => assert_eq!(x, y),
                (Some(Err(_)), Some(Err(_))) => break,
                other => panic!("shared-store cursors diverged: {other:?}"),
            }
        }
    }
});
