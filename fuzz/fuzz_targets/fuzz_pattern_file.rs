#![no_main]
use blockscan::{pattern_file, BlockDatabase};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Bytes before the first NUL are the pattern file, bytes after it are
    // scanned against whatever compiled.
    let (rules, input) = match data.iter().position(|&b| b == 0) {
        Some(pos) => (&data[..pos], &data[pos + 1..]),
        None => (data, &[][..]),
    };

    let Ok(src) = std::str::from_utf8(rules) else {
        return;
    };

    // Parse and compile errors are expected; panics are not.
    if let Ok(defs) = pattern_file::parse(src) {
        if let Ok(db) = BlockDatabase::compile(&defs) {
            if let Some(id) = db.scan(input) {
                assert!(defs.iter().any(|d| d.id == id));
            }
        }
    }
});
