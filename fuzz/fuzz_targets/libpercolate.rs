#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // keep the fuzzer away from the filesystem
        if input.contains("include") {
            return;
        }
        if let Ok(journal) = libpercolate::parse_str(input) {
            let rendered = journal.to_string();
            let _ = libpercolate::parse_str(&rendered);
        }
    }
});
