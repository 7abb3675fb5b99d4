//! Fuzz target: `dns::Reader`
//!
//! Walks arbitrary bytes as a header followed by as many names as fit,
//! checking that the cursor never moves past the end of the buffer.
//!
//! cargo fuzz run fuzz_dns_reader

#![no_main]

use hivewarden::dns::{Header, Reader};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut r = Reader::new(data);
    if Header::parse(&mut r).is_err() {
        assert!(data.len() < 12);
        return;
    }
    while r.remaining() > 0 {
        let before = r.position();
        if r.skip_name().is_err() {
            break;
        }
        assert!(r.position() > before);
        assert!(r.position() <= data.len());
    }
});
