//! Fuzz target: `dns::build_response`
//!
//! Drives arbitrary datagrams into the captive response builder and
//! asserts that it never panics and that every answer is shaped like one:
//! same transaction id, QR|AA set, one question, one answer, redirect
//! address in the last four bytes.
//!
//! cargo fuzz run fuzz_dns_query

#![no_main]

use std::net::Ipv4Addr;

use hivewarden::dns::{self, ANSWER_LEN, FLAG_AA, FLAG_QR, MAX_RESPONSE};
use libfuzzer_sys::fuzz_target;

const REDIRECT: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);

fuzz_target!(|data: &[u8]| {
    let Ok(resp) = dns::build_response(data, REDIRECT) else {
        return;
    };

    assert!(resp.len() <= MAX_RESPONSE);
    assert!(resp.len() <= data.len() + ANSWER_LEN);
    assert_eq!(&resp[0..2], &data[0..2], "transaction id must be echoed");

    let flags = u16::from_be_bytes([resp[2], resp[3]]);
    assert_eq!(flags & (FLAG_QR | FLAG_AA), FLAG_QR | FLAG_AA);
    assert_eq!(&resp[4..12], &[0, 1, 0, 1, 0, 0, 0, 0]);
    assert_eq!(&resp[resp.len() - 4..], &REDIRECT.octets());
});
