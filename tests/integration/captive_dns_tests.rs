//! Captive DNS responder over a real loopback UDP socket.

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use hivewarden::adapters::captive_dns::CaptiveDns;
use hivewarden::config::DnsConfig;

use crate::mock_hw::wait_until;

const REDIRECT: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);
const NO_REPLY_WAIT: Duration = Duration::from_millis(300);

/// `connectivitycheck.gstatic.com IN A`, as sent by an Android client
/// (id 0xA1B2, RD set, EDNS OPT record in the additional section).
const ANDROID_CHECK_QUERY: &[u8] = &[
    0xA1, 0xB2, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, //
    0x11, b'c', b'o', b'n', b'n', b'e', b'c', b't', b'i', b'v', b'i', b't', b'y', b'c', b'h',
    b'e', b'c', b'k', //
    0x07, b'g', b's', b't', b'a', b't', b'i', b'c', //
    0x03, b'c', b'o', b'm', 0x00, //
    0x00, 0x01, 0x00, 0x01, //
    0x00, 0x00, 0x29, 0x05, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

fn responder() -> (CaptiveDns, SocketAddr) {
    let mut dns = CaptiveDns::new(DnsConfig {
        port: 0,
        bind_addr: Ipv4Addr::LOCALHOST,
        recv_timeout_ms: 50,
        ..DnsConfig::default()
    });
    dns.start(REDIRECT).unwrap();
    let addr = dns.local_addr().unwrap();
    (dns, addr)
}

fn client() -> UdpSocket {
    let sock = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    sock.set_read_timeout(Some(NO_REPLY_WAIT)).unwrap();
    sock
}

fn ask(sock: &UdpSocket, server: SocketAddr, query: &[u8]) -> Option<Vec<u8>> {
    sock.send_to(query, server).unwrap();
    let mut buf = [0u8; 1024];
    match sock.recv_from(&mut buf) {
        Ok((n, from)) => {
            assert_eq!(from, server);
            Some(buf[..n].to_vec())
        }
        Err(_) => None,
    }
}

fn query(id: u16, name: &[u8], qtype: u16) -> Vec<u8> {
    let mut q = id.to_be_bytes().to_vec();
    q.extend_from_slice(&[0x01, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0]);
    q.extend_from_slice(name);
    q.extend_from_slice(&qtype.to_be_bytes());
    q.extend_from_slice(&[0x00, 0x01]);
    q
}

#[test]
fn golden_android_connectivity_check() {
    let (mut dns, server) = responder();
    let sock = client();

    let question_end = ANDROID_CHECK_QUERY.len() - 11;
    let mut expected = vec![0xA1, 0xB2, 0x85, 0x00, 0x00, 0x01, 0x00, 0x01, 0, 0, 0, 0];
    expected.extend_from_slice(&ANDROID_CHECK_QUERY[12..question_end]);
    expected.extend_from_slice(&[
        0xC0, 0x0C, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x3C, 0x00, 0x04, 192, 168, 4, 1,
    ]);

    let reply = ask(&sock, server, ANDROID_CHECK_QUERY).expect("A query must be answered");
    assert_eq!(reply, expected);
    assert!(wait_until(Duration::from_secs(1), || dns.stats().answered == 1));
    dns.stop();
}

#[test]
fn any_domain_resolves_to_the_redirect() {
    let (mut dns, server) = responder();
    let sock = client();
    for (id, name) in [
        (1u16, &b"\x07captive\x05apple\x03com\x00"[..]),
        (2, b"\x03www\x04msft\x03net\x00"),
        (3, b"\x05hello\x00"),
    ] {
        let reply = ask(&sock, server, &query(id, name, 1)).unwrap();
        assert_eq!(&reply[0..2], &id.to_be_bytes());
        let flags = u16::from_be_bytes([reply[2], reply[3]]);
        assert_eq!(flags & 0x8400, 0x8400);
        assert_eq!(&reply[6..8], &[0, 1]);
        assert_eq!(&reply[reply.len() - 4..], &REDIRECT.octets());
    }
    dns.stop();
}

#[test]
fn aaaa_and_mx_get_no_reply() {
    let (mut dns, server) = responder();
    let sock = client();
    assert_eq!(ask(&sock, server, &query(7, b"\x06google\x03com\x00", 28)), None);
    assert_eq!(ask(&sock, server, &query(8, b"\x06google\x03com\x00", 15)), None);
    assert!(wait_until(Duration::from_secs(1), || dns.stats().dropped == 2));
    assert_eq!(dns.stats().answered, 0);
    dns.stop();
}

#[test]
fn garbage_does_not_stop_the_loop() {
    let (mut dns, server) = responder();
    let sock = client();

    assert_eq!(ask(&sock, server, &[0xDE, 0xAD, 0xBE, 0xEF, 0x00]), None);
    let mut bad_label = query(9, b"\x3Fabc", 1);
    bad_label.truncate(16);
    assert_eq!(ask(&sock, server, &bad_label), None);
    assert_eq!(ask(&sock, server, &[0xFF; 40]), None);

    let reply = ask(&sock, server, &query(10, b"\x02ok\x00", 1));
    assert!(reply.is_some(), "responder must survive malformed input");
    assert!(dns.is_running());
    dns.stop();
}

#[test]
fn stop_returns_promptly_and_frees_the_port() {
    let mut dns = CaptiveDns::new(DnsConfig {
        port: 0,
        bind_addr: Ipv4Addr::LOCALHOST,
        recv_timeout_ms: 5_000,
        stop_grace_ms: 1_000,
        ..DnsConfig::default()
    });
    dns.start(REDIRECT).unwrap();
    let addr = dns.local_addr().unwrap();

    // The stop signal must cut the 5 s receive wait short.
    let t0 = Instant::now();
    dns.stop();
    assert!(t0.elapsed() < Duration::from_millis(900));
    assert!(!dns.is_running());
    assert!(UdpSocket::bind(addr).is_ok());
}

#[test]
fn idle_receive_timeouts_keep_the_loop_serving() {
    let (mut dns, server) = responder();
    let sock = client();

    // Several 50 ms receive timeouts elapse with no traffic.
    std::thread::sleep(Duration::from_millis(300));
    assert!(dns.is_running());

    let reply = ask(&sock, server, &query(11, b"\x04idle\x00", 1)).unwrap();
    assert_eq!(&reply[reply.len() - 4..], &REDIRECT.octets());
    assert!(wait_until(Duration::from_secs(1), || dns.stats().answered == 1));
    dns.stop();
}
