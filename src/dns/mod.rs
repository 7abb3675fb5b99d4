//! Captive-portal DNS wire handling.
//!
//! Answers every `A`/`IN`-style query with one fixed IPv4 address so that
//! OS connectivity checks land on the setup page. Everything else is
//! dropped without a reply.
//!
//! ```text
//! query    [header 12][qname ..][qtype 2][qclass 2][anything else ..]
//!                                                  └── discarded
//! response [header 12][qname ..][qtype 2][qclass 2][answer 16]
//!           QR|AA set, QD=1 AN=1 NS=0 AR=0
//!
//! answer   C0 0C | 00 01 | 00 01 | 00 00 00 3C | 00 04 | a b c d
//!          name    type    class   ttl=60        rdlen   redirect
//! ```

use core::fmt;
use std::net::Ipv4Addr;

pub mod reader;

pub use reader::{Reader, WireError};

pub const HEADER_LEN: usize = 12;
/// UDP payload ceiling without EDNS.
pub const MAX_MESSAGE: usize = 512;
pub const ANSWER_LEN: usize = 16;
/// Largest response [`build_response`] can produce.
pub const MAX_RESPONSE: usize = MAX_MESSAGE + ANSWER_LEN;

pub const QTYPE_A: u16 = 1;
pub const CLASS_IN: u16 = 1;
pub const ANSWER_TTL_SECS: u32 = 60;

pub const FLAG_QR: u16 = 0x8000;
pub const FLAG_AA: u16 = 0x0400;
pub const FLAG_RD: u16 = 0x0100;

/// Compression pointer to the first question name (offset 12).
const NAME_PTR_TO_QUESTION: [u8; 2] = [0xC0, HEADER_LEN as u8];

pub type Response = heapless::Vec<u8, MAX_RESPONSE>;

// ── Parsed view ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub flags: u16,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl Header {
    pub fn parse(r: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            id: r.u16_be()?,
            flags: r.u16_be()?,
            qdcount: r.u16_be()?,
            ancount: r.u16_be()?,
            nscount: r.u16_be()?,
            arcount: r.u16_be()?,
        })
    }
}

/// First question of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub qtype: u16,
    pub qclass: u16,
    /// Offset one past QCLASS, i.e. the length of header + question.
    pub end: usize,
}

impl Question {
    pub fn parse(r: &mut Reader<'_>) -> Result<Self, WireError> {
        r.skip_name()?;
        let qtype = r.u16_be()?;
        let qclass = r.u16_be()?;
        Ok(Self {
            qtype,
            qclass,
            end: r.position(),
        })
    }
}

// ── Rejections ────────────────────────────────────────────────

/// Why a datagram gets no reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Shorter than a header plus one name byte.
    TooShort(usize),
    /// Longer than [`MAX_MESSAGE`].
    TooLong(usize),
    NoQuestion,
    Malformed(WireError),
    /// Valid question for a type other than A (AAAA, MX, ...).
    UnsupportedType(u16),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort(len) => write!(f, "too short ({len} bytes)"),
            Self::TooLong(len) => write!(f, "too long ({len} bytes)"),
            Self::NoQuestion => f.write_str("no question"),
            Self::Malformed(e) => write!(f, "malformed question: {e}"),
            Self::UnsupportedType(t) => write!(f, "unsupported qtype {t}"),
        }
    }
}

impl From<WireError> for Rejection {
    fn from(e: WireError) -> Self {
        Self::Malformed(e)
    }
}

// ── Builder ───────────────────────────────────────────────────

/// Build the captive answer for `query`, or say why there is none.
///
/// Only the first question is answered. RD is preserved, other header
/// flags are echoed.
pub fn build_response(query: &[u8], redirect: Ipv4Addr) -> Result<Response, Rejection> {
    if query.len() < HEADER_LEN + 1 {
        return Err(Rejection::TooShort(query.len()));
    }
    if query.len() > MAX_MESSAGE {
        return Err(Rejection::TooLong(query.len()));
    }

    let mut r = Reader::new(query);
    let header = Header::parse(&mut r)?;
    if header.qdcount == 0 {
        return Err(Rejection::NoQuestion);
    }
    let question = Question::parse(&mut r)?;
    if question.qtype != QTYPE_A {
        return Err(Rejection::UnsupportedType(question.qtype));
    }

    let flags = header.flags | FLAG_QR | FLAG_AA;

    let mut out = Response::new();
    // Capacity is MAX_MESSAGE + ANSWER_LEN and question.end <= MAX_MESSAGE,
    // so none of the extends below can fail.
    let _ = out.extend_from_slice(&header.id.to_be_bytes());
    let _ = out.extend_from_slice(&flags.to_be_bytes());
    let _ = out.extend_from_slice(&header.qdcount.to_be_bytes()); // QDCOUNT, echoed
    let _ = out.extend_from_slice(&1u16.to_be_bytes()); // ANCOUNT
    let _ = out.extend_from_slice(&[0, 0, 0, 0]); // NSCOUNT, ARCOUNT
    let _ = out.extend_from_slice(&query[HEADER_LEN..question.end]);
    let _ = out.extend_from_slice(&answer(redirect));
    debug_assert_eq!(out.len(), question.end + ANSWER_LEN);

    Ok(out)
}

fn answer(redirect: Ipv4Addr) -> [u8; ANSWER_LEN] {
    let mut rr = [0u8; ANSWER_LEN];
    rr[0..2].copy_from_slice(&NAME_PTR_TO_QUESTION);
    rr[2..4].copy_from_slice(&QTYPE_A.to_be_bytes());
    rr[4..6].copy_from_slice(&CLASS_IN.to_be_bytes());
    rr[6..10].copy_from_slice(&ANSWER_TTL_SECS.to_be_bytes());
    rr[10..12].copy_from_slice(&4u16.to_be_bytes());
    rr[12..16].copy_from_slice(&redirect.octets());
    rr
}
