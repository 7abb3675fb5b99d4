//! Bounds-checked cursor over a received datagram.
//!
//! Every read checks the remaining length first and reports
//! [`WireError::Truncated`] instead of reading past the end.

use core::fmt;

/// Top two bits of a length byte.
const LABEL_KIND_MASK: u8 = 0xC0;
/// `11xxxxxx`: two-byte compression pointer.
const LABEL_POINTER: u8 = 0xC0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// `need` more bytes were required at offset `at`.
    Truncated { at: usize, need: usize },
    /// Length byte with the reserved `01`/`10` prefix.
    ReservedLabel { at: usize, byte: u8 },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { at, need } => {
                write!(f, "truncated at offset {at} (needed {need} more)")
            }
            Self::ReservedLabel { at, byte } => {
                write!(f, "reserved label type 0x{byte:02X} at offset {at}")
            }
        }
    }
}

pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn ensure(&self, need: usize) -> Result<(), WireError> {
        if self.remaining() < need {
            Err(WireError::Truncated { at: self.pos, need })
        } else {
            Ok(())
        }
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        self.ensure(n)?;
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), WireError> {
        self.take(n).map(|_| ())
    }

    pub fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16_be(&mut self) -> Result<u16, WireError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Advance past an encoded domain name.
    ///
    /// Stops after the zero-length root label or after a compression
    /// pointer (the pointer target is not followed).
    pub fn skip_name(&mut self) -> Result<(), WireError> {
        loop {
            let at = self.pos;
            let len = self.u8()?;
            match len & LABEL_KIND_MASK {
                0 if len == 0 => return Ok(()),
                0 => self.skip(usize::from(len))?,
                LABEL_POINTER => return self.skip(1),
                // RFC 1035: labels are at most 63 bytes (2.3.4); 0x40/0x80 kinds are reserved (4.1.4).
                _ => return Err(WireError::ReservedLabel { at, byte: len }),
            }
        }
    }
}
