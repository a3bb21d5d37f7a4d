//! Pure encode/decode routines mapping between typed request/response
//! objects and byte buffers, for both the Fabric Management API family
//! and the emulator control family (`spec.md` §4.1).
//!
//! Decoding never panics on short input: every read through [`Cursor`]
//! returns [`CoreError::Truncated`] instead. Encoding writes exactly the
//! bytes a shape declares, no implicit padding beyond what a shape spells
//! out explicitly (reserved bytes are written as zero, matching the
//! teacher's own `TlpHeader::to_buffer` convention of zero-filling
//! unused header bits).

pub mod emu;
pub mod fmapi;

use crate::error::{CoreError, CoreResult};

/// A read cursor over a decode buffer, used the way the teacher's
/// `parser.rs` threads a `&[u8]` through successive `nom` combinators —
/// here hand-rolled since every field in these headers is a fixed-width
/// little-endian scalar rather than a variable grammar.
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CoreError::Truncated {
                need: n,
                have: self.remaining(),
            });
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    pub fn u8(&mut self) -> CoreResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> CoreResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> CoreResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self) -> CoreResult<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn bool_u8(&mut self) -> CoreResult<bool> {
        Ok(self.u8()? != 0)
    }

    pub fn bytes(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        self.take(n)
    }
}

/// A write buffer mirroring [`Cursor`] on the encode side.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Writer { buf: Vec::new() }
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn bool_u8(&mut self, v: bool) {
        self.u8(v as u8);
    }

    pub fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    pub fn pad(&mut self, n: usize) {
        self.buf.extend(std::iter::repeat(0u8).take(n));
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Decode a nom-style counted list of fixed-size blocks: a count prefix
/// followed by that many `width`-byte elements. Used for the MCC
/// allocation/QoS list opcodes, which share this "counted-list-of-blocks"
/// structural identifier (`spec.md` §4.1).
pub fn decode_u8_list(input: &mut Cursor<'_>, count: usize) -> CoreResult<Vec<u8>> {
    use nom::number::complete::le_u8;
    use nom::multi::count as nom_count;

    let bytes = input.bytes(count)?;
    let (_, list) = nom_count(le_u8::<_, nom::error::Error<&[u8]>>, count)(bytes)
        .map_err(|_| CoreError::Truncated { need: count, have: bytes.len() })?;
    Ok(list)
}
