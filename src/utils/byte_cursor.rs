use byteorder::{BigEndian, ByteOrder};
use memchr::memmem;

use crate::err::{DeserializationError, DeserializationResult};
use crate::utils::bytes;

/// A lightweight cursor over an immutable byte slice.
///
/// This is the slice/offset equivalent of `Cursor<&[u8]>`, intended for parsing where:
/// - the data is already in memory, and
/// - we want explicit bounds/offset control without IO-style error plumbing.
///
/// All reads are big-endian and advance the cursor on success. A failed read leaves the
/// position untouched.
#[derive(Clone, Copy, Debug)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub fn with_pos(buf: &'a [u8], pos: usize) -> DeserializationResult<Self> {
        // Allow pos == len (EOF), reject pos > len.
        let _ = bytes::slice_r(buf, pos, 0, "cursor.position")?;
        Ok(Self { buf, pos })
    }

    #[inline]
    pub fn buf(&self) -> &'a [u8] {
        self.buf
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.remaining() == 0
    }

    #[inline]
    pub fn set_pos(&mut self, pos: usize, what: &'static str) -> DeserializationResult<()> {
        let _ = bytes::slice_r(self.buf, pos, 0, what)?;
        self.pos = pos;
        Ok(())
    }

    #[inline]
    pub fn advance(&mut self, n: usize, what: &'static str) -> DeserializationResult<()> {
        let new_pos = self
            .pos
            .checked_add(n)
            .ok_or_else(|| bytes::out_of_data(what, self.pos, n, self.buf.len()))?;
        if new_pos > self.buf.len() {
            return Err(bytes::out_of_data(what, self.pos, n, self.buf.len()));
        }
        self.pos = new_pos;
        Ok(())
    }

    #[inline]
    pub fn take_bytes(&mut self, len: usize, what: &'static str) -> DeserializationResult<&'a [u8]> {
        let out = bytes::slice_r(self.buf, self.pos, len, what)?;
        self.pos += len;
        Ok(out)
    }

    #[inline]
    pub fn array<const N: usize>(&mut self, what: &'static str) -> DeserializationResult<[u8; N]> {
        let v = bytes::read_array_r::<N>(self.buf, self.pos, what)?;
        self.pos += N;
        Ok(v)
    }

    #[inline]
    pub fn u8(&mut self) -> DeserializationResult<u8> {
        self.u8_named("u8")
    }

    #[inline]
    pub fn u8_named(&mut self, what: &'static str) -> DeserializationResult<u8> {
        let b = bytes::read_u8(self.buf, self.pos)
            .ok_or_else(|| bytes::out_of_data(what, self.pos, 1, self.buf.len()))?;
        self.pos += 1;
        Ok(b)
    }

    #[inline]
    pub fn u16(&mut self) -> DeserializationResult<u16> {
        self.u16_named("u16")
    }

    #[inline]
    pub fn u16_named(&mut self, what: &'static str) -> DeserializationResult<u16> {
        let v = bytes::read_u16_be_r(self.buf, self.pos, what)?;
        self.pos += 2;
        Ok(v)
    }

    #[inline]
    pub fn u32(&mut self) -> DeserializationResult<u32> {
        self.u32_named("u32")
    }

    #[inline]
    pub fn u32_named(&mut self, what: &'static str) -> DeserializationResult<u32> {
        let v = bytes::read_u32_be_r(self.buf, self.pos, what)?;
        self.pos += 4;
        Ok(v)
    }

    /// Read `count` big-endian longwords.
    ///
    /// Does a single bounds check for the whole run before reading anything.
    pub fn u32_vec(&mut self, count: usize, what: &'static str) -> DeserializationResult<Vec<u32>> {
        let len = count
            .checked_mul(4)
            .ok_or_else(|| bytes::out_of_data(what, self.pos, usize::MAX, self.buf.len()))?;
        let raw = self.take_bytes(len, what)?;
        let mut out = vec![0; count];
        BigEndian::read_u32_into(raw, &mut out);
        Ok(out)
    }

    /// Read bytes up to (not including) the next NUL, consuming the terminator.
    pub fn null_terminated_bytes(&mut self, what: &'static str) -> DeserializationResult<&'a [u8]> {
        let rest = self.buf.get(self.pos..).unwrap_or_default();
        let len = memchr::memchr(0, rest).ok_or(DeserializationError::OutOfData {
            what,
            offset: self.position(),
            need: rest.len() + 1,
            have: rest.len(),
        })?;
        let out = &rest[..len];
        self.pos += len + 1;
        Ok(out)
    }

    /// Absolute offset of the first occurrence of `marker` anywhere in the buffer.
    pub fn find(&self, marker: &[u8]) -> Option<usize> {
        memmem::find(self.buf, marker)
    }
}
