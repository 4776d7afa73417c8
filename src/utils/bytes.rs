//! Byte-slice utilities for bounds-oriented parsing.
//!
//! This module is intentionally tiny: it provides a consistent way to read big-endian
//! primitives out of `&[u8]` at fixed offsets, with minimal overhead.
//!
//! There are two layers:
//! - **Option layer** (`read_*`): zero-cost helpers that return `Option<T>`.
//!   Use these when you want to map failures to your own error type.
//! - **Result layer** (`*_r`): wrappers that map `None` to `DeserializationError::OutOfData`.
//!
//! Design notes:
//! - All numeric reads are **big-endian** (the data was written by a 68000).
//! - Offsets are `usize` and are interpreted relative to the slice you pass in.
//! - Prefer a single up-front bounds check with [`slice_r`] when parsing fixed-size structs.

use byteorder::{BigEndian, ByteOrder};

use crate::err::DeserializationError;

/// Read `N` raw bytes at `offset`.
///
/// Returns `None` if the range is out of bounds.
pub(crate) fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    let bytes: [u8; N] = buf.get(offset..end)?.try_into().ok()?;
    Some(bytes)
}

/// Read a single byte at `offset`.
pub(crate) fn read_u8(buf: &[u8], offset: usize) -> Option<u8> {
    buf.get(offset).copied()
}

/// Read a `u16` (big-endian) at `offset`.
pub(crate) fn read_u16_be(buf: &[u8], offset: usize) -> Option<u16> {
    Some(BigEndian::read_u16(&read_array::<2>(buf, offset)?))
}

/// Read a `u32` (big-endian) at `offset`.
pub(crate) fn read_u32_be(buf: &[u8], offset: usize) -> Option<u32> {
    Some(BigEndian::read_u32(&read_array::<4>(buf, offset)?))
}

#[inline]
pub(crate) fn out_of_data(
    what: &'static str,
    offset: usize,
    need: usize,
    len: usize,
) -> DeserializationError {
    DeserializationError::OutOfData {
        what,
        offset: offset as u64,
        need,
        have: len.saturating_sub(offset),
    }
}

pub(crate) fn slice_r<'a>(
    buf: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], DeserializationError> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| out_of_data(what, offset, len, buf.len()))?;
    buf.get(offset..end)
        .ok_or_else(|| out_of_data(what, offset, len, buf.len()))
}

/// Read `N` raw bytes at `offset`, or return `DeserializationError::OutOfData`.
pub(crate) fn read_array_r<const N: usize>(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<[u8; N], DeserializationError> {
    read_array::<N>(buf, offset).ok_or_else(|| out_of_data(what, offset, N, buf.len()))
}

/// Read a `u16` (big-endian) at `offset`, or return `DeserializationError::OutOfData`.
pub(crate) fn read_u16_be_r(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<u16, DeserializationError> {
    read_u16_be(buf, offset).ok_or_else(|| out_of_data(what, offset, 2, buf.len()))
}

/// Read a `u32` (big-endian) at `offset`, or return `DeserializationError::OutOfData`.
pub(crate) fn read_u32_be_r(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<u32, DeserializationError> {
    read_u32_be(buf, offset).ok_or_else(|| out_of_data(what, offset, 4, buf.len()))
}
