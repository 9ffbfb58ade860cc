//! Big-endian field access at schema offsets, plus the frame checksum.
//!
//! Every accessor takes an `Option<u16>` offset. `None` means the frame type
//! does not carry the field: reads yield 0 and writes do nothing, so callers
//! can walk every field without checking presence first. A slot that would
//! run past the end of the body is treated the same way.

use bytes::{Buf, BufMut};

fn slot(body_len: usize, offset: Option<u16>, width: usize) -> Option<std::ops::Range<usize>> {
    let start = usize::from(offset?);
    let end = start.checked_add(width)?;
    (end <= body_len).then_some(start..end)
}

/// Read a big-endian value `width` bytes wide (at most 8).
pub fn read_be(body: &[u8], offset: Option<u16>, width: usize) -> u64 {
    let width = width.min(8);
    match slot(body.len(), offset, width) {
        Some(range) => (&body[range]).get_uint(width),
        None => 0,
    }
}

/// Write the low `width` bytes of `value` big-endian (at most 8).
pub fn write_be(body: &mut [u8], offset: Option<u16>, width: usize, value: u64) {
    let width = width.min(8);
    if let Some(range) = slot(body.len(), offset, width) {
        (&mut body[range]).put_uint(value, width);
    }
}

pub fn read_u8(body: &[u8], offset: Option<u16>) -> u8 {
    read_be(body, offset, 1) as u8
}

pub fn read_u16(body: &[u8], offset: Option<u16>) -> u16 {
    read_be(body, offset, 2) as u16
}

pub fn read_u32(body: &[u8], offset: Option<u16>) -> u32 {
    read_be(body, offset, 4) as u32
}

pub fn read_u64(body: &[u8], offset: Option<u16>) -> u64 {
    read_be(body, offset, 8)
}

pub fn write_u8(body: &mut [u8], offset: Option<u16>, value: u8) {
    write_be(body, offset, 1, u64::from(value));
}

pub fn write_u16(body: &mut [u8], offset: Option<u16>, value: u16) {
    write_be(body, offset, 2, u64::from(value));
}

pub fn write_u32(body: &mut [u8], offset: Option<u16>, value: u32) {
    write_be(body, offset, 4, u64::from(value));
}

pub fn write_u64(body: &mut [u8], offset: Option<u16>, value: u64) {
    write_be(body, offset, 8, value);
}

/// `0xFF - (sum(body) mod 256)`.
pub fn checksum(body: &[u8]) -> u8 {
    0xFF_u8.wrapping_sub(body.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)))
}

/// True when `body` plus `checksum` sums to `0xFF` mod 256.
pub fn verify_checksum(body: &[u8], checksum: u8) -> bool {
    body.iter()
        .fold(checksum, |acc, &b| acc.wrapping_add(b))
        == 0xFF
}
