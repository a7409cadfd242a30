// Variable-length integers for the cache store.
//
// Base-128, big-endian: most-significant group first, bit 7 set on every
// byte except the last.

use thiserror::Error;

/// Longest encoding of a 64-bit value (ceil(64/7)).
const MAX_LEN: usize = 10;

/// Bits that must be clear before another `<< 7` on a 64-bit accumulator.
const OVERFLOW_MASK: u64 = 0xFE00_0000_0000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VarIntError {
    #[error("varint underflow (truncated input)")]
    Underflow,
    #[error("varint overflow")]
    Overflow,
}

/// Append `value` to `out`.
pub fn put(out: &mut Vec<u8>, mut value: u64) {
    let mut buf = [0u8; MAX_LEN];
    let mut i = MAX_LEN;
    loop {
        i -= 1;
        buf[i] = (value as u8 & 0x7F) | 0x80;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    buf[MAX_LEN - 1] &= 0x7F;
    out.extend_from_slice(&buf[i..]);
}

/// Append a length or count.
pub fn put_usize(out: &mut Vec<u8>, value: usize) {
    put(out, value as u64);
}

/// Read one value from the front of `data`.
/// Returns `(value, bytes_consumed)`.
pub fn take(data: &[u8]) -> Result<(u64, usize), VarIntError> {
    let mut value: u64 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if value & OVERFLOW_MASK != 0 {
            return Err(VarIntError::Overflow);
        }
        value = (value << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(VarIntError::Underflow)
}

/// Read a length or count, rejecting values that do not fit `usize`.
pub fn take_usize(data: &[u8]) -> Result<(usize, usize), VarIntError> {
    let (value, len) = take(data)?;
    let value = usize::try_from(value).map_err(|_| VarIntError::Overflow)?;
    Ok((value, len))
}
