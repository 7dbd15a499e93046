use bytes::{Bytes, BytesMut};

use crate::error::CodecError;

const SHORT_MASK: u8 = 0b1000_0000;
const LONG_BIT: u8 = 0b0100_0000;
const LEN_MASK: u8 = 0b0011_1111;

/// Appends the field encoding of `field` to `out`.
///
/// Short form for a single byte below 0x80, medium form for lengths up to
/// 63, long form (length-of-length prefix) otherwise.
pub(crate) fn encode_field(out: &mut BytesMut, field: &[u8]) {
    if field.len() == 1 && field[0] < SHORT_MASK {
        out.extend_from_slice(field);
        return;
    }

    if field.len() <= LEN_MASK as usize {
        out.extend_from_slice(&[0b1000_0000 | field.len() as u8]);
        out.extend_from_slice(field);
        return;
    }

    let len_bytes = minimal_be_bytes(field.len() as u64);
    debug_assert!(len_bytes.len() < LEN_MASK as usize);
    out.extend_from_slice(&[0b1100_0000 | len_bytes.len() as u8]);
    out.extend_from_slice(&len_bytes);
    out.extend_from_slice(field);
}

/// Minimal-length big-endian unsigned encoding of `value`; zero encodes as
/// a single `0x00` byte rather than the empty string.
pub(crate) fn minimal_be_bytes(value: u64) -> Vec<u8> {
    if value == 0 {
        return vec![0];
    }
    let full = value.to_be_bytes();
    let first_nonzero = full.iter().position(|&b| b != 0).unwrap();
    full[first_nonzero..].to_vec()
}

/// Big-endian unsigned decode of a field's raw bytes.
pub(crate) fn be_bytes_to_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Public wrapper for encoding a channel-type tag, command, or queue id as
/// a frame field. Every integer carried inside a frame (tags, commands,
/// ids) uses this same minimal big-endian form.
pub fn encode_uint(value: u64) -> Vec<u8> {
    minimal_be_bytes(value)
}

/// Public wrapper for decoding a field back into the integer the dispatcher
/// or a channel handler expects.
pub fn decode_uint(bytes: &[u8]) -> u64 {
    be_bytes_to_u64(bytes)
}

/// Attempts to decode one field starting at the front of `buf`.
///
/// Returns `Ok(None)` when `buf` doesn't yet hold a complete field (the
/// caller should wait for more bytes); never mutates `buf` on that path.
/// Returns `Ok(Some((field, consumed)))` on success, where `consumed` is the
/// number of bytes of `buf` the field occupied.
pub(crate) fn decode_field(
    buf: &[u8],
    max_len: u64,
) -> Result<Option<(Bytes, usize)>, CodecError> {
    let Some(&header) = buf.first() else {
        return Ok(None);
    };

    if header < SHORT_MASK {
        return Ok(Some((Bytes::copy_from_slice(&buf[..1]), 1)));
    }

    let len_field = (header & LEN_MASK) as usize;
    if buf.len() < 1 + len_field {
        return Ok(None);
    }
    let len_bytes = &buf[1..1 + len_field];

    if header & LONG_BIT == 0 {
        // Medium form: len_bytes *is* the field.
        return Ok(Some((Bytes::copy_from_slice(len_bytes), 1 + len_field)));
    }

    // Long form: len_bytes encodes the payload length.
    let payload_len = be_bytes_to_u64(len_bytes);
    if payload_len > max_len {
        return Err(CodecError::LengthOverflow { declared: payload_len, max: max_len });
    }
    let payload_len = payload_len as usize;
    let header_len = 1 + len_field;
    if buf.len() < header_len + payload_len {
        return Ok(None);
    }
    let field = &buf[header_len..header_len + payload_len];
    Ok(Some((Bytes::copy_from_slice(field), header_len + payload_len)))
}
