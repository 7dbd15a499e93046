use std::io::Read;

use bytes::{Bytes, BytesMut};

use crate::{
    MAX_FRAME_FIELD_LEN,
    error::CodecError,
    field::{be_bytes_to_u64, decode_field, encode_field, minimal_be_bytes},
};

/// Stateless frame serialization and blocking-reader deserialization.
///
/// `Frame` holds no state of its own; it's a namespace for the two pure
/// operations defined by the wire grammar. The broker's reactor uses
/// [`FrameDecoder`] instead, since its reads are non-blocking.
pub struct Frame;

impl Frame {
    /// Encodes an ordered sequence of fields as one frame: the field count,
    /// field-encoded, followed by each field, field-encoded.
    pub fn encode<F: AsRef<[u8]>>(fields: &[F]) -> Bytes {
        let mut out = BytesMut::new();
        encode_field(&mut out, &minimal_be_bytes(fields.len() as u64));
        for field in fields {
            encode_field(&mut out, field.as_ref());
        }
        out.freeze()
    }

    /// Reads exactly one frame from a blocking reader (used by clients
    /// talking to the broker over a plain `TcpStream`).
    ///
    /// Any I/O failure, including EOF mid-frame, surfaces as
    /// [`CodecError::MalformedFrame`].
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Vec<Bytes>, CodecError> {
        let count = Self::read_field(reader)?;
        let count = be_bytes_to_u64(&count);
        if count > MAX_FRAME_FIELD_LEN {
            return Err(CodecError::LengthOverflow { declared: count, max: MAX_FRAME_FIELD_LEN });
        }
        (0..count).map(|_| Self::read_field(reader)).collect()
    }

    fn read_field<R: Read>(reader: &mut R) -> Result<Bytes, CodecError> {
        let mut header = [0u8; 1];
        reader.read_exact(&mut header)?;
        let header = header[0];

        if header < 0b1000_0000 {
            return Ok(Bytes::copy_from_slice(&[header]));
        }

        let len_field = (header & 0b0011_1111) as usize;
        let mut len_bytes = vec![0u8; len_field];
        reader.read_exact(&mut len_bytes)?;

        if header & 0b0100_0000 == 0 {
            return Ok(Bytes::from(len_bytes));
        }

        let payload_len = be_bytes_to_u64(&len_bytes);
        if payload_len > MAX_FRAME_FIELD_LEN {
            return Err(CodecError::LengthOverflow {
                declared: payload_len,
                max: MAX_FRAME_FIELD_LEN,
            });
        }
        let mut payload = vec![0u8; payload_len as usize];
        reader.read_exact(&mut payload)?;
        Ok(Bytes::from(payload))
    }
}

/// Buffered, incremental frame decoder for non-blocking readers.
///
/// The broker's connection manager hands this whatever bytes the OS made
/// available on a readable tick via [`FrameDecoder::push_bytes`]; the
/// broker then calls [`FrameDecoder::try_decode_frame`] in a loop until it
/// returns `None`, meaning the buffer holds only a partial frame that will
/// be completed by a future tick.
#[derive(Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends newly-read bytes to the accumulation buffer.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Attempts to decode one complete frame from the front of the buffer.
    ///
    /// Returns `Ok(None)` if the buffer doesn't yet hold a full frame; the
    /// buffer is left untouched in that case and the same bytes are
    /// re-examined (plus whatever arrives next) on the following call.
    pub fn try_decode_frame(&mut self) -> Result<Option<Vec<Bytes>>, CodecError> {
        let mut offset = 0usize;

        let Some((count_field, consumed)) =
            decode_field(&self.buf[offset..], MAX_FRAME_FIELD_LEN)?
        else {
            return Ok(None);
        };
        offset += consumed;
        let count = be_bytes_to_u64(&count_field);
        if count > MAX_FRAME_FIELD_LEN {
            return Err(CodecError::LengthOverflow { declared: count, max: MAX_FRAME_FIELD_LEN });
        }

        let mut fields = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let Some((field, consumed)) = decode_field(&self.buf[offset..], MAX_FRAME_FIELD_LEN)?
            else {
                return Ok(None);
            };
            offset += consumed;
            fields.push(field);
        }

        let _ = self.buf.split_to(offset);
        Ok(Some(fields))
    }
}
