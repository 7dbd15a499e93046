use thiserror::Error;

/// Failures raised while decoding or encoding a [`crate::Frame`].
#[derive(Debug, Error)]
pub enum CodecError {
    /// A declared field or count length exceeded the configured maximum.
    #[error("declared length {declared} exceeds the maximum of {max}")]
    LengthOverflow { declared: u64, max: u64 },

    /// A blocking reader hit EOF or an I/O error before a full frame was
    /// read. Only raised by [`crate::Frame::read_from`]; the buffered
    /// [`crate::FrameDecoder`] used by the broker never surfaces this, it
    /// just waits for more bytes on the next poll tick.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] std::io::Error),
}
