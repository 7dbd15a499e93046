use relay_wire::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed reply: {0}")]
    Codec(#[from] CodecError),

    #[error("pull reply carried {field_count} fields, expected exactly 1")]
    UnexpectedReply { field_count: usize },
}
