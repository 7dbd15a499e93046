use relay_net::NetError;
use relay_wire::CodecError;
use thiserror::Error;

/// Failures raised while routing a decoded frame to a channel handler.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("frame has no channel-type field")]
    EmptyFrame,

    #[error("unknown channel type {0}")]
    UnknownChannel(u64),

    #[error("bad command: {0}")]
    BadCommand(String),
}

/// Failures that can close a connection mid-tick. Never fatal to the
/// broker process: the reactor isolates these to the offending
/// connection and continues serving everyone else.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error(transparent)]
    Net(#[from] NetError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
