use thiserror::Error;

/// Construction failure for [`crate::Ipv6Address`].
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum AddressError {
    #[error("quartet {value} at position {position} does not fit in 16 bits")]
    QuartetOutOfRange { position: usize, value: u32 },
}

/// Failures raised by a connection manager or connection handle.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The readiness poller reported an event combination the manager
    /// doesn't know how to classify (neither readable nor a hangup/error
    /// bit). Fatal: surfaced by the reactor as a process-level error.
    #[error("unexpected readiness event for connection {0}")]
    UnexpectedReadinessEvent(u64),
}
