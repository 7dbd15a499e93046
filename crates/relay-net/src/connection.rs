use std::sync::Arc;

use crate::error::NetError;

/// Stable, opaque identifier for a connection. For the TCP manager this is
/// the socket's file descriptor; for the in-memory manager it's an
/// incrementing counter. Either way it never repeats for the lifetime of
/// the manager that issued it.
pub type ConnId = u64;

/// A bidirectional byte pipe handed out by a [`ConnectionManager`].
///
/// `read_available` is non-blocking: it drains whatever the OS (or, for
/// the in-memory transport, the counterparty) currently has ready and
/// returns immediately, appending to `buf`. `write` blocks until all bytes
/// are written and is safe to call from multiple threads concurrently —
/// both the reactor (synchronous replies) and pull workers (asynchronous
/// PULL_MSG replies) write through the same connection.
pub trait Connection: Send + Sync {
    fn id(&self) -> ConnId;

    fn read_available(&self, buf: &mut Vec<u8>) -> Result<usize, NetError>;

    fn write(&self, bytes: &[u8]) -> Result<(), NetError>;
}

impl<T: Connection + ?Sized> Connection for Arc<T> {
    fn id(&self) -> ConnId {
        (**self).id()
    }

    fn read_available(&self, buf: &mut Vec<u8>) -> Result<usize, NetError> {
        (**self).read_available(buf)
    }

    fn write(&self, bytes: &[u8]) -> Result<(), NetError> {
        (**self).write(bytes)
    }
}

/// One tick's worth of connection lifecycle events.
///
/// `new` and `readable_ids`/`closed_ids` are disjoint views: a `new`
/// connection's id never also appears in `closed_ids` within the same
/// report, and `closed_ids` only ever names ids a previous report's `new`
/// already announced.
pub struct Activity<C> {
    pub new: Vec<C>,
    pub readable_ids: Vec<ConnId>,
    pub closed_ids: Vec<ConnId>,
}

/// Scoped connection multiplexer: owns whatever OS or in-memory resources
/// back its connections and releases them on `Drop`.
pub trait ConnectionManager {
    type Conn: Connection;

    /// Polls for activity, blocking for at most `timeout` (`None` blocks
    /// indefinitely, `Some(Duration::ZERO)` is a non-blocking probe).
    fn get_activity(
        &mut self,
        timeout: Option<std::time::Duration>,
    ) -> Result<Activity<Self::Conn>, NetError>;
}
