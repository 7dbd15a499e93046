use std::{
    io::{self, Read, Write},
    net::SocketAddr,
    sync::Mutex,
};

use mio::{net::TcpStream, Registry};
use tracing::debug;

use crate::{
    connection::{Connection, ConnId},
    error::NetError,
};

const READ_CHUNK: usize = 32 * 1024;

/// A single accepted, non-blocking TCP connection.
///
/// `id` is the connection's raw file descriptor, matching the contract
/// that a TCP connection's id is stable and equal to its fileno. Reads and
/// writes both go through one mutex: reads only ever happen from the
/// reactor thread, but writes can race between the reactor (synchronous
/// replies) and pull-worker threads (PULL_MSG replies), so the stream
/// itself is the serialization point for both directions.
pub struct TcpConnection {
    id: ConnId,
    peer_addr: SocketAddr,
    stream: Mutex<TcpStream>,
}

impl TcpConnection {
    pub(crate) fn new(id: ConnId, peer_addr: SocketAddr, stream: TcpStream) -> Self {
        Self { id, peer_addr, stream: Mutex::new(stream) }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Unregisters this connection's stream from `registry`. Called by the
    /// manager on hangup and on its own `Drop`, so a closed connection's
    /// fd stops generating readiness events the manager no longer tracks.
    pub(crate) fn deregister(&self, registry: &Registry) {
        let mut stream = self.stream.lock().expect("tcp connection mutex poisoned");
        if let Err(err) = registry.deregister(&mut *stream) {
            debug!(id = self.id, ?err, "tcp: deregister failed");
        }
    }
}

impl Connection for TcpConnection {
    fn id(&self) -> ConnId {
        self.id
    }

    fn read_available(&self, buf: &mut Vec<u8>) -> Result<usize, NetError> {
        let mut stream = self.stream.lock().expect("tcp connection mutex poisoned");
        let mut chunk = [0u8; READ_CHUNK];
        let mut total = 0;
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    total += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(NetError::Io(e)),
            }
        }
        Ok(total)
    }

    fn write(&self, bytes: &[u8]) -> Result<(), NetError> {
        let mut stream = self.stream.lock().expect("tcp connection mutex poisoned");
        stream.write_all(bytes).inspect_err(|err| {
            debug!(id = self.id, ?err, "tcp: write failed");
        })?;
        Ok(())
    }
}
