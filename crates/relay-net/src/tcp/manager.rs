use std::{
    collections::HashMap,
    io,
    net::SocketAddr,
    os::fd::AsRawFd,
    sync::Arc,
    time::Duration,
};

use mio::{Events, Interest, Poll, Token, net::TcpListener};
use relay_utils::safe_panic;
use tracing::{debug, info, warn};

use crate::{
    address::Ipv6Address,
    connection::{Activity, Connection, ConnectionManager},
    error::NetError,
    tcp::{connection::TcpConnection, listen::bind_reuseaddr},
};

/// Token reserved for the listening socket. Real connection tokens are the
/// accepted stream's file descriptor, which the kernel never hands out as
/// `usize::MAX`.
const LISTENER_TOKEN: Token = Token(usize::MAX);

const EVENTS_CAPACITY: usize = 256;

/// Readiness-poller connection manager backing the TCP broker.
///
/// Owns the listening socket and the `mio` readiness set for the lifetime
/// of the value; both are torn down on `Drop`, matching the scoped
/// acquire/release contract of the source's context-managed socket
/// manager. Each connection is handed out as an `Arc<TcpConnection>` so
/// the same handle can sit in the manager's own bookkeeping (needed to
/// deregister the stream on close) and in the broker's connection table
/// (needed so pull-worker threads can write replies independently of the
/// reactor thread).
pub struct TcpConnectionManager {
    poll: Poll,
    events: Events,
    listener: TcpListener,
    conns: HashMap<Token, Arc<TcpConnection>>,
}

impl TcpConnectionManager {
    /// Binds a listening socket at `ip:port` with `SO_REUSEADDR` and a
    /// backlog of 10, and registers it for read-readiness.
    pub fn bind(ip: Ipv6Address, port: u16) -> Result<Self, NetError> {
        let addr = SocketAddr::from((std::net::Ipv6Addr::from(ip), port));
        let std_listener = bind_reuseaddr(addr)?;
        std_listener.set_nonblocking(true)?;
        let mut listener = TcpListener::from_std(std_listener);

        let poll = Poll::new()?;
        poll.registry().register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

        info!(%addr, "listening");
        Ok(Self { poll, events: Events::with_capacity(EVENTS_CAPACITY), listener, conns: HashMap::new() })
    }

    /// The address actually bound, useful after binding to port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        Ok(self.listener.local_addr()?)
    }

    fn accept_all(&mut self, new: &mut Vec<Arc<TcpConnection>>) -> Result<(), NetError> {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer_addr)) => {
                    stream.set_nodelay(true).ok();
                    let fd = stream.as_raw_fd();
                    let token = Token(fd as usize);
                    if let Err(err) =
                        self.poll.registry().register(&mut stream, token, Interest::READABLE)
                    {
                        warn!(?err, %peer_addr, "couldn't register accepted connection");
                        continue;
                    }
                    debug!(%peer_addr, id = fd, "accepted connection");
                    let conn = Arc::new(TcpConnection::new(fd as u64, peer_addr, stream));
                    self.conns.insert(token, conn.clone());
                    new.push(conn);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(NetError::Io(e)),
            }
        }
    }

    /// Removes the bookkeeping entry for `token` and deregisters its stream
    /// from the poll registry, so the kernel stops reporting events for a
    /// file descriptor the manager no longer tracks.
    fn close(&mut self, token: Token) {
        if let Some(conn) = self.conns.remove(&token) {
            conn.deregister(self.poll.registry());
        }
    }
}

impl ConnectionManager for TcpConnectionManager {
    type Conn = Arc<TcpConnection>;

    fn get_activity(&mut self, timeout: Option<Duration>) -> Result<Activity<Arc<TcpConnection>>, NetError> {
        self.poll.poll(&mut self.events, timeout)?;

        // Copy out what we need before touching `self.conns`/`self.poll`,
        // since `self.events` borrows `self` for the duration of the
        // iterator.
        let observed: Vec<(Token, bool, bool)> = self
            .events
            .iter()
            .map(|e| (e.token(), e.is_readable(), e.is_read_closed() || e.is_error()))
            .collect();

        let mut new = Vec::new();
        let mut readable_ids = Vec::new();
        let mut closed_ids = Vec::new();

        for (token, readable, hangup) in observed {
            if token == LISTENER_TOKEN {
                self.accept_all(&mut new)?;
                continue;
            }

            let Some(conn) = self.conns.get(&token) else {
                // Already removed this tick (e.g. duplicate event); nothing to do.
                continue;
            };

            if !readable && !hangup {
                safe_panic!("unexpected readiness event for token {token:?}");
                return Err(NetError::UnexpectedReadinessEvent(conn.id()));
            }

            if readable {
                readable_ids.push(conn.id());
            }
            if hangup {
                let id = conn.id();
                self.close(token);
                closed_ids.push(id);
            }
        }

        Ok(Activity { new, readable_ids, closed_ids })
    }
}

impl Drop for TcpConnectionManager {
    fn drop(&mut self) {
        let tokens: Vec<Token> = self.conns.keys().copied().collect();
        for token in tokens {
            self.close(token);
        }
        let _ = self.poll.registry().deregister(&mut self.listener);
    }
}
