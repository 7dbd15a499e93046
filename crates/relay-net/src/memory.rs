use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        Arc, Mutex, OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use crate::{
    connection::{Activity, ConnId, Connection, ConnectionManager},
    error::NetError,
};

fn next_conn_id() -> ConnId {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// One direction of a paired in-memory connection: the bytes a party owns
/// and can read, plus (once the party is handed to a manager) the shared
/// set that tracks which connection ids currently have unread data.
struct Cell {
    id: ConnId,
    data: Mutex<VecDeque<u8>>,
    readable: OnceLock<Arc<Mutex<HashSet<ConnId>>>>,
}

impl Cell {
    fn new(id: ConnId) -> Arc<Self> {
        Arc::new(Self { id, data: Mutex::new(VecDeque::new()), readable: OnceLock::new() })
    }

    fn push(&self, bytes: &[u8]) {
        self.data.lock().expect("in-memory cell mutex poisoned").extend(bytes);
        if let Some(readable) = self.readable.get() {
            readable.lock().expect("readable set mutex poisoned").insert(self.id);
        }
    }

    fn drain(&self) -> Vec<u8> {
        let mut data = self.data.lock().expect("in-memory cell mutex poisoned");
        let out: Vec<u8> = data.drain(..).collect();
        if let Some(readable) = self.readable.get() {
            readable.lock().expect("readable set mutex poisoned").remove(&self.id);
        }
        out
    }

    fn attach(&self, readable: Arc<Mutex<HashSet<ConnId>>>) {
        let _ = self.readable.set(readable);
    }
}

/// One side of a paired in-memory connection.
///
/// `own` holds bytes written by the counterparty and readable only by this
/// party; writes go straight into the counterparty's cell. There is no
/// `WouldBlock` on read here: [`Connection::read_available`] drains
/// whatever is present (possibly nothing), matching the TCP connection's
/// non-blocking contract that the broker's accumulation buffer already
/// expects.
pub struct InMemoryConnection {
    id: ConnId,
    own: Arc<Cell>,
    counterparty: Arc<Cell>,
}

impl InMemoryConnection {
    fn pair() -> (Self, Self) {
        let a = Cell::new(next_conn_id());
        let b = Cell::new(next_conn_id());
        let initiator = Self { id: a.id, own: a.clone(), counterparty: b.clone() };
        let acceptor = Self { id: b.id, own: b, counterparty: a };
        (initiator, acceptor)
    }

    fn attach_readable_registry(&self, readable: Arc<Mutex<HashSet<ConnId>>>) {
        self.own.attach(readable);
    }
}

impl Connection for InMemoryConnection {
    fn id(&self) -> ConnId {
        self.id
    }

    fn read_available(&self, buf: &mut Vec<u8>) -> Result<usize, NetError> {
        let bytes = self.own.drain();
        let n = bytes.len();
        buf.extend(bytes);
        Ok(n)
    }

    fn write(&self, bytes: &[u8]) -> Result<(), NetError> {
        self.counterparty.push(bytes);
        Ok(())
    }
}

type ConnectionRequestCallback = Box<dyn Fn(InMemoryConnection) + Send + Sync>;

/// Registry of in-process listeners, keyed by an arbitrary endpoint id.
///
/// Mirrors a real transport's bind/connect split without sockets:
/// [`InMemoryConnectionManager::new`] registers a callback for its
/// endpoint id, and [`Transport::connect`] invokes that callback with one
/// side of a freshly paired connection, returning the other side to the
/// caller.
#[derive(Default)]
pub struct Transport {
    callbacks: Mutex<HashMap<String, ConnectionRequestCallback>>,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_on_connection_request(
        &self,
        endpoint_id: impl Into<String>,
        callback: impl Fn(InMemoryConnection) + Send + Sync + 'static,
    ) {
        self.callbacks.lock().expect("transport mutex poisoned").insert(endpoint_id.into(), Box::new(callback));
    }

    /// Creates a paired connection and hands one side to `endpoint_id`'s
    /// registered manager, returning the other side to the caller.
    ///
    /// Panics if no manager has registered `endpoint_id` yet — connecting
    /// to a listener that was never bound is a programming error, not a
    /// recoverable runtime condition.
    pub fn connect(&self, endpoint_id: &str) -> InMemoryConnection {
        let (initiator, acceptor) = InMemoryConnection::pair();
        let callbacks = self.callbacks.lock().expect("transport mutex poisoned");
        let callback = callbacks.get(endpoint_id).unwrap_or_else(|| {
            panic!("no in-memory listener registered for endpoint {endpoint_id:?}")
        });
        callback(acceptor);
        initiator
    }
}

/// In-memory [`ConnectionManager`], used primarily by the test suite and
/// by any in-process caller that wants a broker without real sockets.
pub struct InMemoryConnectionManager {
    readable: Arc<Mutex<HashSet<ConnId>>>,
    new_connections: Arc<Mutex<Vec<Arc<InMemoryConnection>>>>,
}

impl InMemoryConnectionManager {
    pub fn bind(endpoint_id: impl Into<String>, transport: &Transport) -> Self {
        let readable = Arc::new(Mutex::new(HashSet::new()));
        let new_connections: Arc<Mutex<Vec<Arc<InMemoryConnection>>>> = Arc::new(Mutex::new(Vec::new()));

        let readable_for_callback = readable.clone();
        let new_for_callback = new_connections.clone();
        transport.register_on_connection_request(endpoint_id, move |conn| {
            conn.attach_readable_registry(readable_for_callback.clone());
            new_for_callback.lock().expect("new-connections mutex poisoned").push(Arc::new(conn));
        });

        Self { readable, new_connections }
    }
}

impl ConnectionManager for InMemoryConnectionManager {
    type Conn = Arc<InMemoryConnection>;

    fn get_activity(&mut self, _timeout: Option<Duration>) -> Result<Activity<Arc<InMemoryConnection>>, NetError> {
        let new = std::mem::take(&mut *self.new_connections.lock().expect("new-connections mutex poisoned"));
        let readable_ids: Vec<ConnId> =
            self.readable.lock().expect("readable set mutex poisoned").iter().copied().collect();
        Ok(Activity { new, readable_ids, closed_ids: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_delivers_acceptor_to_bound_manager() {
        let transport = Transport::new();
        let mut manager = InMemoryConnectionManager::bind("broker", &transport);
        let client = transport.connect("broker");

        let activity = manager.get_activity(None).unwrap();
        assert_eq!(activity.new.len(), 1);
        assert_ne!(activity.new[0].id(), client.id());
    }

    #[test]
    fn write_marks_counterparty_readable_until_drained() {
        let transport = Transport::new();
        let mut manager = InMemoryConnectionManager::bind("broker", &transport);
        let client = transport.connect("broker");
        let activity = manager.get_activity(None).unwrap();
        let server_side = activity.new[0].clone();

        client.write(b"hello").unwrap();
        let activity = manager.get_activity(None).unwrap();
        assert_eq!(activity.readable_ids, vec![server_side.id()]);

        let mut buf = Vec::new();
        server_side.read_available(&mut buf).unwrap();
        assert_eq!(buf, b"hello");

        let activity = manager.get_activity(None).unwrap();
        assert!(activity.readable_ids.is_empty());
    }

    #[test]
    #[should_panic(expected = "no in-memory listener registered")]
    fn connect_to_unbound_endpoint_panics() {
        let transport = Transport::new();
        transport.connect("nobody-home");
    }
}
