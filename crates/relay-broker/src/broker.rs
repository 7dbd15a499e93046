use std::{
    collections::HashMap,
    sync::{Arc, atomic::AtomicBool, atomic::Ordering},
    time::Duration,
};

use relay_net::{ConnId, Connection, ConnectionManager};
use relay_wire::{Frame, FrameDecoder};
use tracing::{info, warn};

use crate::{error::BrokerError, handler::Handler};

/// Drives a [`ConnectionManager`] one tick at a time, maintaining the live
/// connections table and feeding decoded frames to a [`Handler`].
///
/// Generic over the manager so the same loop runs unmodified against the
/// TCP manager or the in-memory one used by tests.
pub struct Broker<M: ConnectionManager> {
    manager: M,
    handler: Arc<dyn Handler>,
    connections: HashMap<ConnId, (Arc<dyn Connection>, FrameDecoder)>,
}

impl<M: ConnectionManager> Broker<M>
where
    M::Conn: Connection + 'static,
{
    pub fn new(manager: M, handler: Arc<dyn Handler>) -> Self {
        Self { manager, handler, connections: HashMap::new() }
    }

    /// Runs one tick: fetch activity, then process new → readable →
    /// closed, in that fixed order.
    pub fn process_connections(&mut self, timeout: Option<Duration>) -> Result<(), BrokerError> {
        let activity = self.manager.get_activity(timeout)?;

        for conn in activity.new {
            let id = conn.id();
            let conn: Arc<dyn Connection> = Arc::new(conn);
            self.connections.insert(id, (conn, FrameDecoder::new()));
            self.handler.on_new_connection(id);
        }

        for id in activity.readable_ids {
            if let Err(err) = self.service_readable(id) {
                warn!(id, %err, "closing connection after error");
                if self.connections.remove(&id).is_some() {
                    self.handler.on_connection_closed(id);
                }
            }
        }

        for id in activity.closed_ids {
            if self.connections.remove(&id).is_some() {
                self.handler.on_connection_closed(id);
            }
        }

        Ok(())
    }

    fn service_readable(&mut self, id: ConnId) -> Result<(), BrokerError> {
        let Some((conn, decoder)) = self.connections.get_mut(&id) else {
            return Ok(());
        };

        let mut buf = Vec::new();
        conn.read_available(&mut buf)?;
        decoder.push_bytes(&buf);

        loop {
            let Some(fields) = decoder.try_decode_frame()? else {
                break;
            };
            if let Some(reply) = self.handler.on_message(conn, fields)? {
                conn.write(&Frame::encode(&reply))?;
            }
        }

        Ok(())
    }

    /// Runs ticks with `poll_timeout` until `stop` is set, e.g. by a
    /// signal handler. Returns once the current tick in flight finishes.
    pub fn run_until(&mut self, stop: &AtomicBool, poll_timeout: Duration) -> Result<(), BrokerError> {
        info!("broker loop starting");
        while !stop.load(Ordering::Relaxed) {
            self.process_connections(Some(poll_timeout))?;
        }
        info!("broker loop stopping");
        Ok(())
    }
}
