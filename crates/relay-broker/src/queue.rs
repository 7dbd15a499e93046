use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread,
};

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender, unbounded};
use relay_net::Connection;
use relay_wire::{Frame, decode_uint, protocol::command};
use tracing::debug;

use crate::{dispatch::ChannelHandler, error::DispatchError};

enum QueueItem {
    Payload(Bytes),
    Poison,
}

/// A single queue's FIFO. `waiting` tracks how many pull workers are
/// currently blocked in [`Queue::pull_blocking`] so shutdown can send
/// exactly enough poison values to wake them all without guessing.
struct Queue {
    sender: Sender<QueueItem>,
    receiver: Receiver<QueueItem>,
    waiting: AtomicUsize,
}

impl Queue {
    fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver, waiting: AtomicUsize::new(0) }
    }

    fn publish(&self, payload: Bytes) {
        let _ = self.sender.send(QueueItem::Payload(payload));
    }

    fn pull_blocking(&self) -> Option<Bytes> {
        self.waiting.fetch_add(1, Ordering::AcqRel);
        let result = match self.receiver.recv() {
            Ok(QueueItem::Payload(payload)) => Some(payload),
            Ok(QueueItem::Poison) | Err(_) => None,
        };
        self.waiting.fetch_sub(1, Ordering::AcqRel);
        result
    }

    fn poison_waiting(&self) {
        let waiting = self.waiting.load(Ordering::Acquire);
        for _ in 0..waiting {
            let _ = self.sender.send(QueueItem::Poison);
        }
    }
}

/// Process-lifetime registry of queues, keyed by queue id. Queues are
/// created on first reference and never destroyed.
pub struct QueueRegistry {
    queues: Mutex<HashMap<u64, Arc<Queue>>>,
    shutting_down: AtomicBool,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self { queues: Mutex::new(HashMap::new()), shutting_down: AtomicBool::new(false) }
    }

    fn queue(&self, id: u64) -> Arc<Queue> {
        self.queues.lock().expect("queue registry mutex poisoned").entry(id).or_insert_with(|| Arc::new(Queue::new())).clone()
    }

    /// Appends `payload` to queue `id`. A no-op once [`Self::shutdown`] has
    /// run: there is no reactor left to have received this call for real.
    pub fn publish(&self, id: u64, payload: Bytes) {
        if self.shutting_down.load(Ordering::Acquire) {
            return;
        }
        self.queue(id).publish(payload);
    }

    /// Blocks until queue `id` has a payload, `None` if the registry is
    /// shut down (either already, or while waiting) before one arrives.
    pub fn pull_blocking(&self, id: u64) -> Option<Bytes> {
        if self.shutting_down.load(Ordering::Acquire) {
            return None;
        }
        self.queue(id).pull_blocking()
    }

    /// Wakes every currently-blocked pull worker across all queues and
    /// rejects further publishes and pulls. Called once, from the broker's
    /// shutdown path.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        let queues = self.queues.lock().expect("queue registry mutex poisoned");
        for queue in queues.values() {
            queue.poison_waiting();
        }
    }
}

impl Default for QueueRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Queue channel handler: PUBLISH appends to a queue, PULL_MSG spawns a
/// worker thread that blocks on that queue and writes the reply directly
/// through the requesting connection once a payload (or shutdown) arrives.
pub struct QueueChannelHandler {
    registry: Arc<QueueRegistry>,
}

impl QueueChannelHandler {
    pub fn new(registry: Arc<QueueRegistry>) -> Self {
        Self { registry }
    }
}

impl ChannelHandler for QueueChannelHandler {
    fn handle(
        &self,
        connection: &Arc<dyn Connection>,
        fields: &[Bytes],
    ) -> Result<Option<Vec<Bytes>>, DispatchError> {
        let mut fields = fields.iter();

        let command = fields
            .next()
            .ok_or_else(|| DispatchError::BadCommand("missing command field".into()))?;
        let command = decode_uint(command);

        let queue_id = fields
            .next()
            .ok_or_else(|| DispatchError::BadCommand("missing queue id field".into()))?;
        let queue_id = decode_uint(queue_id);

        match command {
            command::PUBLISH => {
                let payload = fields
                    .next()
                    .ok_or_else(|| DispatchError::BadCommand("PUBLISH requires a payload field".into()))?;
                if fields.next().is_some() {
                    return Err(DispatchError::BadCommand(
                        "PUBLISH takes exactly one payload field".into(),
                    ));
                }
                self.registry.publish(queue_id, payload.clone());
                Ok(None)
            }
            command::PULL_MSG => {
                if fields.next().is_some() {
                    return Err(DispatchError::BadCommand("PULL_MSG takes no additional fields".into()));
                }
                let registry = self.registry.clone();
                let connection = connection.clone();
                thread::spawn(move || {
                    let Some(payload) = registry.pull_blocking(queue_id) else {
                        return;
                    };
                    if let Err(err) = connection.write(&Frame::encode(&[payload])) {
                        debug!(?err, "pull worker: failed writing reply");
                    }
                });
                Ok(None)
            }
            other => Err(DispatchError::BadCommand(format!("unknown queue command {other}"))),
        }
    }
}
