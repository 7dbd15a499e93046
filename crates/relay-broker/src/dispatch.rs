use std::{collections::HashMap, sync::Arc};

use bytes::Bytes;
use relay_net::{ConnId, Connection};
use relay_wire::decode_uint;
use tracing::debug;

use crate::{error::DispatchError, handler::Handler};

/// Handles the remaining fields of a frame once the dispatcher has peeled
/// off the channel-type tag.
pub trait ChannelHandler: Send + Sync {
    fn handle(
        &self,
        connection: &Arc<dyn Connection>,
        fields: &[Bytes],
    ) -> Result<Option<Vec<Bytes>>, DispatchError>;
}

/// Routes a decoded frame's channel-type tag (its first field) to a
/// registered [`ChannelHandler`]. There is exactly one built-in channel
/// type (queues), but the table is open so a future channel type doesn't
/// require touching this struct.
#[derive(Default)]
pub struct Dispatcher {
    channels: HashMap<u64, Arc<dyn ChannelHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel_type: u64, handler: Arc<dyn ChannelHandler>) {
        self.channels.insert(channel_type, handler);
    }
}

impl Handler for Dispatcher {
    fn on_new_connection(&self, id: ConnId) {
        debug!(id, "connection opened");
    }

    fn on_connection_closed(&self, id: ConnId) {
        debug!(id, "connection closed");
    }

    fn on_message(
        &self,
        connection: &Arc<dyn Connection>,
        fields: Vec<Bytes>,
    ) -> Result<Option<Vec<Bytes>>, DispatchError> {
        let mut fields = fields.into_iter();
        let tag = fields.next().ok_or(DispatchError::EmptyFrame)?;
        let channel_type = decode_uint(&tag);

        let handler = self
            .channels
            .get(&channel_type)
            .ok_or(DispatchError::UnknownChannel(channel_type))?;

        let rest: Vec<Bytes> = fields.collect();
        handler.handle(connection, &rest)
    }
}
