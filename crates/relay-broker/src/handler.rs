use std::sync::Arc;

use bytes::Bytes;
use relay_net::{ConnId, Connection};

use crate::error::DispatchError;

/// Consumed by the broker loop once per connection lifecycle event and
/// once per decoded frame.
///
/// `on_message` only ever returns a *synchronous* reply: a handler that
/// needs to block (a queue pull with nothing to pull yet) dispatches its
/// own worker and writes the eventual reply directly through `connection`,
/// bypassing this return path entirely.
pub trait Handler: Send + Sync {
    fn on_new_connection(&self, id: ConnId);

    fn on_connection_closed(&self, id: ConnId);

    fn on_message(
        &self,
        connection: &Arc<dyn Connection>,
        fields: Vec<Bytes>,
    ) -> Result<Option<Vec<Bytes>>, DispatchError>;
}
