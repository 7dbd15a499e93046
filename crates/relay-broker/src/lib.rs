mod broker;
mod dispatch;
mod error;
mod handler;
mod queue;

pub use broker::Broker;
pub use dispatch::{ChannelHandler, Dispatcher};
pub use error::{BrokerError, DispatchError};
pub use handler::Handler;
pub use queue::{QueueChannelHandler, QueueRegistry};

/// Builds the default dispatcher: the queue channel handler registered at
/// [`relay_wire::protocol::channel_type::QUEUE`].
pub fn default_dispatcher() -> (Dispatcher, std::sync::Arc<QueueRegistry>) {
    let registry = std::sync::Arc::new(QueueRegistry::new());
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(
        relay_wire::protocol::channel_type::QUEUE,
        std::sync::Arc::new(QueueChannelHandler::new(registry.clone())),
    );
    (dispatcher, registry)
}
