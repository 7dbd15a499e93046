mod address;
mod client;
mod connection;
mod error;
mod memory;
mod tcp;

pub use address::Ipv6Address;
pub use client::connect;
pub use connection::{Activity, Connection, ConnId, ConnectionManager};
pub use error::{AddressError, NetError};
pub use memory::{InMemoryConnection, InMemoryConnectionManager, Transport};
pub use tcp::{TcpConnection, TcpConnectionManager};
