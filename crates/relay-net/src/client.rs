use std::{io, net::TcpStream, time::Duration};

use crate::address::Ipv6Address;

/// Opens a blocking TCP connection to `ip:port`, optionally applying a read
/// timeout.
///
/// Unlike [`crate::tcp::TcpConnection`] (non-blocking, used by the
/// reactor), the returned stream is for a client talking to the broker:
/// it writes a request frame and then blocks reading the reply, so it
/// wants ordinary blocking socket semantics rather than the manager's
/// readiness-driven contract.
pub fn connect(ip: Ipv6Address, port: u16, read_timeout: Option<Duration>) -> io::Result<TcpStream> {
    let addr = std::net::SocketAddr::from((std::net::Ipv6Addr::from(ip), port));
    let stream = TcpStream::connect(addr)?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(read_timeout)?;
    Ok(stream)
}
