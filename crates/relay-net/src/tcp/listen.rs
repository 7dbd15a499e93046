use std::{io, net::SocketAddr, os::fd::FromRawFd};

/// Backlog passed to `listen(2)`.
const BACKLOG: i32 = 10;

/// Builds a listening socket with `SO_REUSEADDR` set before `bind`, which
/// `std::net::TcpListener::bind` has no way to express (the option only
/// has an effect if set before the bind call).
pub(crate) fn bind_reuseaddr(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    unsafe {
        let fd = libc::socket(libc::AF_INET6, libc::SOCK_STREAM, 0);
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let reuse: libc::c_int = 1;
        if libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &reuse as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        ) != 0
        {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        let sockaddr = sockaddr_in6(addr);
        if libc::bind(
            fd,
            &sockaddr as *const libc::sockaddr_in6 as *const libc::sockaddr,
            std::mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
        ) != 0
        {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        if libc::listen(fd, BACKLOG) != 0 {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        Ok(std::net::TcpListener::from_raw_fd(fd))
    }
}

fn sockaddr_in6(addr: SocketAddr) -> libc::sockaddr_in6 {
    let SocketAddr::V6(addr) = addr else {
        panic!("relay-net only binds IPv6 listeners, got {addr}");
    };
    libc::sockaddr_in6 {
        sin6_family: libc::AF_INET6 as libc::sa_family_t,
        sin6_port: addr.port().to_be(),
        sin6_flowinfo: addr.flowinfo(),
        sin6_addr: libc::in6_addr { s6_addr: addr.ip().octets() },
        sin6_scope_id: addr.scope_id(),
    }
}
