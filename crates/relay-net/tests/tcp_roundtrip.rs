use std::{io::Read, io::Write, thread, time::Duration};

use relay_net::{Connection, ConnectionManager, Ipv6Address, TcpConnectionManager};

#[test]
fn accepts_and_echoes_bytes() {
    let mut manager = TcpConnectionManager::bind(Ipv6Address::LOCALHOST, 0).unwrap();
    let port = match manager.local_addr().unwrap() {
        std::net::SocketAddr::V6(addr) => addr.port(),
        other => panic!("expected an IPv6 local address, got {other}"),
    };

    let client_thread = thread::spawn(move || {
        let mut stream = relay_net::connect(Ipv6Address::LOCALHOST, port, Some(Duration::from_secs(5))).unwrap();
        stream.write_all(b"ping").unwrap();
        let mut reply = [0u8; 4];
        stream.read_exact(&mut reply).unwrap();
        reply
    });

    // Accept the connection.
    let activity = loop {
        let activity = manager.get_activity(Some(Duration::from_secs(5))).unwrap();
        if !activity.new.is_empty() {
            break activity;
        }
    };
    assert_eq!(activity.new.len(), 1);
    let server_side = activity.new[0].clone();

    // Wait for the client's bytes to arrive.
    let mut buf = Vec::new();
    loop {
        let activity = manager.get_activity(Some(Duration::from_secs(5))).unwrap();
        if activity.readable_ids.contains(&server_side.id()) {
            server_side.read_available(&mut buf).unwrap();
            if !buf.is_empty() {
                break;
            }
        }
    }
    assert_eq!(buf, b"ping");

    server_side.write(b"pong").unwrap();
    let reply = client_thread.join().unwrap();
    assert_eq!(&reply, b"pong");
}

#[test]
fn closed_connection_is_reported_and_deregistered() {
    let mut manager = TcpConnectionManager::bind(Ipv6Address::LOCALHOST, 0).unwrap();
    let port = match manager.local_addr().unwrap() {
        std::net::SocketAddr::V6(addr) => addr.port(),
        other => panic!("expected an IPv6 local address, got {other}"),
    };

    let client_thread = thread::spawn(move || {
        let stream = relay_net::connect(Ipv6Address::LOCALHOST, port, None).unwrap();
        drop(stream);
    });

    let activity = loop {
        let activity = manager.get_activity(Some(Duration::from_secs(5))).unwrap();
        if !activity.new.is_empty() {
            break activity;
        }
    };
    let id = activity.new[0].id();
    client_thread.join().unwrap();

    let closed = loop {
        let activity = manager.get_activity(Some(Duration::from_secs(5))).unwrap();
        if !activity.closed_ids.is_empty() {
            break activity.closed_ids;
        }
    };
    assert_eq!(closed, vec![id]);
}
