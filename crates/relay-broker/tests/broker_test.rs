use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use relay_broker::{Broker, default_dispatcher};
use relay_net::{Connection, InMemoryConnection, InMemoryConnectionManager, Transport};
use relay_wire::{Frame, FrameDecoder};

fn publish_frame(queue_id: u64, payload: &[u8]) -> Bytes {
    Frame::encode(&[&[1u8][..], &[1u8][..], &queue_id.to_be_bytes()[7..], payload])
}

fn pull_msg_frame(queue_id: u64) -> Bytes {
    Frame::encode(&[&[1u8][..], &[2u8][..], &queue_id.to_be_bytes()[7..]])
}

/// Reads and decodes one frame from `conn`, retrying for up to one second.
/// The PULL_MSG reply is written by a worker thread running concurrently
/// with the test, so the bytes may not be there on the first poll.
fn read_one_frame(conn: &InMemoryConnection) -> Vec<Bytes> {
    let mut decoder = FrameDecoder::new();
    for _ in 0..200 {
        let mut buf = Vec::new();
        conn.read_available(&mut buf).unwrap();
        decoder.push_bytes(&buf);
        if let Some(frame) = decoder.try_decode_frame().unwrap() {
            return frame;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("timed out waiting for a reply frame");
}

fn new_broker(transport: &Transport) -> Broker<InMemoryConnectionManager> {
    let manager = InMemoryConnectionManager::bind("broker", transport);
    let (dispatcher, _registry) = default_dispatcher();
    Broker::new(manager, Arc::new(dispatcher))
}

#[test]
fn publish_then_pull_on_one_connection() {
    let transport = Transport::new();
    let mut broker = new_broker(&transport);
    let client = transport.connect("broker");

    broker.process_connections(Some(Duration::ZERO)).unwrap();

    client.write(&publish_frame(0, b"hello")).unwrap();
    broker.process_connections(Some(Duration::ZERO)).unwrap();

    client.write(&pull_msg_frame(0)).unwrap();
    broker.process_connections(Some(Duration::ZERO)).unwrap();

    let reply = read_one_frame(&client);
    assert_eq!(reply, vec![Bytes::from_static(b"hello")]);
}

#[test]
fn ordered_multi_message_pull() {
    let transport = Transport::new();
    let mut broker = new_broker(&transport);
    let client = transport.connect("broker");
    broker.process_connections(Some(Duration::ZERO)).unwrap();

    for payload in [&b"a"[..], &b"b"[..], &b"c"[..]] {
        client.write(&publish_frame(7, payload)).unwrap();
    }
    broker.process_connections(Some(Duration::ZERO)).unwrap();

    for expected in [&b"a"[..], &b"b"[..], &b"c"[..]] {
        client.write(&pull_msg_frame(7)).unwrap();
        broker.process_connections(Some(Duration::ZERO)).unwrap();
        assert_eq!(read_one_frame(&client), vec![Bytes::copy_from_slice(expected)]);
    }
}

#[test]
fn queues_are_isolated_by_id() {
    let transport = Transport::new();
    let mut broker = new_broker(&transport);
    let client = transport.connect("broker");
    broker.process_connections(Some(Duration::ZERO)).unwrap();

    client.write(&publish_frame(1, b"for-one")).unwrap();
    client.write(&publish_frame(2, b"for-two")).unwrap();
    broker.process_connections(Some(Duration::ZERO)).unwrap();

    client.write(&pull_msg_frame(2)).unwrap();
    broker.process_connections(Some(Duration::ZERO)).unwrap();
    assert_eq!(read_one_frame(&client), vec![Bytes::from_static(b"for-two")]);

    client.write(&pull_msg_frame(1)).unwrap();
    broker.process_connections(Some(Duration::ZERO)).unwrap();
    assert_eq!(read_one_frame(&client), vec![Bytes::from_static(b"for-one")]);
}

#[test]
fn pull_blocks_until_publish_arrives() {
    let transport = Transport::new();
    let mut broker = new_broker(&transport);
    let client = transport.connect("broker");
    broker.process_connections(Some(Duration::ZERO)).unwrap();

    client.write(&pull_msg_frame(3)).unwrap();
    broker.process_connections(Some(Duration::ZERO)).unwrap();

    // No publish yet; the pull worker is parked on the queue. A handful of
    // ticks shouldn't produce a reply.
    let mut decoder = FrameDecoder::new();
    for _ in 0..5 {
        let mut buf = Vec::new();
        client.read_available(&mut buf).unwrap();
        decoder.push_bytes(&buf);
        assert_eq!(decoder.try_decode_frame().unwrap(), None);
    }

    client.write(&publish_frame(3, b"finally")).unwrap();
    broker.process_connections(Some(Duration::ZERO)).unwrap();

    assert_eq!(read_one_frame(&client), vec![Bytes::from_static(b"finally")]);
}
