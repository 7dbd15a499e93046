//! Thin client-side wrappers over a raw connection speaking the broker's
//! wire protocol: fire-and-forget publish, and a blocking pull iterator.

mod error;

use std::io::{Read, Write};

use bytes::Bytes;
use relay_wire::{
    Frame, encode_uint,
    protocol::{channel_type, command},
};

pub use error::ClientError;

/// Fire-and-forget PUBLISH: appends `payload` to queue `queue_id`. There
/// is no acknowledgement on the wire, so a successful `write_all` is the
/// only confirmation a caller gets.
pub fn publish<S: Write>(stream: &mut S, queue_id: u64, payload: &[u8]) -> Result<(), ClientError> {
    let frame = Frame::encode(&[
        encode_uint(channel_type::QUEUE),
        encode_uint(command::PUBLISH),
        encode_uint(queue_id),
        payload.to_vec(),
    ]);
    stream.write_all(&frame)?;
    Ok(())
}

/// A payload pulled from a queue. `ack` is a documented no-op: the wire
/// protocol has no acknowledgement channel, so there is nothing for it to
/// do beyond giving callers a place to express intent.
#[derive(Debug, Clone)]
pub struct AckableMessage {
    pub payload: Bytes,
}

impl AckableMessage {
    pub fn ack(&self) {}
}

/// Subscribes to queue `queue_id` over `stream`: each call to `next`
/// sends one PULL_MSG and blocks reading the reply.
pub fn pull_subscribe<S: Read + Write>(stream: &mut S, queue_id: u64) -> PullSubscription<'_, S> {
    PullSubscription { stream, queue_id }
}

pub struct PullSubscription<'s, S> {
    stream: &'s mut S,
    queue_id: u64,
}

impl<S: Read + Write> Iterator for PullSubscription<'_, S> {
    type Item = Result<AckableMessage, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.pull_one())
    }
}

impl<S: Read + Write> PullSubscription<'_, S> {
    fn pull_one(&mut self) -> Result<AckableMessage, ClientError> {
        let frame = Frame::encode(&[
            encode_uint(channel_type::QUEUE),
            encode_uint(command::PULL_MSG),
            encode_uint(self.queue_id),
        ]);
        self.stream.write_all(&frame)?;

        let mut fields = Frame::read_from(self.stream)?;
        if fields.len() != 1 {
            return Err(ClientError::UnexpectedReply { field_count: fields.len() });
        }
        Ok(AckableMessage { payload: fields.remove(0) })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// A byte pipe over a fixed buffer, for exercising the client API
    /// without a real socket: writes go to `written`, reads come from
    /// `inbound`.
    struct LoopbackStream {
        inbound: Cursor<Vec<u8>>,
        written: Vec<u8>,
    }

    impl Read for LoopbackStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inbound.read(buf)
        }
    }

    impl Write for LoopbackStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn publish_writes_a_well_formed_frame() {
        let mut stream = LoopbackStream { inbound: Cursor::new(Vec::new()), written: Vec::new() };
        publish(&mut stream, 0, b"foo").unwrap();
        assert_eq!(&stream.written, &[0x04, 0x01, 0x01, 0x00, 0x83, b'f', b'o', b'o']);
    }

    #[test]
    fn pull_subscribe_sends_request_and_decodes_reply() {
        let reply = Frame::encode(&[b"bar" as &[u8]]);
        let mut stream =
            LoopbackStream { inbound: Cursor::new(reply.to_vec()), written: Vec::new() };

        let mut sub = pull_subscribe(&mut stream, 5);
        let msg = sub.next().unwrap().unwrap();
        assert_eq!(msg.payload, Bytes::from_static(b"bar"));
        msg.ack();

        assert_eq!(&stream.written, &[0x03, 0x01, 0x02, 0x05]);
    }

    #[test]
    fn pull_subscribe_rejects_multi_field_reply() {
        let reply = Frame::encode(&[b"a" as &[u8], b"b" as &[u8]]);
        let mut stream =
            LoopbackStream { inbound: Cursor::new(reply.to_vec()), written: Vec::new() };

        let mut sub = pull_subscribe(&mut stream, 1);
        assert!(matches!(sub.next().unwrap(), Err(ClientError::UnexpectedReply { field_count: 2 })));
    }
}
