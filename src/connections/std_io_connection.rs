use std::cmp::min;
use std::io::{self, ErrorKind, Read, Write};

use tracing::trace;

use crate::connections::{ConnectionRead, ConnectionWrite};
use crate::error::{ConnectionError, DecodeError};
use crate::messages::{DecodedMessage, Message, MAX_FRAME_SIZE};
use crate::SansIo;

// A frame can't be bigger than this, so neither can the buffer holding one.
const MAX_BUFFER_SIZE: usize = MAX_FRAME_SIZE;

/// A [ConnectionRead] implementation built on top of [std::io::Read].
///
/// Bytes are accumulated until a whole frame is buffered, however the reads happen to be split.
/// Bytes past the end of a frame are kept for the next call.
pub struct StdIoConnectionRead<R> {
    reader: R,
    buffer: Vec<u8>,
    buffered: usize,
}

/// A [ConnectionWrite] implementation built on top of [std::io::Write].
pub struct StdIoConnectionWrite<W> {
    writer: W,
}

/// Create a connection built on top of [std::io::Read] and [std::io::Write].
///
/// The read buffer starts at `initial_buffer_size` bytes and doubles whenever a frame doesn't
/// fit, up to the largest frame a peer may send.
pub fn std_io_connection<R, W>(
    initial_buffer_size: usize,
    reader: R,
    writer: W,
) -> (StdIoConnectionWrite<W>, StdIoConnectionRead<R>)
where
    R: Read,
    W: Write,
{
    let read = StdIoConnectionRead {
        reader,
        // `255` here is not a requirement, but it makes debugging easier.
        buffer: vec![255; initial_buffer_size.clamp(1, MAX_BUFFER_SIZE)],
        buffered: 0,
    };
    (StdIoConnectionWrite { writer }, read)
}

impl<R: Read> ConnectionRead for StdIoConnectionRead<R> {
    fn receive(&mut self) -> Result<Option<Message>, ConnectionError> {
        loop {
            if self.buffered > 0 {
                if let Some(DecodedMessage {
                    consumed_bytes,
                    message,
                }) = Message::from_partial_buffer(&self.buffer[..self.buffered])?
                {
                    // Keep the bytes we didn't consume at the front of the buffer.
                    self.buffer.copy_within(consumed_bytes..self.buffered, 0);
                    self.buffered -= consumed_bytes;
                    return Ok(Some(message));
                }
            }

            if self.buffered == self.buffer.len() {
                if self.buffer.len() == MAX_BUFFER_SIZE {
                    return Err(DecodeError::TooLarge {
                        limit: MAX_BUFFER_SIZE,
                    }
                    .into());
                }
                let new_size = min(self.buffer.len() * 2, MAX_BUFFER_SIZE);
                trace!("growing read buffer to {new_size} bytes");
                self.buffer.resize(new_size, 255);
            }

            let bytes_read = match self.reader.read(&mut self.buffer[self.buffered..]) {
                Ok(bytes_read) => bytes_read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if bytes_read == 0 {
                if self.buffered == 0 {
                    return Ok(None);
                }
                return Err(DecodeError::Truncated {
                    buffered: self.buffered,
                }
                .into());
            }
            self.buffered += bytes_read;
        }
    }
}

impl<W: Write> ConnectionWrite for StdIoConnectionWrite<W> {
    fn send(&mut self, message: &Message) -> io::Result<()> {
        self.send_bytes(&message.encode())
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::min;
    use std::io;
    use std::io::{Read, Write};
    use std::sync::{Arc, Mutex};

    use crate::PeerAddress;

    use super::*;

    #[derive(Debug, Default, Clone)]
    struct MockReader {
        responses: Arc<Vec<Vec<u8>>>,
        reads: Arc<Mutex<Vec<usize>>>,
        current_index: usize,
        current_offset: usize,
        fail_at_end: bool,
    }

    impl MockReader {
        fn new(responses: Vec<Vec<u8>>) -> Self {
            Self {
                responses: Arc::new(responses),
                ..Self::default()
            }
        }
    }

    impl Read for MockReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.current_index >= self.responses.len() {
                if self.fail_at_end {
                    return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
                }
                return Ok(0);
            }
            let source = &self.responses[self.current_index][self.current_offset..];
            let limit = min(buf.len(), source.len());

            buf[..limit].copy_from_slice(&source[..limit]);
            self.reads.lock().unwrap().push(limit);

            if limit == source.len() {
                self.current_index += 1;
                self.current_offset = 0;
            } else {
                self.current_offset += limit;
            }
            Ok(limit)
        }
    }

    #[derive(Debug, Default, Clone)]
    struct MockWriter {
        responses: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl Write for MockWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.responses.lock().unwrap().push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            // let's represent flushing as an empty vec
            self.responses.lock().unwrap().push(vec![]);
            Ok(())
        }
    }

    fn sample_request() -> Message {
        Message::file_request("sample.txt")
    }

    #[test]
    fn test_send_ok() {
        let writer = MockWriter::default();
        let (mut connection_write, _) =
            std_io_connection(1024, MockReader::default(), writer.clone());

        connection_write.send(&sample_request()).unwrap();

        assert_eq!(
            *writer.responses.lock().unwrap(),
            vec![sample_request().encode(), vec![]]
        );
    }

    #[test]
    fn test_send_raw_bytes() {
        let writer = MockWriter::default();
        let (mut connection_write, _) =
            std_io_connection(1024, MockReader::default(), writer.clone());

        connection_write.send_bytes(b"hello").unwrap();

        assert_eq!(
            *writer.responses.lock().unwrap(),
            vec![b"hello".to_vec(), vec![]]
        );
    }

    #[test]
    fn test_receive_within_buffer_size() {
        let reader = MockReader::new(vec![sample_request().encode()]);
        let (_, mut connection_read) =
            std_io_connection(1024, reader.clone(), MockWriter::default());

        let message = connection_read.receive().unwrap();

        assert_eq!(message, Some(sample_request()));
        assert_eq!(*reader.reads.lock().unwrap(), vec![15]);
    }

    #[test]
    fn test_receive_outside_buffer_size() {
        let reader = MockReader::new(vec![sample_request().encode()]);
        let (_, mut connection_read) =
            std_io_connection(1, reader.clone(), MockWriter::default());

        let message = connection_read.receive().unwrap();

        assert_eq!(message, Some(sample_request()));
        assert_eq!(*reader.reads.lock().unwrap(), vec![1, 1, 2, 4, 7]);
    }

    #[test]
    fn test_receive_large_peer_list() {
        let peers = (0..2000)
            .map(|port| PeerAddress::new("192.168.100.100", port))
            .collect();
        let message = Message::peer_list(peers);
        let reader = MockReader::new(vec![message.encode()]);
        let (_, mut connection_read) = std_io_connection(1024, reader, MockWriter::default());

        assert_eq!(connection_read.receive().unwrap(), Some(message));
    }

    #[test]
    fn test_receive_incomplete_message() {
        let request_bytes = sample_request().encode();
        let split_point = 7;

        let reader = MockReader::new(vec![
            request_bytes[..split_point].to_vec(),
            request_bytes[split_point..].to_vec(),
        ]);
        let (_, mut connection_read) =
            std_io_connection(1024, reader.clone(), MockWriter::default());

        let message = connection_read.receive().unwrap();

        assert_eq!(message, Some(sample_request()));
        assert_eq!(
            *reader.reads.lock().unwrap(),
            vec![split_point, request_bytes.len() - split_point]
        );
    }

    #[test]
    fn test_receive_two_incomplete_messages() {
        let message1 = Message::peer_list(vec![PeerAddress::new("127.0.0.1", 5001)]);
        let message2 = sample_request();
        let message2_bytes = message2.encode();

        let split_point = 9;
        let mut part1_bytes = message1.encode();
        part1_bytes.extend(message2_bytes[..split_point].to_vec());
        let part2_bytes = message2_bytes[split_point..].to_vec();

        let reader = MockReader::new(vec![part1_bytes.clone(), part2_bytes.clone()]);
        let (_, mut connection_read) =
            std_io_connection(1024, reader.clone(), MockWriter::default());

        assert_eq!(connection_read.receive().unwrap(), Some(message1));
        assert_eq!(connection_read.receive().unwrap(), Some(message2));
        assert_eq!(connection_read.receive().unwrap(), None);
        assert_eq!(
            *reader.reads.lock().unwrap(),
            vec![part1_bytes.len(), part2_bytes.len()]
        );
    }

    #[test]
    fn test_receive_unknown_message() {
        // tag 15 is not a valid message type, split the frame to make the reader wait for it
        let reader = MockReader::new(vec![[0, 0, 0, 5, 15].to_vec(), b"test".to_vec()]);
        let (_, mut connection_read) = std_io_connection(1024, reader, MockWriter::default());

        let err = connection_read.receive().unwrap_err();
        assert!(matches!(err, ConnectionError::Decode(DecodeError::Malformed { .. })));
    }

    #[test]
    fn test_receive_host_longer_than_frame() {
        // the frame is complete but its host claims 16 bytes, more than the frame holds
        let mut bytes = vec![0, 0, 0, 9, 1, 0, 0, 0, 1, 0x00, 0x10, b'a', b'b'];
        bytes.extend(sample_request().encode());
        // reading again would fail with an I/O error, so the reader must not wait for more
        let reader = MockReader {
            fail_at_end: true,
            ..MockReader::new(vec![bytes])
        };
        let (_, mut connection_read) = std_io_connection(1024, reader, MockWriter::default());

        let err = connection_read.receive().unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::Decode(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_receive_clean_close() {
        let (_, mut connection_read) =
            std_io_connection(1024, MockReader::default(), MockWriter::default());

        assert_eq!(connection_read.receive().unwrap(), None);
    }

    #[test]
    fn test_receive_close_mid_message() {
        let mut request_bytes = sample_request().encode();
        request_bytes.truncate(10);
        let reader = MockReader::new(vec![request_bytes]);
        let (_, mut connection_read) = std_io_connection(1024, reader, MockWriter::default());

        let err = connection_read.receive().unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::Decode(DecodeError::Truncated { buffered: 10 })
        ));
    }

    #[test]
    fn test_receive_read_error() {
        let reader = MockReader {
            fail_at_end: true,
            ..MockReader::default()
        };
        let (_, mut connection_read) = std_io_connection(1024, reader, MockWriter::default());

        let err = connection_read.receive().unwrap_err();
        assert!(matches!(err, ConnectionError::Io(_)));
    }
}
