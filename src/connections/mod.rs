use std::io::{self, BufWriter};
use std::net::TcpStream;

use crate::error::ConnectionError;
use crate::messages::Message;

pub use std_io_connection::{std_io_connection, StdIoConnectionRead, StdIoConnectionWrite};

pub mod std_io_connection;

/// The read half of a connection: a sequence of whole messages.
pub trait ConnectionRead {
    /// Block until the next message has arrived.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection cleanly between two messages.
    fn receive(&mut self) -> Result<Option<Message>, ConnectionError>;
}

/// The write half of a connection.
pub trait ConnectionWrite {
    fn send(&mut self, message: &Message) -> io::Result<()>;

    /// Write raw bytes with no framing at all, used for file contents.
    fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// Split a TCP stream into a message reader and a buffered writer.
pub fn tcp_connection(
    initial_buffer_size: usize,
    stream: TcpStream,
) -> io::Result<(
    StdIoConnectionWrite<BufWriter<TcpStream>>,
    StdIoConnectionRead<TcpStream>,
)> {
    let reader = stream.try_clone()?;
    let writer = BufWriter::new(stream);
    Ok(std_io_connection(initial_buffer_size, reader, writer))
}
