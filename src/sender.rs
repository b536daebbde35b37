use std::io::{self, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{FetchError, SendError};
use crate::messages::Message;
use crate::transfer::receive_to_file;
use crate::{PeerAddress, SansIo};

/// Used when a [Client] isn't given a timeout of its own.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a connection to a peer, trying each address its host resolves to in turn.
pub fn connect(target: &PeerAddress, timeout: Duration) -> Result<TcpStream, SendError> {
    let send_error = |source| SendError {
        addr: target.clone(),
        source,
    };
    let mut last_error = None;
    for addr in target.to_socket_addrs().map_err(send_error)? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }
    Err(send_error(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "host resolved to no addresses")
    })))
}

/// Write raw bytes to a fresh connection and close it. Nothing is read back.
///
/// `timeout` bounds the connect and every single write, so a peer that stops reading fails the
/// send instead of stalling it.
pub fn send_bytes(target: &PeerAddress, bytes: &[u8], timeout: Duration) -> Result<(), SendError> {
    let mut stream = connect(target, timeout)?;
    stream
        .set_write_timeout(Some(timeout))
        .and_then(|()| stream.write_all(bytes))
        .and_then(|()| stream.shutdown(Shutdown::Write))
        .map_err(|source| SendError {
            addr: target.clone(),
            source,
        })
}

/// Send a single message on its own short-lived connection.
pub fn send_message(
    target: &PeerAddress,
    message: &Message,
    timeout: Duration,
) -> Result<(), SendError> {
    debug!("sending {:?} to {}", message, target);
    send_bytes(target, &message.encode(), timeout)
}

/// Send the same message to every target. A failing target is logged and skipped.
///
/// Returns how many targets could not be reached.
pub fn broadcast(targets: &[PeerAddress], message: &Message, timeout: Duration) -> usize {
    let encoded = message.encode();
    let mut failures = 0;
    for target in targets {
        if let Err(e) = send_bytes(target, &encoded, timeout) {
            warn!("{}: {}", e, e.source);
            failures += 1;
        }
    }
    failures
}

/// Talks to a single peer without running a listener of its own.
#[derive(Debug, Clone)]
pub struct Client {
    peer: PeerAddress,
    connect_timeout: Duration,
}

impl Client {
    pub fn new(peer: PeerAddress) -> Self {
        Self {
            peer,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Push a list of peers for the remote node to merge and gossip onwards.
    pub fn send_peer_list(&self, peers: Vec<PeerAddress>) -> Result<(), SendError> {
        send_message(&self.peer, &Message::peer_list(peers), self.connect_timeout)
    }

    /// Ask the peer for a file and save whatever comes back before it closes the connection.
    ///
    /// The file lands in `dest_dir` under the last component of `filename`. A peer that doesn't
    /// have the file closes without sending anything, which leaves an empty file behind.
    pub fn request_file(&self, filename: &str, dest_dir: &Path) -> Result<PathBuf, FetchError> {
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| FetchError::InvalidFilename(filename.to_string()))?;
        let destination = dest_dir.join(name);

        let mut stream = connect(&self.peer, self.connect_timeout)?;
        stream
            .write_all(&Message::file_request(filename).encode())
            .and_then(|()| stream.shutdown(Shutdown::Write))
            .map_err(|source| SendError {
                addr: self.peer.clone(),
                source,
            })?;

        let received = receive_to_file(&stream, &destination).map_err(|source| FetchError::Io {
            path: destination.clone(),
            source,
        })?;
        info!(
            "received {} bytes of {} from {} into {}",
            received,
            filename,
            self.peer,
            destination.display()
        );
        Ok(destination)
    }
}
