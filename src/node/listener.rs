use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, error, info, warn};

use crate::connections::tcp_connection;
use crate::node::handler::ConnectionHandler;
use crate::node::Node;
use crate::PeerAddress;

/// A bound listening socket, ready to accept peers.
#[derive(Debug)]
pub struct Listener {
    node: Node,
    listener: TcpListener,
    address: PeerAddress,
    shutdown: Arc<AtomicBool>,
}

impl Listener {
    pub(crate) fn new(node: Node, listener: TcpListener, address: PeerAddress) -> Self {
        Self {
            node,
            listener,
            address,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The address peers can reach this listener on, with the real port if 0 was configured.
    pub fn address(&self) -> &PeerAddress {
        &self.address
    }

    /// Accept connections until shut down, each one served on its own thread.
    ///
    /// Without [Listener::spawn] and [ListenerHandle::stop] this runs until the process exits.
    pub fn run(&self) {
        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            match stream {
                Ok(stream) => {
                    if let Err(e) = self.serve(stream) {
                        warn!("Failed to set up connection: {}", e);
                    }
                }
                Err(e) => warn!("Failed to accept connection: {}", e),
            }
        }
        info!("Stopped listening on {}", self.address);
    }

    fn serve(&self, stream: TcpStream) -> io::Result<()> {
        let remote = PeerAddress::from(stream.peer_addr()?);
        info!("Accepted connection from {}", remote);
        let (connection_write, connection_read) =
            tcp_connection(self.node.config().initial_buffer_size, stream)?;
        let handler = ConnectionHandler::new(
            self.node.clone(),
            self.address.clone(),
            remote.clone(),
            connection_read,
            connection_write,
        );
        // Handler threads are detached, they end when their connection does.
        let _ = std::thread::Builder::new()
            .name(format!("conn-{remote}"))
            .spawn(move || match handler.run() {
                Ok(()) => debug!("Connection closed from {}", remote),
                Err(e) => warn!("Connection from {} closed: {}", remote, e),
            })?;
        Ok(())
    }

    /// Run the accept loop on a background thread.
    pub fn spawn(self) -> io::Result<ListenerHandle> {
        let wake_address = wake_address(self.listener.local_addr()?);
        let address = self.address.clone();
        let shutdown = self.shutdown.clone();
        let join_handle = std::thread::Builder::new()
            .name(format!("listener-{address}"))
            .spawn(move || self.run())?;
        Ok(ListenerHandle {
            address,
            wake_address,
            shutdown,
            join_handle,
        })
    }
}

/// Controls a listener running on a background thread.
#[derive(Debug)]
pub struct ListenerHandle {
    address: PeerAddress,
    wake_address: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join_handle: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn address(&self) -> &PeerAddress {
        &self.address
    }

    /// Stop accepting and wait for the accept loop to exit.
    /// Connections that were already accepted are left to finish on their own.
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // `accept` only returns when something connects, so connect.
        if let Err(e) = TcpStream::connect(self.wake_address) {
            error!("Failed to wake listener on {}: {}", self.wake_address, e);
            return;
        }
        if let Err(e) = self.join_handle.join() {
            error!("Failed to join listener thread: {:?}", e);
        }
    }
}

// A listener bound to every interface is still reachable on loopback.
fn wake_address(local: SocketAddr) -> SocketAddr {
    match local {
        SocketAddr::V4(addr) if addr.ip().is_unspecified() => {
            SocketAddr::from((Ipv4Addr::LOCALHOST, addr.port()))
        }
        SocketAddr::V6(addr) if addr.ip().is_unspecified() => {
            SocketAddr::from((Ipv6Addr::LOCALHOST, addr.port()))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::config::Config;
    use crate::sender::connect;

    use super::*;

    #[test]
    fn stop_ends_the_accept_loop() {
        let dir = TempDir::new().unwrap();
        let node = Node::new(Config {
            listen: PeerAddress::new("127.0.0.1", 0),
            shared_dir: dir.path().to_path_buf(),
            ..Config::default()
        })
        .unwrap();
        let listener = node.bind().unwrap();
        let address = listener.address().clone();
        assert_ne!(address.port(), 0);

        let handle = listener.spawn().unwrap();
        handle.stop();

        assert!(connect(&address, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn wake_address_uses_loopback_for_wildcards() {
        assert_eq!(
            wake_address("0.0.0.0:4000".parse().unwrap()),
            "127.0.0.1:4000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            wake_address("[::]:4000".parse().unwrap()),
            "[::1]:4000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            wake_address("10.0.0.2:4000".parse().unwrap()),
            "10.0.0.2:4000".parse::<SocketAddr>().unwrap()
        );
    }
}
