use std::net::TcpListener;
use std::sync::Arc;

use eyre::Result;
use tracing::{debug, info};

pub use crate::node::handler::ConnectionHandler;
pub use crate::node::listener::{Listener, ListenerHandle};
pub use crate::node::registry::PeerRegistry;
use crate::config::Config;
use crate::error::BindError;
use crate::messages::Message;
use crate::sender::broadcast;
use crate::transfer::SharedDir;
use crate::PeerAddress;

mod handler;
mod listener;
mod registry;

/// This is the main entry point for this library, a "root aggregate" if you will.
/// It's a cloneable handle to a node's configuration and its registry of known peers.
///
/// A node does nothing until it is bound: call [Node::bind] to get a [Listener], then run or
/// spawn it to start serving peers.
#[derive(Debug, Clone)]
pub struct Node {
    config: Arc<Config>,
    registry: PeerRegistry,
    shared_dir: SharedDir,
}

impl Node {
    /// Create a node whose registry starts out with the configured seed peers.
    pub fn new(config: Config) -> Result<Self> {
        let registry = PeerRegistry::new()?;
        registry.merge(config.seeds.iter().cloned())?;
        Ok(Self {
            shared_dir: SharedDir::new(&config.shared_dir),
            config: Arc::new(config),
            registry,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub fn shared_dir(&self) -> &SharedDir {
        &self.shared_dir
    }

    /// Bind the listening socket. Failing to bind is not retried.
    pub fn bind(&self) -> Result<Listener, BindError> {
        let listener = TcpListener::bind(&self.config.listen).map_err(|source| BindError {
            addr: self.config.listen.clone(),
            source,
        })?;
        let local = listener.local_addr().map_err(|source| BindError {
            addr: self.config.listen.clone(),
            source,
        })?;
        // Keep the configured host, it is what other peers were told to use.
        let address = PeerAddress::new(self.config.listen.host(), local.port());
        info!("Listening on {}", address);
        Ok(Listener::new(self.clone(), listener, address))
    }

    /// Send the current snapshot to every known peer. Returns how many could not be reached.
    pub fn rebroadcast(&self) -> Result<usize> {
        let peers = self.registry.snapshot()?;
        debug!("rebroadcasting {} peer(s)", peers.len());
        Ok(broadcast(
            &peers,
            &Message::peer_list(peers.clone()),
            self.config.connect_timeout,
        ))
    }

    /// Tell every known peer about this node, along with everything it already knows.
    /// Returns how many peers could not be reached.
    pub fn announce(&self, own_address: &PeerAddress) -> Result<usize> {
        let peers = self.registry.snapshot()?;
        let mut advertised = peers.clone();
        advertised.push(own_address.clone());
        info!("announcing {} to {} peer(s)", own_address, peers.len());
        Ok(broadcast(
            &peers,
            &Message::peer_list(advertised),
            self.config.connect_timeout,
        ))
    }
}
