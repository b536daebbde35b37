use std::collections::BTreeSet;

use eyre::Result;
use tracing::info;

use crate::actor::{Actor, Handle};
use crate::PeerAddress;

/// Owns the set of known peers. Only ever touched from its own actor thread.
#[derive(Debug, Default)]
pub struct RegistryActor {
    peers: BTreeSet<PeerAddress>,
}

impl RegistryActor {
    /// Add every address not known yet. Returns whether anything was added.
    pub fn merge(&mut self, addresses: impl IntoIterator<Item = PeerAddress>) -> bool {
        let before = self.peers.len();
        self.peers.extend(addresses);
        let added = self.peers.len() - before;
        if added > 0 {
            info!("learned {} new peer(s), {} known", added, self.peers.len());
        }
        added > 0
    }

    pub fn snapshot(&self) -> Vec<PeerAddress> {
        self.peers.iter().cloned().collect()
    }
}

impl Actor for RegistryActor {
    fn name(&self) -> String {
        "peer-registry".to_string()
    }
}

/// A cloneable handle to the set of peers this node knows about.
///
/// Peers are only ever added. Every clone talks to the same registry, and merges and snapshots
/// are applied one at a time in the order they arrive, so a snapshot never sees half a merge.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    actor: Handle<RegistryActor>,
}

impl PeerRegistry {
    pub fn new() -> Result<Self> {
        Ok(Self {
            actor: Handle::spawn(RegistryActor::default())?,
        })
    }

    /// Add any addresses not known yet. Returns whether the set grew.
    ///
    /// Merging is idempotent and order-independent: any interleaving of merges ends in the
    /// union of everything merged.
    pub fn merge(&self, addresses: impl IntoIterator<Item = PeerAddress>) -> Result<bool> {
        let addresses: Vec<PeerAddress> = addresses.into_iter().collect();
        self.actor.ask(move |registry| registry.merge(addresses))
    }

    /// A sorted copy of every known peer.
    pub fn snapshot(&self) -> Result<Vec<PeerAddress>> {
        self.actor.ask(|registry| registry.snapshot())
    }

    pub fn contains(&self, address: &PeerAddress) -> Result<bool> {
        let address = address.clone();
        self.actor.ask(move |registry| registry.peers.contains(&address))
    }

    pub fn len(&self) -> Result<usize> {
        self.actor.ask(|registry| registry.peers.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
