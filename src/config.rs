use std::path::PathBuf;
use std::time::Duration;

use crate::PeerAddress;

/// How the contents of a requested file travel back to the requester.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReplyMode {
    /// Write the file bytes on the connection the request came in on, then close it.
    #[default]
    SameConnection,
    /// Open a new connection to the requester's address and write the bytes there.
    /// Only works if the requester listens on the address it connected from.
    DialBack,
}

/// Everything a node needs to know before it starts listening.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the listener to. Port 0 picks a free port.
    pub listen: PeerAddress,
    /// Peers known before any gossip has happened.
    pub seeds: Vec<PeerAddress>,
    /// Requested filenames are looked up relative to this directory.
    pub shared_dir: PathBuf,
    pub reply_mode: ReplyMode,
    /// Applies to every outbound connection: rebroadcasts, dial-back replies and announcements.
    pub connect_timeout: Duration,
    /// Starting size of each connection's read buffer, it grows as needed.
    pub initial_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: PeerAddress::new("127.0.0.1", 5000),
            seeds: Vec::new(),
            shared_dir: PathBuf::from("."),
            reply_mode: ReplyMode::default(),
            connect_timeout: Duration::from_secs(5),
            initial_buffer_size: 1024,
        }
    }
}
