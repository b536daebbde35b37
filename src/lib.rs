#![warn(clippy::unwrap_used)]
//! A small peer-to-peer node that gossips peer lists and hands out files over plain TCP.
//!
//! Every node is both a server and a client: a [Listener] serves incoming connections, one
//! thread each, while [Client] and the functions in [sender] open short-lived outbound ones.

pub use config::{Config, ReplyMode};
pub use error::{
    BindError, ConnectionError, DecodeError, FetchError, ParseAddressError, SendError,
    TransferError,
};
pub use messages::Message;
pub use node::{Listener, ListenerHandle, Node, PeerRegistry};
pub use peer_address::PeerAddress;
pub use sans_io::SansIo;
pub use sender::Client;
pub use transfer::file_hash;

mod actor;
mod config;
pub mod connections;
mod error;
pub mod messages;
pub mod node;
mod peer_address;
mod sans_io;
pub mod sender;
pub mod transfer;
