use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

use crate::PeerAddress;

/// Why a `host:port` string could not be turned into a [PeerAddress].
#[derive(Debug, Error)]
pub enum ParseAddressError {
    #[error("missing `:port` in peer address \"{0}\"")]
    MissingPort(String),

    #[error("missing host in peer address \"{0}\"")]
    EmptyHost(String),

    #[error("host is {0} bytes long, that is not a hostname")]
    HostTooLong(usize),

    #[error("invalid port \"{port}\"")]
    InvalidPort {
        port: String,
        #[source]
        source: ParseIntError,
    },
}

/// The listening socket could not be bound. Fatal at startup, never retried.
#[derive(Debug, Error)]
#[error("failed to bind listener on {addr}")]
pub struct BindError {
    pub addr: PeerAddress,
    #[source]
    pub source: io::Error,
}

/// The bytes on a connection were not a valid message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed message at byte {offset} ({kind:?})")]
    Malformed {
        offset: usize,
        kind: nom::error::ErrorKind,
    },

    #[error("connection closed in the middle of a message ({buffered} bytes buffered)")]
    Truncated { buffered: usize },

    #[error("message does not fit in {limit} bytes")]
    TooLarge { limit: usize },
}

/// A connection could not be used any more: its bytes made no sense, or the socket failed.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("I/O error on the connection")]
    Io(#[from] io::Error),
}

/// A single outbound attempt failed. Broadcasts log these and move on to the next peer.
#[derive(Debug, Error)]
#[error("failed to send to {addr}")]
pub struct SendError {
    pub addr: PeerAddress,
    #[source]
    pub source: io::Error,
}

/// A requested file could not be served.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("file {0} not found")]
    NotFound(PathBuf),

    #[error("{0} is outside the shared directory")]
    OutsideSharedDir(PathBuf),

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The client-side receive path failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Send(#[from] SendError),

    #[error("\"{0}\" does not name a file")]
    InvalidFilename(String),

    #[error("failed to receive {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
