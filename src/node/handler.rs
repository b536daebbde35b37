use tracing::{debug, error, info, trace, warn};

use crate::config::ReplyMode;
use crate::connections::{ConnectionRead, ConnectionWrite};
use crate::error::{ConnectionError, TransferError};
use crate::messages::{FileRequest, Message, PeerList};
use crate::node::Node;
use crate::sender::send_bytes;
use crate::PeerAddress;

/// Where a connection is in its life.
#[derive(Debug)]
enum HandlerState {
    AwaitingMessage,
    Dispatching(Message),
    Closed(Result<(), ConnectionError>),
}

/// Serves a single inbound connection: reads messages one at a time and acts on each.
///
/// Nothing a handler runs into is passed on to other connections. The worst a peer can do
/// is get its own connection closed.
pub struct ConnectionHandler<R, W> {
    node: Node,
    local: PeerAddress,
    remote: PeerAddress,
    connection_read: R,
    connection_write: W,
}

impl<R, W> ConnectionHandler<R, W>
where
    R: ConnectionRead,
    W: ConnectionWrite,
{
    /// `local` is the address this node listens on, `remote` the address the peer connected
    /// from. Dial-back replies go to `remote`.
    pub fn new(
        node: Node,
        local: PeerAddress,
        remote: PeerAddress,
        connection_read: R,
        connection_write: W,
    ) -> Self {
        Self {
            node,
            local,
            remote,
            connection_read,
            connection_write,
        }
    }

    /// Handle messages until the connection closes.
    ///
    /// Returns `Ok(())` when the peer closed the connection between messages or the handler
    /// closed it after a file reply, and the reason otherwise.
    pub fn run(mut self) -> Result<(), ConnectionError> {
        let mut state = HandlerState::AwaitingMessage;
        loop {
            state = match state {
                HandlerState::AwaitingMessage => match self.connection_read.receive() {
                    Ok(Some(message)) => HandlerState::Dispatching(message),
                    Ok(None) => HandlerState::Closed(Ok(())),
                    Err(e) => HandlerState::Closed(Err(e)),
                },
                HandlerState::Dispatching(message) => {
                    trace!("received {:?} from {}", message, self.remote);
                    self.dispatch(message)
                }
                HandlerState::Closed(result) => return result,
            };
        }
    }

    fn dispatch(&mut self, message: Message) -> HandlerState {
        match message {
            Message::PeerList(peer_list) => {
                self.on_peer_list(peer_list);
                HandlerState::AwaitingMessage
            }
            Message::FileRequest(file_request) => self.on_file_request(file_request),
        }
    }

    fn on_peer_list(&self, PeerList { peers }: PeerList) {
        // Knowing ourselves would only make us gossip to ourselves.
        let peers: Vec<PeerAddress> = peers.into_iter().filter(|p| *p != self.local).collect();
        match self.node.registry().merge(peers) {
            Ok(true) => match self.node.rebroadcast() {
                Ok(0) => {}
                Ok(failures) => warn!("rebroadcast could not reach {} peer(s)", failures),
                Err(e) => error!("Failed to rebroadcast peers: {:?}", e),
            },
            Ok(false) => debug!("peer list from {} had nothing new", self.remote),
            Err(e) => error!("Peer registry is gone: {:?}", e),
        }
    }

    fn on_file_request(&mut self, FileRequest { filename }: FileRequest) -> HandlerState {
        let contents = match self.node.shared_dir().read(&filename) {
            Ok(contents) => Some(contents),
            Err(TransferError::NotFound(path)) => {
                warn!("File {} not found", path.display());
                None
            }
            Err(e) => {
                warn!("Not serving {:?} to {}: {}", filename, self.remote, e);
                None
            }
        };

        match self.node.config().reply_mode {
            ReplyMode::SameConnection => {
                if let Some(contents) = contents {
                    info!(
                        "Sending file {} ({} bytes) to {}",
                        filename,
                        contents.len(),
                        self.remote
                    );
                    if let Err(e) = self.connection_write.send_bytes(&contents) {
                        return HandlerState::Closed(Err(e.into()));
                    }
                }
                // Closing is what tells the requester the file is complete.
                HandlerState::Closed(Ok(()))
            }
            ReplyMode::DialBack => {
                if let Some(contents) = contents {
                    info!(
                        "Sending file {} ({} bytes) to {} on a new connection",
                        filename,
                        contents.len(),
                        self.remote
                    );
                    if let Err(e) =
                        send_bytes(&self.remote, &contents, self.node.config().connect_timeout)
                    {
                        warn!("{}: {}", e, e.source);
                    }
                }
                HandlerState::AwaitingMessage
            }
        }
    }
}
