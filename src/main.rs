use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gossip_share::{file_hash, Client, Config, Node, PeerAddress, ReplyMode};

/// A tiny peer-to-peer node: gossips the addresses of known peers and serves files to them.
///
/// Peers are only ever found by gossip starting from seeds given on the command line, there is
/// no tracker or DHT. Run `serve` on every machine and point `fetch` at any of them.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
enum Cli {
    /// Run a node until killed
    Serve {
        /// Host to listen on, also the host this node announces itself as
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on (0 picks a free port)
        #[arg(long, default_value = "5000")]
        port: u16,

        /// Peer known in advance, as host:port (repeatable)
        #[arg(long = "seed")]
        seeds: Vec<PeerAddress>,

        /// Directory requested files are served from
        #[arg(long, default_value = ".")]
        shared_dir: PathBuf,

        /// How file contents are sent back to the requester
        #[arg(long, value_enum, default_value_t = ReplyMode::SameConnection)]
        reply: ReplyMode,

        /// Timeout for every outbound connection, in milliseconds
        #[arg(long, default_value = "5000")]
        connect_timeout_ms: u64,
    },
    /// Download a file from a peer
    Fetch {
        /// Peer to ask, as host:port
        #[arg(long)]
        peer: PeerAddress,

        /// Name of the file on the peer
        #[arg(long)]
        file: String,

        /// Directory to save the file in
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Push a list of peers to a node
    Announce {
        /// Node to tell, as host:port
        #[arg(long)]
        peer: PeerAddress,

        /// Peer to include in the list, as host:port (repeatable)
        #[arg(long = "peers")]
        peers: Vec<PeerAddress>,
    },
    /// Print the MD5 of a file
    Hash {
        /// File to hash
        path: PathBuf,
    },
}

fn main() -> Result<(), eyre::Report> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    color_eyre::install()?;

    let cli = Cli::parse();
    match cli {
        Cli::Serve {
            host,
            port,
            seeds,
            shared_dir,
            reply,
            connect_timeout_ms,
        } => {
            let config = Config {
                listen: PeerAddress::new(host, port),
                seeds,
                shared_dir,
                reply_mode: reply,
                connect_timeout: Duration::from_millis(connect_timeout_ms),
                ..Config::default()
            };
            let node = Node::new(config)?;
            let listener = node.bind()?;
            if !node.registry().is_empty()? {
                let failures = node.announce(listener.address())?;
                if failures > 0 {
                    warn!("{} seed(s) could not be reached", failures);
                }
            }
            listener.run();
        }
        Cli::Fetch {
            peer,
            file,
            output_dir,
        } => {
            info!("Requesting {} from {}", file, peer);
            let saved = Client::new(peer).request_file(&file, &output_dir)?;
            info!("File {} downloaded successfully", saved.display());
        }
        Cli::Announce { peer, peers } => {
            info!("Sending {} peer(s) to {}", peers.len(), peer);
            Client::new(peer).send_peer_list(peers)?;
        }
        Cli::Hash { path } => {
            println!("{}  {}", file_hash(&path)?, path.display());
        }
    }

    Ok(())
}
