use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use btsniff::sniffer::{Config, Sniffer};
use btsniff::store::SqliteStore;

#[derive(Debug, Parser)]
#[command(
    name = "btsniff",
    about = "A sniffer that fishes torrent metadata out of the BitTorrent DHT"
)]
struct Args {
    /// Listen on the given address
    #[arg(short, long, default_value = "0.0.0.0")]
    addr: IpAddr,

    /// Listen on the given UDP port (also advertised as our peer port)
    #[arg(short, long, default_value_t = 6882)]
    port: u16,

    /// Max friends to make per second (outbound DHT query rate)
    #[arg(short, long, default_value_t = 5000)]
    friends: usize,

    /// Max peers to download metadata from concurrently
    #[arg(short = 'e', long, default_value_t = 5000)]
    peers: usize,

    /// Max seconds allowed for downloading one torrent's metadata
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,

    /// Directory to archive .torrent files into (default: ~/torrents)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Skip archiving .torrent files entirely
    #[arg(long)]
    no_archive: bool,

    /// SQLite database file
    #[arg(long, default_value = "btsniff.db")]
    database: PathBuf,

    /// Ignore infohashes seen only in get_peers queries
    #[arg(long)]
    no_peek: bool,

    /// Run in verbose mode
    #[arg(short, long)]
    verbose: bool,
}

fn default_archive_dir() -> anyhow::Result<PathBuf> {
    let dirs = directories::UserDirs::new().context("could not resolve home directory")?;
    Ok(dirs.home_dir().join("torrents"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose {
        "btsniff=info"
    } else {
        "btsniff=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let archive_dir = if args.no_archive {
        None
    } else {
        let dir = match args.dir {
            Some(dir) => dir,
            None => default_archive_dir()?,
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("could not create archive directory {}", dir.display()))?;
        Some(dir)
    };

    let store = SqliteStore::open(&args.database)
        .with_context(|| format!("could not open database {}", args.database.display()))?;

    let config = Config {
        addr: args.addr,
        port: args.port,
        max_friends: args.friends,
        max_peers: args.peers,
        fetch_timeout: Duration::from_secs(args.timeout),
        archive_dir,
        peek_get_peers: !args.no_peek,
        ..Config::default()
    };

    let sniffer = Sniffer::new(config, Arc::new(store));

    tracing::info!("running, it may take a few minutes...");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
        result = sniffer.run() => {
            result.context("dht node failed")
        }
    }
}
