//! Options host over stdio - main entry point.
//!
//! Speaks the envelope frame protocol on stdin/stdout: serves `i18n.cache`
//! from a dictionary file, remembers `tab.set` for `tab.get`, and announces
//! `options.init` once at startup. Logs go to stderr.

use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use options_bridge::channel::Channel;
use options_bridge::host::OptionsHost;
use options_bridge::i18n::Dictionary;
use options_bridge::transport::stream::{spawn_reader, spawn_writer};
use options_bridge::transport::PeerEndpoint;
use options_bridge::types::PeerName;
use options_bridge::Config;

#[derive(Debug, Parser)]
#[command(name = "options-host", about = "Serve an options page over stdio frames")]
struct Args {
    /// JSON dictionary served for `i18n.cache`.
    #[arg(long, env = "OPTIONS_DICTIONARY")]
    dictionary: PathBuf,

    /// Optional JSON configuration file.
    #[arg(long, env = "OPTIONS_CONFIG")]
    config: Option<PathBuf>,

    /// Tab announced with `options.init`.
    #[arg(long)]
    init_target: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    // Initialize observability
    options_bridge::observability::init_tracing(&config.observability);

    let raw = std::fs::read_to_string(&args.dictionary)?;
    let dictionary = Dictionary::from_payload(&serde_json::from_str::<serde_json::Value>(&raw)?)?;
    let entries = dictionary.len();

    let (transport, writer) = spawn_writer(tokio::io::stdout(), &config.transport);
    let (inbox_tx, inbox_rx) = tokio::sync::mpsc::unbounded_channel();
    let reader = spawn_reader(tokio::io::stdin(), inbox_tx, &config.transport);

    let peer_name = PeerName::from_string(config.channel.peer_name.clone())?;
    let channel = Channel::new(PeerEndpoint::new(peer_name, transport), config.channel.clone());
    let mut host = OptionsHost::new(channel, dictionary, inbox_rx);
    host.install();
    host.announce(args.init_target.as_deref());

    tracing::info!(
        "Options host serving {} ({} entries)",
        args.dictionary.display(),
        entries
    );

    // Stop on Ctrl-C, or once stdin is exhausted and every queued envelope is dispatched
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            on_signal.cancel();
        }
    });
    host.run(cancel).await;
    reader.abort();
    drop(host);
    if let Ok(Err(e)) = writer.await {
        tracing::warn!("stdout writer stopped: {}", e);
    }

    tracing::info!("Options host exiting");
    Ok(())
}
