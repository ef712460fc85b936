use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ordered_broadcast::common::{Config, Error, Result};
use ordered_broadcast::consensus::{Membership, StdoutSink};
use ordered_broadcast::network::{tcp, Node, TcpTransport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[derive(Clone, Debug, Parser)]
#[command(version, about = "Totally ordered broadcast with leader election", long_about = None)]
struct Args {
    /// This process's id, e.g. p3 or 3
    id: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::from_env()?;
    let peers = Arc::new(Membership::from_env()?);
    let id = peers.resolve(&args.id)?;
    let addr = peers
        .address(&id)
        .ok_or_else(|| Error::Config(format!("no address for {id}")))?;

    let listener = tcp::bind(addr).await?;
    let transport = Arc::new(TcpTransport::new(peers.clone(), config.send_timeout));
    let handle = Node::new(id, peers, config).spawn(transport, Box::new(StdoutSink));
    tcp::serve(listener, handle.events());
    info!(%id, "ready; each line on stdin is broadcast to the group");

    let input = async {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if line.is_empty() {
                continue;
            }
            handle.broadcast(line).await?;
        }
        info!("stdin closed, still serving until interrupted");
        std::future::pending::<Result<()>>().await
    };

    tokio::select! {
        result = input => {
            if let Err(e) = &result {
                error!("input loop stopped: {}", e);
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            handle.shutdown().await;
            Ok(())
        }
    }
}
