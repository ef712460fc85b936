use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::Transport;
use crate::common::{ProcessId, Result};
use crate::consensus::{Event, Membership, WireMessage};

/// Longest accepted frame, newline included.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Sends each message over a fresh connection as one JSON line.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    peers: Arc<Membership>,
    send_timeout: Duration,
}

impl TcpTransport {
    pub fn new(peers: Arc<Membership>, send_timeout: Duration) -> Self {
        TcpTransport {
            peers,
            send_timeout,
        }
    }

    async fn write_frame(addr: SocketAddr, frame: &[u8]) -> io::Result<()> {
        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(frame).await?;
        stream.shutdown().await
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, to: ProcessId, message: &WireMessage) -> bool {
        let Some(addr) = self.peers.address(&to) else {
            warn!(%to, "no address for peer");
            return false;
        };
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(%to, "failed to encode {}: {}", message.kind(), e);
                return false;
            }
        };
        match timeout(self.send_timeout, Self::write_frame(addr, &frame)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!(%to, %addr, "{} not delivered: {}", message.kind(), e);
                false
            }
            Err(_) => {
                debug!(%to, %addr, "{} timed out after {:?}", message.kind(), self.send_timeout);
                false
            }
        }
    }
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accept connections forever, turning every decoded line into an inbound event.
pub fn serve(listener: TcpListener, events: Sender<Event>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let events = events.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, addr, events).await;
                    });
                }
                Err(e) => {
                    error!("failed to accept connection: {}", e);
                }
            }
            if events.is_closed() {
                info!("processor gone, listener shutting down");
                break;
            }
        }
    })
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, events: Sender<Event>) {
    let mut reader = BufReader::new(stream);
    let mut frame = Vec::new();
    loop {
        frame.clear();
        let read = (&mut reader)
            .take(MAX_FRAME_LEN as u64)
            .read_until(b'\n', &mut frame)
            .await;
        match read {
            Ok(0) => return,
            Ok(_) => {}
            Err(e) => {
                debug!(%addr, "connection read failed: {}", e);
                return;
            }
        }
        if frame.len() == MAX_FRAME_LEN && frame.last() != Some(&b'\n') {
            // no way to find the next frame boundary, so give up on the peer
            warn!(%addr, "dropping oversized frame and closing connection");
            return;
        }
        if frame.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match WireMessage::decode(&frame) {
            Ok(message) => {
                if events.send(Event::Inbound(message)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!(%addr, "dropping malformed frame: {}", e);
            }
        }
    }
}
