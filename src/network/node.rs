use std::sync::Arc;

use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::Transport;
use crate::common::{Config, Error, ProcessId, Result};
use crate::consensus::{ConsensusProcessor, DeliverySink, Event, Membership, Outbound, Status};

/// One member of the group, ready to be started.
pub struct Node {
    pub id: ProcessId,
    pub peers: Arc<Membership>,
    pub config: Config,
}

/// Handle to a running node.
#[derive(Clone, Debug)]
pub struct NodeHandle {
    events: Sender<Event>,
}

impl Node {
    pub fn new(id: ProcessId, peers: Arc<Membership>, config: Config) -> Self {
        Node { id, peers, config }
    }

    /// Start the processor and its dispatcher, and kick off the first election.
    pub fn spawn(self, transport: Arc<dyn Transport>, sink: Box<dyn DeliverySink>) -> NodeHandle {
        let (event_tx, event_rx) = mpsc::channel(self.config.channel_capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.channel_capacity);

        let processor = ConsensusProcessor::new(
            self.id,
            self.peers,
            self.config,
            sink,
            event_rx,
            outbound_tx,
        );
        tokio::spawn(processor.run());
        tokio::spawn(dispatch(outbound_rx, transport, event_tx.clone()));

        if event_tx.try_send(Event::ElectionRequested).is_err() {
            warn!(id = %self.id, "could not request the initial election");
        }
        NodeHandle { events: event_tx }
    }
}

impl NodeHandle {
    /// Sender for inbound events, handed to a listener.
    pub fn events(&self) -> Sender<Event> {
        self.events.clone()
    }

    pub async fn broadcast(&self, payload: impl Into<String>) -> Result<()> {
        self.events
            .send(Event::Broadcast(payload.into()))
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    pub async fn status(&self) -> Result<Status> {
        let (tx, rx) = oneshot::channel();
        self.events
            .send(Event::Status(tx))
            .await
            .map_err(|_| Error::ChannelClosed)?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// Stop the processor. Its state is gone, as with a crash.
    pub async fn shutdown(&self) {
        let _ = self.events.send(Event::Shutdown).await;
    }
}

/// Execute the processor's outbound commands. Every send runs in its own
/// task so an unreachable peer only ever delays itself.
pub async fn dispatch(
    mut outbound: Receiver<Outbound>,
    transport: Arc<dyn Transport>,
    events: Sender<Event>,
) {
    while let Some(command) = outbound.recv().await {
        match command {
            Outbound::Send { to, message } => {
                let transport = transport.clone();
                tokio::spawn(async move {
                    transport.send(to, &message).await;
                });
            }
            Outbound::Fanout { to, message } => {
                for peer in to {
                    let transport = transport.clone();
                    let message = message.clone();
                    tokio::spawn(async move {
                        transport.send(peer, &message).await;
                    });
                }
            }
            Outbound::Probe { round, to, message } => {
                let transport = transport.clone();
                let events = events.clone();
                tokio::spawn(async move {
                    let mut probes = JoinSet::new();
                    for peer in to {
                        let transport = transport.clone();
                        let message = message.clone();
                        probes.spawn(async move { transport.send(peer, &message).await });
                    }
                    let mut reachable = false;
                    while let Some(result) = probes.join_next().await {
                        reachable |= matches!(result, Ok(true));
                    }
                    debug!(round, reachable, "election probe finished");
                    let _ = events.send(Event::ElectionResult { round, reachable }).await;
                });
            }
        }
    }
}
