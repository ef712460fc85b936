use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;
use tracing::debug;

use super::Transport;
use crate::common::ProcessId;
use crate::consensus::{Event, WireMessage};

#[derive(Default)]
struct Registry {
    inboxes: HashMap<ProcessId, Sender<Event>>,
    down: HashSet<ProcessId>,
}

/// In-process stand-in for the network, with switches to crash processes.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    registry: Arc<RwLock<Registry>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        MemoryNetwork::default()
    }

    pub fn register(&self, id: ProcessId, inbox: Sender<Event>) {
        let mut registry = self.registry.write().unwrap_or_else(|e| e.into_inner());
        registry.inboxes.insert(id, inbox);
        registry.down.remove(&id);
    }

    /// A down process neither sends nor receives.
    pub fn set_down(&self, id: ProcessId, down: bool) {
        let mut registry = self.registry.write().unwrap_or_else(|e| e.into_inner());
        if down {
            registry.down.insert(id);
        } else {
            registry.down.remove(&id);
        }
    }

    pub fn transport(&self, from: ProcessId) -> Arc<MemoryTransport> {
        Arc::new(MemoryTransport {
            from,
            network: self.clone(),
        })
    }

    fn route(&self, from: ProcessId, to: ProcessId) -> Option<Sender<Event>> {
        let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
        if registry.down.contains(&from) || registry.down.contains(&to) {
            return None;
        }
        registry.inboxes.get(&to).cloned()
    }
}

pub struct MemoryTransport {
    from: ProcessId,
    network: MemoryNetwork,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, to: ProcessId, message: &WireMessage) -> bool {
        let Some(inbox) = self.network.route(self.from, to) else {
            debug!(from = %self.from, %to, "{} dropped, link down", message.kind());
            return false;
        };
        inbox.send(Event::Inbound(message.clone())).await.is_ok()
    }
}
