pub mod memory;
pub mod node;
pub mod tcp;

use async_trait::async_trait;

use crate::common::ProcessId;
use crate::consensus::WireMessage;

pub use memory::{MemoryNetwork, MemoryTransport};
pub use node::{Node, NodeHandle};
pub use tcp::TcpTransport;

/*
    Links are unreliable and point-to-point. A send either reaches the peer
    within the transport's timeout or it does not; there is no retry and no
    acknowledgement beyond that. Callers read a failed send as "that peer is
    down right now", which is exactly what the election needs.
*/

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Deliver one message to `to`. Returns false if the peer could not be
    /// reached in time. Never retries.
    async fn send(&self, to: ProcessId, message: &WireMessage) -> bool;
}
