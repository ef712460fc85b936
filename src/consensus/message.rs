use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::processor::Status;
use crate::common::ProcessId;

/*
    Every frame on the wire is one JSON object whose "type" field selects the
    variant. election / election_ack / new_leader / heartbeat belong to the
    election and liveness protocol; broadcast / ordered carry application
    payloads. "broadcast" is a request for the leader to sequence a payload,
    "ordered" is the leader's sequenced copy that every process delivers.

    Sequence numbers restart at 1 with every leadership tenure, so ordered
    messages carry the epoch they were numbered in.
*/

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    Election { sender: ProcessId },
    ElectionAck { sender: ProcessId },
    NewLeader { leader: ProcessId },
    Heartbeat { leader: ProcessId },
    Broadcast { sender: ProcessId, message: String },
    Ordered(OrderedMessage),
}

/// A leadership tenure: who sequences, and which incarnation of their leadership.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Epoch {
    pub leader: ProcessId,
    pub incarnation: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedMessage {
    pub seq: u64,
    pub sender: ProcessId,
    pub message: String,
    pub epoch: Epoch,
}

impl WireMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Election { .. } => "election",
            WireMessage::ElectionAck { .. } => "election_ack",
            WireMessage::NewLeader { .. } => "new_leader",
            WireMessage::Heartbeat { .. } => "heartbeat",
            WireMessage::Broadcast { .. } => "broadcast",
            WireMessage::Ordered(_) => "ordered",
        }
    }

    /// One newline-terminated JSON frame.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut frame = serde_json::to_vec(self)?;
        frame.push(b'\n');
        Ok(frame)
    }

    pub fn decode(frame: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(frame)
    }
}

/// Everything the processor reacts to arrives as one of these.
#[derive(Debug)]
pub enum Event {
    /// A frame received from a peer
    Inbound(WireMessage),
    /// A payload submitted by the local application
    Broadcast(String),
    /// Ask the processor to run an election; ignored while one is in progress
    ElectionRequested,
    /// Outcome of probing every higher-ranked peer in election `round`
    ElectionResult { round: u64, reachable: bool },
    Status(oneshot::Sender<Status>),
    Shutdown,
}

/// Network work requested by the processor, executed by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    Send { to: ProcessId, message: WireMessage },
    Fanout { to: Vec<ProcessId>, message: WireMessage },
    /// Send to every target; report `ElectionResult { round, reachable }`
    /// where reachable means at least one send succeeded
    Probe {
        round: u64,
        to: Vec<ProcessId>,
        message: WireMessage,
    },
}
