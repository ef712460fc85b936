use std::io::Write;

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use super::message::{Epoch, OrderedMessage};
use crate::common::ProcessId;

/// A message handed to the application, in total order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub epoch: Epoch,
    pub seq: u64,
    pub sender: ProcessId,
    pub payload: String,
}

impl From<OrderedMessage> for Delivery {
    fn from(ordered: OrderedMessage) -> Self {
        Delivery {
            epoch: ordered.epoch,
            seq: ordered.seq,
            sender: ordered.sender,
            payload: ordered.message,
        }
    }
}

/// Consumer of delivered messages. Called once per delivery, in order.
pub trait DeliverySink: Send {
    fn deliver(&mut self, delivery: Delivery);
}

impl DeliverySink for UnboundedSender<Delivery> {
    fn deliver(&mut self, delivery: Delivery) {
        if self.send(delivery).is_err() {
            warn!("delivery receiver dropped");
        }
    }
}

/// Prints `[p3#1] p1: hello` (epoch leader, sequence, sender, payload).
#[derive(Debug, Default)]
pub struct StdoutSink;

impl DeliverySink for StdoutSink {
    fn deliver(&mut self, delivery: Delivery) {
        let mut out = std::io::stdout().lock();
        let line = writeln!(
            out,
            "[{}#{}] {}: {}",
            delivery.epoch.leader, delivery.seq, delivery.sender, delivery.payload
        );
        if let Err(e) = line.and_then(|_| out.flush()) {
            warn!("failed to write delivery to stdout: {}", e);
        }
    }
}
