use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use tracing::debug;

use super::message::{Epoch, OrderedMessage};
use crate::common::ProcessId;

/// A broadcast that arrived while no leader was known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    pub sender: ProcessId,
    pub payload: String,
}

#[derive(Debug)]
struct Sequencer {
    epoch: Epoch,
    next_seq: u64,
}

/*
    Delivery state for one epoch. Delivery is gapless, so the set of
    delivered sequence numbers is exactly 1..next_expected and the watermark
    alone stands in for it. Anything at or above the watermark that cannot
    be delivered yet waits in the hold-back map, already sorted.
*/
#[derive(Debug)]
struct EpochStream {
    next_expected: u64,
    holdback: BTreeMap<u64, OrderedMessage>,
}

impl EpochStream {
    fn new() -> Self {
        EpochStream {
            next_expected: 1,
            holdback: BTreeMap::new(),
        }
    }

    fn drain_ready(&mut self) -> Vec<OrderedMessage> {
        let mut ready = Vec::new();
        while let Some(entry) = self.holdback.first_entry() {
            if *entry.key() != self.next_expected {
                break;
            }
            ready.push(entry.remove());
            self.next_expected += 1;
        }
        ready
    }
}

/*
    Only the newest epoch keeps a stream. When ordered messages from a new
    epoch show up, every older stream is dropped along with whatever it was
    holding back, and the old epoch is remembered as retired so that a late
    message from it can never be delivered a second time from a fresh stream.
*/
#[derive(Debug, Default)]
pub struct OrderEngine {
    sequencer: Option<Sequencer>,
    streams: HashMap<Epoch, EpochStream>,
    retired: HashSet<Epoch>,
    latest: Option<Epoch>,
    pending: VecDeque<PendingRequest>,
}

impl OrderEngine {
    pub fn new() -> Self {
        OrderEngine::default()
    }

    /// Begin sequencing as leader of `epoch`, numbering from 1.
    pub fn start_epoch(&mut self, epoch: Epoch) {
        self.sequencer = Some(Sequencer { epoch, next_seq: 1 });
        self.latest = Some(epoch);
    }

    /// Stop sequencing. Returns the epoch that ended, if we were leading one.
    pub fn end_epoch(&mut self) -> Option<Epoch> {
        self.sequencer.take().map(|s| s.epoch)
    }

    pub fn leading(&self) -> Option<Epoch> {
        self.sequencer.as_ref().map(|s| s.epoch)
    }

    /// Most recent epoch we led or received ordered messages from.
    pub fn latest_epoch(&self) -> Option<Epoch> {
        self.latest
    }

    /// Assign the next sequence number. `None` unless we are leading an epoch.
    pub fn sequence(&mut self, sender: ProcessId, payload: String) -> Option<OrderedMessage> {
        let sequencer = self.sequencer.as_mut()?;
        let seq = sequencer.next_seq;
        sequencer.next_seq += 1;
        Some(OrderedMessage {
            seq,
            sender,
            message: payload,
            epoch: sequencer.epoch,
        })
    }

    /// Take in an ordered message; returns everything now deliverable, in order.
    pub fn accept(&mut self, ordered: OrderedMessage) -> Vec<OrderedMessage> {
        let epoch = ordered.epoch;
        if self.retired.contains(&epoch) {
            debug!(seq = ordered.seq, leader = %epoch.leader, "dropping message from a retired epoch");
            return Vec::new();
        }
        if !self.streams.contains_key(&epoch) {
            debug!(leader = %epoch.leader, incarnation = epoch.incarnation, "new ordering epoch");
            self.retire_all();
            self.latest = Some(epoch);
        }
        let stream = self.streams.entry(epoch).or_insert_with(EpochStream::new);

        if ordered.seq < stream.next_expected || stream.holdback.contains_key(&ordered.seq) {
            debug!(seq = ordered.seq, leader = %epoch.leader, "dropping duplicate ordered message");
            return Vec::new();
        }
        let seq = ordered.seq;
        stream.holdback.insert(seq, ordered);

        let ready = stream.drain_ready();
        if ready.is_empty() {
            debug!(
                seq,
                waiting_for = stream.next_expected,
                held = stream.holdback.len(),
                "holding back ordered message behind a gap"
            );
        }
        ready
    }

    fn retire_all(&mut self) {
        for (old, stream) in self.streams.drain() {
            if !stream.holdback.is_empty() {
                debug!(
                    leader = %old.leader,
                    discarded = stream.holdback.len(),
                    "retiring epoch with messages stuck behind a gap"
                );
            }
            self.retired.insert(old);
        }
    }

    /// Messages received in the current epoch but stuck behind a gap.
    pub fn held_back(&self) -> usize {
        self.streams.values().map(|s| s.holdback.len()).sum()
    }

    pub fn queue_pending(&mut self, request: PendingRequest) {
        self.pending.push_back(request);
    }

    /// Everything queued, oldest first. The queue is left empty.
    pub fn take_pending(&mut self) -> Vec<PendingRequest> {
        self.pending.drain(..).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
