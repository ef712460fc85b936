use std::sync::Arc;

use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::detector::FailureDetector;
use super::election::{ElectionState, ElectionStep, ProbeOutcome, Role};
use super::message::{Epoch, Event, OrderedMessage, Outbound, WireMessage};
use super::order::{OrderEngine, PendingRequest};
use super::peers::Membership;
use super::sink::DeliverySink;
use crate::common::{Config, ProcessId};

/*
    One processor per process. It owns every piece of mutable protocol state
    (role, leader pointer, election guard, sequence counter, hold-back and
    pending queues) and is the only task that touches it, so events are
    handled strictly one at a time.

    The processor never waits on the network. Sends are handed to the
    dispatcher as `Outbound` commands; election probe results come back
    later as `Event::ElectionResult`.
*/

pub struct ConsensusProcessor {
    pub id: ProcessId,
    pub peers: Arc<Membership>,
    pub config: Config,
    pub election: ElectionState,
    pub detector: FailureDetector,
    pub order: OrderEngine,
    pub sink: Box<dyn DeliverySink>,
    pub msg_rx: Receiver<Event>,
    pub msg_tx: Sender<Outbound>,
}

/// Snapshot of a processor's view of the group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub id: ProcessId,
    pub role: Role,
    pub leader: Option<ProcessId>,
    pub epoch: Option<Epoch>,
    pub pending: usize,
    pub held_back: usize,
}

impl ConsensusProcessor {
    pub fn new(
        id: ProcessId,
        peers: Arc<Membership>,
        config: Config,
        sink: Box<dyn DeliverySink>,
        msg_rx: Receiver<Event>,
        msg_tx: Sender<Outbound>,
    ) -> Self {
        ConsensusProcessor {
            id,
            peers,
            election: ElectionState::new(id),
            detector: FailureDetector::new(config.election_timeout, Instant::now()),
            order: OrderEngine::new(),
            config,
            sink,
            msg_rx,
            msg_tx,
        }
    }

    pub async fn run(mut self) {
        info!(id = %self.id, members = self.peers.len(), "processor started");
        let start = Instant::now();
        let mut heartbeat = interval_at(
            start + self.config.heartbeat_interval,
            self.config.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut liveness = interval_at(
            start + self.config.liveness_check_interval,
            self.config.liveness_check_interval,
        );
        liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = self.msg_rx.recv() => match event {
                    Some(Event::Shutdown) | None => break,
                    Some(event) => self.handle_event(event).await,
                },
                _ = heartbeat.tick() => self.on_heartbeat_tick().await,
                _ = liveness.tick() => self.on_liveness_check(Instant::now()).await,
            }
        }
        info!(id = %self.id, "processor stopped");
    }

    pub async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Inbound(message) => self.handle_message(message).await,
            Event::Broadcast(payload) => self.broadcast(self.id, payload).await,
            Event::ElectionRequested => self.start_election().await,
            Event::ElectionResult { round, reachable } => {
                self.handle_election_result(round, reachable).await
            }
            Event::Status(reply) => {
                let _ = reply.send(self.status());
            }
            Event::Shutdown => {}
        }
    }

    async fn handle_message(&mut self, message: WireMessage) {
        debug!(id = %self.id, kind = message.kind(), "handling message");
        match message {
            WireMessage::Election { sender } => self.handle_election(sender).await,
            WireMessage::ElectionAck { sender } => self.handle_election_ack(sender),
            WireMessage::NewLeader { leader } => self.handle_new_leader(leader).await,
            WireMessage::Heartbeat { leader } => self.handle_heartbeat(leader).await,
            WireMessage::Broadcast { sender, message } => self.broadcast(sender, message).await,
            WireMessage::Ordered(ordered) => self.handle_ordered(ordered),
        }
    }

    // ------------------------------------
    // Election
    // ------------------------------------

    async fn start_election(&mut self) {
        let was_leader = self.election.is_leader();
        match self.election.start(self.peers.higher_than(self.id)) {
            ElectionStep::AlreadyRunning => {
                debug!(id = %self.id, "election already in progress");
            }
            ElectionStep::Probe { round, higher } => {
                if was_leader {
                    self.order.end_epoch();
                }
                info!(id = %self.id, round, probing = ?higher, "starting election");
                self.emit(Outbound::Probe {
                    round,
                    to: higher,
                    message: WireMessage::Election { sender: self.id },
                })
                .await;
            }
            ElectionStep::Won => self.become_leader().await,
        }
    }

    async fn handle_election_result(&mut self, round: u64, reachable: bool) {
        match self.election.probe_finished(round, reachable, Instant::now()) {
            ProbeOutcome::Stale => {
                debug!(id = %self.id, round, "ignoring result of a settled election")
            }
            ProbeOutcome::StepDown => {
                info!(id = %self.id, "higher process is alive, awaiting its announcement")
            }
            ProbeOutcome::Won => self.become_leader().await,
        }
    }

    async fn become_leader(&mut self) {
        let epoch = Epoch {
            leader: self.id,
            incarnation: rand::random(),
        };
        self.election.become_leader();
        self.order.start_epoch(epoch);
        info!(id = %self.id, incarnation = epoch.incarnation, "became leader");

        self.announce().await;
        self.flush_pending().await;
    }

    async fn announce(&mut self) {
        let others = self.peers.others(self.id);
        if others.is_empty() {
            return;
        }
        self.emit(Outbound::Fanout {
            to: others,
            message: WireMessage::NewLeader { leader: self.id },
        })
        .await;
    }

    async fn handle_election(&mut self, sender: ProcessId) {
        if sender >= self.id {
            debug!(id = %self.id, %sender, "ignoring election from a process that outranks us");
            return;
        }
        self.emit(Outbound::Send {
            to: sender,
            message: WireMessage::ElectionAck { sender: self.id },
        })
        .await;

        if self.election.is_leader() {
            // still alive and still in charge; keep the current epoch
            debug!(id = %self.id, %sender, "re-announcing leadership");
            self.announce().await;
        } else {
            self.start_election().await;
        }
    }

    fn handle_election_ack(&mut self, sender: ProcessId) {
        if sender > self.id && self.election.acknowledged(Instant::now()) {
            info!(id = %self.id, %sender, "election acknowledged by higher process");
        }
    }

    async fn handle_new_leader(&mut self, leader: ProcessId) {
        if leader == self.id {
            return;
        }
        if self.election.is_leader() {
            info!(id = %self.id, %leader, "another process announced leadership, stepping down");
            self.order.end_epoch();
            self.election.abandon();
        }
        if leader < self.id {
            // a live higher process never follows a lower one
            info!(id = %self.id, %leader, "lower process claimed leadership, challenging");
            self.election.forget_leader();
            self.start_election().await;
            return;
        }
        self.follow(leader).await;
    }

    async fn handle_heartbeat(&mut self, leader: ProcessId) {
        if leader == self.id {
            return;
        }
        if self.election.is_leader() {
            if leader < self.id {
                debug!(id = %self.id, %leader, "ignoring heartbeat from lower process");
                return;
            }
            info!(id = %self.id, %leader, "heartbeat from higher leader, stepping down");
            self.order.end_epoch();
        } else if leader < self.id {
            self.start_election().await;
            return;
        }
        self.follow(leader).await;
    }

    async fn follow(&mut self, leader: ProcessId) {
        self.detector.record(Instant::now());
        if self.election.adopt(leader) {
            info!(id = %self.id, %leader, "following new leader");
        }
        self.flush_pending().await;
    }

    // ------------------------------------
    // Failure detection
    // ------------------------------------

    pub async fn on_heartbeat_tick(&mut self) {
        if !self.election.is_leader() {
            return;
        }
        let others = self.peers.others(self.id);
        if others.is_empty() {
            return;
        }
        self.emit(Outbound::Fanout {
            to: others,
            message: WireMessage::Heartbeat { leader: self.id },
        })
        .await;
    }

    pub async fn on_liveness_check(&mut self, now: Instant) {
        if self.election.is_leader() {
            return;
        }
        if self
            .election
            .announcement_overdue(now, self.config.election_timeout)
        {
            warn!(id = %self.id, "no leader announced itself after our election, retrying");
            self.election.abandon();
            self.start_election().await;
            return;
        }
        if self.election.in_progress() {
            return;
        }
        if self.detector.expired(now) {
            warn!(
                id = %self.id,
                leader = ?self.election.leader,
                silence_ms = self.detector.silence(now).as_millis() as u64,
                "leader heartbeat timed out"
            );
            self.election.forget_leader();
            self.start_election().await;
        }
    }

    // ------------------------------------
    // Ordering
    // ------------------------------------

    async fn broadcast(&mut self, sender: ProcessId, payload: String) {
        if self.election.is_leader() {
            match self.order.sequence(sender, payload) {
                Some(ordered) => {
                    self.handle_ordered(ordered.clone());
                    let others = self.peers.others(self.id);
                    if !others.is_empty() {
                        self.emit(Outbound::Fanout {
                            to: others,
                            message: WireMessage::Ordered(ordered),
                        })
                        .await;
                    }
                }
                None => warn!(id = %self.id, "leader without an epoch, dropping broadcast"),
            }
        } else if let Some(leader) = self.election.leader {
            debug!(id = %self.id, %leader, %sender, "forwarding broadcast to leader");
            self.emit(Outbound::Send {
                to: leader,
                message: WireMessage::Broadcast {
                    sender,
                    message: payload,
                },
            })
            .await;
        } else {
            debug!(id = %self.id, %sender, "no leader known, queueing broadcast");
            self.order.queue_pending(PendingRequest { sender, payload });
        }
    }

    fn handle_ordered(&mut self, ordered: OrderedMessage) {
        for ready in self.order.accept(ordered) {
            debug!(id = %self.id, seq = ready.seq, sender = %ready.sender, "delivering");
            self.sink.deliver(ready.into());
        }
    }

    async fn flush_pending(&mut self) {
        if self.election.leader.is_none() {
            return;
        }
        let pending = self.order.take_pending();
        if !pending.is_empty() {
            info!(id = %self.id, count = pending.len(), "replaying queued broadcasts");
        }
        for request in pending {
            self.broadcast(request.sender, request.payload).await;
        }
    }

    pub fn status(&self) -> Status {
        Status {
            id: self.id,
            role: self.election.role,
            leader: self.election.leader,
            epoch: self.order.leading().or(self.order.latest_epoch()),
            pending: self.order.pending_len(),
            held_back: self.order.held_back(),
        }
    }

    async fn emit(&mut self, outbound: Outbound) {
        if self.msg_tx.send(outbound).await.is_err() {
            warn!(id = %self.id, "dispatcher is gone, dropping outbound message");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio::sync::oneshot;
    use tracing_test::traced_test;

    use super::*;
    use crate::consensus::sink::Delivery;

    fn p(id: u32) -> ProcessId {
        ProcessId::new(id)
    }

    struct Harness {
        incoming_tx: Sender<Event>,
        outgoing_rx: Receiver<Outbound>,
        deliveries: UnboundedReceiver<Delivery>,
    }

    impl Harness {
        async fn send(&self, event: Event) {
            self.incoming_tx.send(event).await.unwrap();
        }

        async fn inbound(&self, message: WireMessage) {
            self.send(Event::Inbound(message)).await;
        }

        /// Next outbound command, skipping periodic heartbeats.
        async fn next(&mut self) -> Outbound {
            loop {
                let out = tokio::time::timeout(Duration::from_secs(1), self.outgoing_rx.recv())
                    .await
                    .expect("no outbound message")
                    .expect("processor stopped");
                let heartbeat = matches!(
                    out,
                    Outbound::Fanout {
                        message: WireMessage::Heartbeat { .. },
                        ..
                    }
                );
                if !heartbeat {
                    return out;
                }
            }
        }

        async fn status(&self) -> Status {
            let (tx, rx) = oneshot::channel();
            self.send(Event::Status(tx)).await;
            rx.await.unwrap()
        }
    }

    fn processor(id: u32, members: u32) -> (ConsensusProcessor, Harness) {
        let (incoming_tx, incoming_rx) = mpsc::channel(100);
        let (outgoing_tx, outgoing_rx) = mpsc::channel(100);
        let (delivery_tx, deliveries) = mpsc::unbounded_channel();
        let processor = ConsensusProcessor::new(
            p(id),
            Arc::new(Membership::localhost(members, 9000)),
            Config::default(),
            Box::new(delivery_tx),
            incoming_rx,
            outgoing_tx,
        );
        let harness = Harness {
            incoming_tx,
            outgoing_rx,
            deliveries,
        };
        (processor, harness)
    }

    fn spawn(id: u32, members: u32) -> Harness {
        let (processor, harness) = processor(id, members);
        tokio::spawn(processor.run());
        harness
    }

    /// A running p3-of-3 that has already won its election.
    async fn leader() -> Harness {
        let mut harness = spawn(3, 3);
        harness.send(Event::ElectionRequested).await;
        harness.next().await;
        harness
    }

    #[tokio::test]
    async fn test_highest_process_wins_and_announces() {
        let mut harness = spawn(3, 3);
        harness.send(Event::ElectionRequested).await;

        assert_eq!(
            harness.next().await,
            Outbound::Fanout {
                to: vec![p(1), p(2)],
                message: WireMessage::NewLeader { leader: p(3) },
            }
        );
        let status = harness.status().await;
        assert_eq!(status.role, Role::Leader);
        assert_eq!(status.leader, Some(p(3)));
        assert_eq!(status.epoch.map(|e| e.leader), Some(p(3)));
    }

    #[tokio::test]
    async fn test_candidate_steps_down_when_higher_reachable() {
        let mut harness = spawn(1, 3);
        harness.send(Event::ElectionRequested).await;
        assert_eq!(
            harness.next().await,
            Outbound::Probe {
                round: 1,
                to: vec![p(2), p(3)],
                message: WireMessage::Election { sender: p(1) },
            }
        );
        assert_eq!(harness.status().await.role, Role::Candidate);

        harness.send(Event::ElectionResult { round: 1, reachable: true }).await;
        let status = harness.status().await;
        assert_eq!(status.role, Role::Follower);
        assert_eq!(status.leader, None);

        harness.inbound(WireMessage::NewLeader { leader: p(3) }).await;
        assert_eq!(harness.status().await.leader, Some(p(3)));
    }

    #[tokio::test]
    async fn test_candidate_wins_when_no_higher_reachable() {
        let mut harness = spawn(1, 3);
        harness.send(Event::ElectionRequested).await;
        harness.next().await;
        harness.send(Event::ElectionResult { round: 1, reachable: false }).await;

        assert_eq!(
            harness.next().await,
            Outbound::Fanout {
                to: vec![p(2), p(3)],
                message: WireMessage::NewLeader { leader: p(1) },
            }
        );
        assert_eq!(harness.status().await.role, Role::Leader);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_election_guard_suppresses_second_election() {
        let (mut processor, mut harness) = processor(1, 3);
        processor.handle_event(Event::ElectionRequested).await;
        processor.handle_event(Event::ElectionRequested).await;

        assert!(matches!(harness.outgoing_rx.try_recv(), Ok(Outbound::Probe { .. })));
        assert!(harness.outgoing_rx.try_recv().is_err());
        assert!(logs_contain("election already in progress"));
    }

    #[tokio::test]
    async fn test_election_from_lower_is_acked_and_triggers_own_election() {
        let mut harness = spawn(2, 3);
        harness.inbound(WireMessage::Election { sender: p(1) }).await;

        assert_eq!(
            harness.next().await,
            Outbound::Send {
                to: p(1),
                message: WireMessage::ElectionAck { sender: p(2) },
            }
        );
        assert_eq!(
            harness.next().await,
            Outbound::Probe {
                round: 1,
                to: vec![p(3)],
                message: WireMessage::Election { sender: p(2) },
            }
        );
    }

    #[tokio::test]
    async fn test_late_result_from_earlier_election_is_ignored() {
        let mut harness = spawn(2, 3);
        harness.send(Event::ElectionRequested).await;
        assert!(matches!(harness.next().await, Outbound::Probe { round: 1, .. }));

        // p3 settles the first election, then p1 makes us start another
        harness.inbound(WireMessage::NewLeader { leader: p(3) }).await;
        harness.inbound(WireMessage::Election { sender: p(1) }).await;
        assert!(matches!(harness.next().await, Outbound::Send { to, .. } if to == p(1)));
        assert!(matches!(harness.next().await, Outbound::Probe { round: 2, .. }));

        harness.send(Event::ElectionResult { round: 1, reachable: false }).await;
        let status = harness.status().await;
        assert_eq!(status.role, Role::Candidate);
        assert!(harness.outgoing_rx.try_recv().is_err());

        harness.send(Event::ElectionResult { round: 2, reachable: true }).await;
        assert_eq!(harness.status().await.role, Role::Follower);
    }

    #[tokio::test]
    async fn test_leader_reannounces_instead_of_new_epoch() {
        let mut harness = leader().await;
        let epoch = harness.status().await.epoch;

        harness.inbound(WireMessage::Election { sender: p(1) }).await;
        assert!(matches!(harness.next().await, Outbound::Send { to, .. } if to == p(1)));
        assert_eq!(
            harness.next().await,
            Outbound::Fanout {
                to: vec![p(1), p(2)],
                message: WireMessage::NewLeader { leader: p(3) },
            }
        );
        let status = harness.status().await;
        assert_eq!(status.role, Role::Leader);
        assert_eq!(status.epoch, epoch);
    }

    #[tokio::test]
    async fn test_leader_demotes_on_higher_announcement() {
        let (processor, mut harness) = processor(2, 3);
        tokio::spawn(processor.run());
        harness.send(Event::ElectionRequested).await;
        harness.next().await;
        harness.send(Event::ElectionResult { round: 1, reachable: false }).await;
        harness.next().await;
        assert_eq!(harness.status().await.role, Role::Leader);

        harness.inbound(WireMessage::NewLeader { leader: p(3) }).await;
        let status = harness.status().await;
        assert_eq!(status.role, Role::Follower);
        assert_eq!(status.leader, Some(p(3)));
    }

    #[tokio::test]
    async fn test_lower_announcement_is_challenged() {
        let mut harness = spawn(2, 3);
        harness.inbound(WireMessage::NewLeader { leader: p(1) }).await;
        assert!(matches!(harness.next().await, Outbound::Probe { to, .. } if to == vec![p(3)]));
        assert_eq!(harness.status().await.leader, None);
    }

    #[tokio::test]
    async fn test_heartbeat_sets_unknown_leader() {
        let harness = spawn(1, 3);
        harness.inbound(WireMessage::Heartbeat { leader: p(3) }).await;
        let status = harness.status().await;
        assert_eq!(status.leader, Some(p(3)));
        assert_eq!(status.role, Role::Follower);
    }

    #[tokio::test]
    async fn test_leader_sequences_and_delivers_to_itself_first() {
        let mut harness = leader().await;
        harness.send(Event::Broadcast("hello".into())).await;

        let delivered = harness.deliveries.recv().await.unwrap();
        assert_eq!((delivered.seq, delivered.sender, delivered.payload.as_str()), (1, p(3), "hello"));

        match harness.next().await {
            Outbound::Fanout {
                to,
                message: WireMessage::Ordered(ordered),
            } => {
                assert_eq!(to, vec![p(1), p(2)]);
                assert_eq!(ordered.seq, 1);
                assert_eq!(ordered.epoch, delivered.epoch);
            }
            other => panic!("unexpected outbound {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_leader_sequences_forwarded_requests_with_original_sender() {
        let mut harness = leader().await;
        harness
            .inbound(WireMessage::Broadcast { sender: p(1), message: "a".into() })
            .await;
        harness
            .inbound(WireMessage::Broadcast { sender: p(2), message: "b".into() })
            .await;

        let first = harness.deliveries.recv().await.unwrap();
        let second = harness.deliveries.recv().await.unwrap();
        assert_eq!((first.seq, first.sender), (1, p(1)));
        assert_eq!((second.seq, second.sender), (2, p(2)));
    }

    #[tokio::test]
    async fn test_follower_forwards_to_known_leader() {
        let mut harness = spawn(1, 3);
        harness.inbound(WireMessage::NewLeader { leader: p(3) }).await;
        harness.send(Event::Broadcast("hi".into())).await;
        assert_eq!(
            harness.next().await,
            Outbound::Send {
                to: p(3),
                message: WireMessage::Broadcast { sender: p(1), message: "hi".into() },
            }
        );
    }

    #[tokio::test]
    async fn test_pending_broadcasts_replay_once_leader_known() {
        let mut harness = spawn(1, 3);
        harness.send(Event::Broadcast("one".into())).await;
        harness.send(Event::Broadcast("two".into())).await;
        assert_eq!(harness.status().await.pending, 2);

        harness.inbound(WireMessage::NewLeader { leader: p(3) }).await;
        for text in ["one", "two"] {
            assert_eq!(
                harness.next().await,
                Outbound::Send {
                    to: p(3),
                    message: WireMessage::Broadcast { sender: p(1), message: text.into() },
                }
            );
        }
        assert_eq!(harness.status().await.pending, 0);

        // the same leader announcing again replays nothing
        harness.inbound(WireMessage::NewLeader { leader: p(3) }).await;
        harness.status().await;
        assert!(harness.outgoing_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_pending_broadcasts_sequenced_locally_on_winning() {
        let mut harness = spawn(1, 2);
        harness.send(Event::Broadcast("queued".into())).await;
        harness.send(Event::ElectionRequested).await;
        harness.next().await;
        harness.send(Event::ElectionResult { round: 1, reachable: false }).await;

        let delivered = harness.deliveries.recv().await.unwrap();
        assert_eq!((delivered.seq, delivered.payload.as_str()), (1, "queued"));
    }

    #[tokio::test]
    async fn test_follower_delivers_in_sequence_order() {
        let mut harness = spawn(1, 3);
        let epoch = Epoch { leader: p(3), incarnation: 42 };
        for seq in [2, 3, 1, 2] {
            harness
                .inbound(WireMessage::Ordered(OrderedMessage {
                    seq,
                    sender: p(2),
                    message: format!("m{seq}"),
                    epoch,
                }))
                .await;
        }
        let status = harness.status().await;
        assert_eq!(status.held_back, 0);

        let mut delivered = Vec::new();
        while let Ok(delivery) = harness.deliveries.try_recv() {
            delivered.push(delivery.seq);
        }
        assert_eq!(delivered, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_leader_triggers_election() {
        let mut harness = spawn(2, 3);
        harness.inbound(WireMessage::NewLeader { leader: p(3) }).await;
        assert_eq!(harness.status().await.leader, Some(p(3)));

        tokio::time::sleep(Config::default().election_timeout + Duration::from_secs(2)).await;
        assert_eq!(
            harness.next().await,
            Outbound::Probe {
                round: 1,
                to: vec![p(3)],
                message: WireMessage::Election { sender: p(2) },
            }
        );
        assert_eq!(harness.status().await.leader, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeats_keep_follower_quiet() {
        let mut harness = spawn(2, 3);
        harness.inbound(WireMessage::NewLeader { leader: p(3) }).await;
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            harness.inbound(WireMessage::Heartbeat { leader: p(3) }).await;
        }
        assert_eq!(harness.status().await.leader, Some(p(3)));
        assert!(harness.outgoing_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overdue_announcement_restarts_election() {
        let mut harness = spawn(1, 3);
        harness.send(Event::ElectionRequested).await;
        harness.next().await;
        harness.send(Event::ElectionResult { round: 1, reachable: true }).await;

        tokio::time::sleep(Config::default().election_timeout + Duration::from_secs(2)).await;
        assert!(matches!(harness.next().await, Outbound::Probe { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_leader_emits_heartbeats() {
        let mut harness = leader().await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let out = tokio::time::timeout(Duration::from_secs(1), harness.outgoing_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            out,
            Outbound::Fanout {
                to: vec![p(1), p(2)],
                message: WireMessage::Heartbeat { leader: p(3) },
            }
        );
    }
}
