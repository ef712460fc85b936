use std::time::Duration;

use tokio::time::Instant;

use crate::common::ProcessId;

/*
    Bully election.

    A candidate probes every process with a higher id. If none of them can be
    reached it wins outright; if any of them answers it steps back to
    follower and waits for the higher process to announce itself. Only the
    highest live id can ever find an empty set of reachable superiors, which
    is what breaks ties between concurrent elections.

    The guard (`in_progress`) makes start idempotent: it is raised by start and
    lowered only once a leader is known, either ourselves or an announced one.

    Every start opens a new round. Probe results are tagged with the round
    they were sent for, and a result from any other round is ignored.
*/

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Role {
    Follower,
    Candidate,
    Leader,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ElectionStep {
    /// Guard is up; nothing to do
    AlreadyRunning,
    /// Probe these higher-ranked processes
    Probe { round: u64, higher: Vec<ProcessId> },
    /// Nobody outranks us
    Won,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProbeOutcome {
    /// The election this result belonged to is settled or superseded
    Stale,
    /// A higher process is alive; wait for its announcement
    StepDown,
    Won,
}

#[derive(Debug)]
pub struct ElectionState {
    pub id: ProcessId,
    pub role: Role,
    pub leader: Option<ProcessId>,
    in_progress: bool,
    round: u64,
    awaiting_since: Option<Instant>,
}

impl ElectionState {
    pub fn new(id: ProcessId) -> Self {
        ElectionState {
            id,
            role: Role::Follower,
            leader: None,
            in_progress: false,
            round: 0,
            awaiting_since: None,
        }
    }

    pub fn is_leader(&self) -> bool {
        self.role == Role::Leader
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn start(&mut self, higher: Vec<ProcessId>) -> ElectionStep {
        if self.in_progress {
            return ElectionStep::AlreadyRunning;
        }
        self.in_progress = true;
        self.round += 1;
        self.role = Role::Candidate;
        self.leader = None;
        self.awaiting_since = None;
        if higher.is_empty() {
            ElectionStep::Won
        } else {
            ElectionStep::Probe {
                round: self.round,
                higher,
            }
        }
    }

    /// A higher process acknowledged our election message directly.
    pub fn acknowledged(&mut self, now: Instant) -> bool {
        if !self.in_progress || self.role != Role::Candidate {
            return false;
        }
        self.role = Role::Follower;
        self.awaiting_since = Some(now);
        true
    }

    pub fn probe_finished(&mut self, round: u64, reachable: bool, now: Instant) -> ProbeOutcome {
        if !self.in_progress || round != self.round {
            return ProbeOutcome::Stale;
        }
        // an election_ack may already have moved us to awaiting
        if reachable || self.awaiting_since.is_some() {
            self.role = Role::Follower;
            if self.awaiting_since.is_none() {
                self.awaiting_since = Some(now);
            }
            ProbeOutcome::StepDown
        } else {
            ProbeOutcome::Won
        }
    }

    pub fn become_leader(&mut self) {
        self.role = Role::Leader;
        self.leader = Some(self.id);
        self.in_progress = false;
        self.awaiting_since = None;
    }

    /// Follow `leader`. Returns true when this changed who we follow.
    pub fn adopt(&mut self, leader: ProcessId) -> bool {
        let changed = self.leader != Some(leader);
        self.role = Role::Follower;
        self.leader = Some(leader);
        self.in_progress = false;
        self.awaiting_since = None;
        changed
    }

    pub fn forget_leader(&mut self) {
        self.leader = None;
    }

    /// We stepped down for a higher process that never announced itself.
    pub fn announcement_overdue(&self, now: Instant, timeout: Duration) -> bool {
        match self.awaiting_since {
            Some(since) => self.in_progress && now.saturating_duration_since(since) > timeout,
            None => false,
        }
    }

    /// Drop a stuck election so the next start can proceed.
    pub fn abandon(&mut self) {
        self.in_progress = false;
        self.awaiting_since = None;
        self.role = Role::Follower;
    }
}
