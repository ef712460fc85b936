use std::collections::BTreeMap;
use std::net::SocketAddr;

use crate::common::{Error, ProcessId, Result};

pub const BASE_PORT: u16 = 5000;
pub const DEFAULT_PROCESSES: u32 = 5;

/// Static directory of every process and its address.
///
/// Loaded once at startup and shared read-only, so it needs no locking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub members: BTreeMap<ProcessId, SocketAddr>,
}

impl Membership {
    pub fn new(members: BTreeMap<ProcessId, SocketAddr>) -> Self {
        Membership { members }
    }

    /// `p1..pN` on consecutive localhost ports starting at `base_port`.
    pub fn localhost(count: u32, base_port: u16) -> Self {
        let members = (1..=count)
            .map(|i| {
                let port = base_port + (i - 1) as u16;
                (ProcessId::new(i), SocketAddr::from(([127, 0, 0, 1], port)))
            })
            .collect();
        Membership { members }
    }

    /// Parses `"1=127.0.0.1:6000,p2=127.0.0.1:6001"`.
    pub fn parse(list: &str) -> Result<Self> {
        let mut members = BTreeMap::new();
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (id, addr) = entry
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("member entry {entry:?} is not id=addr")))?;
            let id: ProcessId = id
                .parse()
                .map_err(|e| Error::Config(format!("member id {id:?}: {e}")))?;
            let addr: SocketAddr = addr
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("member address {addr:?}: {e}")))?;
            if members.insert(id, addr).is_some() {
                return Err(Error::Config(format!("duplicate member {id}")));
            }
        }
        if members.is_empty() {
            return Err(Error::Config("membership is empty".into()));
        }
        Ok(Membership { members })
    }

    pub fn from_env() -> Result<Self> {
        match std::env::var(crate::common::config::MEMBERS_ENV) {
            Ok(list) => Self::parse(&list),
            Err(_) => Ok(Self::localhost(DEFAULT_PROCESSES, BASE_PORT)),
        }
    }

    /// Maps a user-supplied id onto a member, applying `ProcessId` normalization.
    pub fn resolve(&self, given: &str) -> Result<ProcessId> {
        given
            .parse::<ProcessId>()
            .ok()
            .filter(|id| self.is_member(id))
            .ok_or_else(|| Error::UnknownProcess {
                given: given.to_string(),
                valid: self.valid_ids(),
            })
    }

    pub fn is_member(&self, id: &ProcessId) -> bool {
        self.members.contains_key(id)
    }

    pub fn address(&self, id: &ProcessId) -> Option<SocketAddr> {
        self.members.get(id).copied()
    }

    /// Every member except `me`.
    pub fn others(&self, me: ProcessId) -> Vec<ProcessId> {
        self.members.keys().copied().filter(|id| *id != me).collect()
    }

    /// Members that outrank `me`; the election only ever talks to these.
    pub fn higher_than(&self, me: ProcessId) -> Vec<ProcessId> {
        self.members.keys().copied().filter(|id| *id > me).collect()
    }

    pub fn valid_ids(&self) -> String {
        self.members
            .keys()
            .map(ProcessId::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
