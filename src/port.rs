//! Port registry: named rendezvous queues with a single owner (§4.5).
//!
//! Grounded on the teacher's `resource::channel::ChannelShared` (a
//! shared, queued, bidirectional endpoint pair) but simplified to the
//! source's single-owner, single-queue shape: a port has exactly one owner
//! and one inbound queue, not two independent halves.

use std::collections::{HashMap, VecDeque};

use serde_json::json;

use crate::clock::LogicalTime;
use crate::process::Pid;
use crate::value::Value;

/// A normalized port key. The source accepts numeric or string port names and
/// requires them to be canonicalized consistently everywhere; this
/// implementation canonicalizes to the decimal-string form at construction so
/// `PortId::new(9999)` and `PortId::new("9999")` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(String);

impl PortId {
    pub fn new(raw: impl std::fmt::Display) -> Self {
        Self(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single buffered message on a port queue.
#[derive(Debug, Clone)]
pub struct PortMessage {
    pub from_pid: Pid,
    pub payload: Value,
    pub enqueue_time: LogicalTime,
}

impl PortMessage {
    /// The shape delivered to a routine's `pending_result` on `recv_from_port`.
    pub fn to_value(&self) -> Value {
        json!({
            "from_pid": self.from_pid.0,
            "payload": self.payload,
            "enqueue_time": self.enqueue_time,
        })
    }
}

/// `{port_id, owner_pid, queue}` (§3).
pub struct PortEntry {
    pub owner_pid: Pid,
    pub queue: VecDeque<PortMessage>,
}

/// The port registry. Canonical-key -> entry.
#[derive(Default)]
pub struct PortRegistry {
    ports: HashMap<PortId, PortEntry>,
}

impl PortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, port: &PortId) -> Option<&PortEntry> {
        self.ports.get(port)
    }

    pub fn get_mut(&mut self, port: &PortId) -> Option<&mut PortEntry> {
        self.ports.get_mut(port)
    }

    /// `listen`: succeeds (and is idempotent) if the port has no owner, or is
    /// already owned by `owner`. Fails if owned by someone else.
    pub fn listen(&mut self, port: PortId, owner: Pid) -> bool {
        match self.ports.get(&port) {
            Some(entry) if entry.owner_pid == owner => true,
            Some(_) => false,
            None => {
                self.ports.insert(
                    port,
                    PortEntry {
                        owner_pid: owner,
                        queue: VecDeque::new(),
                    },
                );
                true
            }
        }
    }

    /// `unlisten`: succeeds only if `owner` currently owns the port.
    pub fn unlisten(&mut self, port: &PortId, owner: Pid) -> bool {
        match self.ports.get(port) {
            Some(entry) if entry.owner_pid == owner => {
                self.ports.remove(port);
                true
            }
            _ => false,
        }
    }

    /// Remove every port owned by `pid` (owner termination / reap, §3 invariant).
    pub fn remove_owned_by(&mut self, pid: Pid) {
        self.ports.retain(|_, entry| entry.owner_pid != pid);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PortId, &PortEntry)> {
        self.ports.iter()
    }
}
