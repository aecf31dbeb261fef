//! Process control blocks and the process-identifier allocator.
//!
//! `ProcessId` is a monotonic counter newtype, same idea as `process::ProcessId`
//! elsewhere in this family of kernels. `ProcessState` generalizes a plain
//! three-state `{Runnable, Running, Blocked}` model to four states, adding
//! `Terminated`: a terminated PCB stays in the table, exposing its exit code,
//! until an explicit reap removes it, rather than being dropped from the
//! scheduler the moment it finishes.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::clock::LogicalTime;
use crate::port::PortId;
use crate::program::Routine;
use crate::value::Value;

/// Unique process identifier. Monotonically increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u64);

impl std::fmt::Display for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocates [`Pid`]s in strictly increasing order, starting at 1.
#[derive(Debug, Default)]
pub struct PidAllocator {
    next: u64,
}

impl PidAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn allocate(&mut self) -> Pid {
        let pid = Pid(self.next);
        self.next += 1;
        pid
    }
}

/// Execution state of a process control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    Blocked,
    Terminated,
}

/// Why a `Blocked` PCB is waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    None,
    Sleep,
    RecvMailbox { from: Option<Pid> },
    RecvPort { port: PortId },
}

/// `r`, `w`, or `a` — see §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    Append,
}

impl OpenMode {
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "r" => Some(Self::Read),
            "w" => Some(Self::Write),
            "a" => Some(Self::Append),
            _ => None,
        }
    }
}

/// An open file descriptor: `{path, position, mode}` (§3).
#[derive(Debug, Clone)]
pub struct OpenFile {
    pub path: String,
    pub position: usize,
    pub mode: OpenMode,
}

/// The process control block (§3).
pub struct Pcb {
    pub pid: Pid,
    pub name: String,
    pub priority: i32,
    pub state: ProcessState,
    pub block_reason: BlockReason,
    pub routine: Routine,
    pub pending_result: Value,
    pub wake_time: Option<LogicalTime>,
    pub wait_timeout_at: Option<LogicalTime>,
    pub exit_code: Option<i32>,
    pub fd_table: HashMap<i32, OpenFile>,
    pub next_fd: i32,
    pub heap: HashMap<String, Value>,
    pub owned_ports: Vec<PortId>,
    pub spawn_time: SystemTime,
}

impl Pcb {
    pub fn new(pid: Pid, name: String, priority: i32, routine: Routine) -> Self {
        Self {
            pid,
            name,
            priority,
            state: ProcessState::Ready,
            block_reason: BlockReason::None,
            routine,
            pending_result: Value::Null,
            wake_time: None,
            wait_timeout_at: None,
            exit_code: None,
            fd_table: HashMap::new(),
            next_fd: 3,
            heap: HashMap::new(),
            owned_ports: Vec::new(),
            spawn_time: SystemTime::now(),
        }
    }

    /// Allocate the next descriptor number (starts at 3; 0/1/2 are standard streams).
    pub fn allocate_fd(&mut self) -> i32 {
        let fd = self.next_fd;
        self.next_fd += 1;
        fd
    }

    pub fn spawn_time_unix_ms(&self) -> u128 {
        self.spawn_time
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
    }

    pub fn clear_wait_fields(&mut self) {
        self.block_reason = BlockReason::None;
        self.wake_time = None;
        self.wait_timeout_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pid_allocator_starts_at_one_and_is_strictly_increasing() {
        let mut allocator = PidAllocator::new();
        let pids: Vec<Pid> = (0..5).map(|_| allocator.allocate()).collect();
        assert_eq!(pids[0], Pid(1));
        for window in pids.windows(2) {
            assert!(window[1].0 > window[0].0);
        }
    }

    #[test]
    fn pid_allocator_never_reuses_a_pid() {
        let mut allocator = PidAllocator::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(allocator.allocate()));
        }
    }

    #[test]
    fn open_mode_parses_the_three_known_letters_and_rejects_others() {
        assert_eq!(OpenMode::parse("r"), Some(OpenMode::Read));
        assert_eq!(OpenMode::parse("w"), Some(OpenMode::Write));
        assert_eq!(OpenMode::parse("a"), Some(OpenMode::Append));
        assert_eq!(OpenMode::parse("rw"), None);
        assert_eq!(OpenMode::parse(""), None);
    }
}
