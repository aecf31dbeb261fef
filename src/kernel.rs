//! The kernel facade: the single type a host embeds. Owns every registry and
//! is the only thing that mutates kernel state (§5, "Shared resources").
//!
//! Grounded on the teacher's `scheduler::Scheduler`/`SCHEDULER` static, which
//! plays the same "one thing owns the process table and registries" role —
//! but the teacher reaches for a global `RwSpinlock<Option<Scheduler>>`
//! because kernel code is entered from many interrupt/syscall contexts that
//! can't thread a reference around. This simulation has exactly one caller
//! (the host driving `tick()`), so the same ownership discipline is expressed
//! as a single plain `Kernel` struct with no lock and no global, matching the
//! single-threaded model in §5.

use std::collections::{BTreeMap, VecDeque};

use crate::clock::{Clock, LogicalTime};
use crate::error::KernelError;
use crate::mailbox::MailboxRegistry;
use crate::port::PortRegistry;
use crate::process::{Pcb, Pid, PidAllocator, ProcessState};
use crate::program::{ProgramFactory, ProgramRegistry};
use crate::value::Value;
use crate::vfs::Vfs;

/// Kernel construction options (§6). The source has exactly one: the
/// logical-time step per tick. Exposed with the small builder shape the rest
/// of the corpus's config types use, even though there is only one field.
#[derive(Debug, Clone, Copy)]
pub struct KernelConfig {
    pub tick_ms: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self { tick_ms: 50 }
    }
}

impl KernelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick_ms(mut self, tick_ms: u64) -> Self {
        self.tick_ms = tick_ms;
        self
    }
}

/// Options accepted by [`Kernel::spawn`] (§6, `spawn(factory, opts)`).
#[derive(Debug, Clone, Default)]
pub struct SpawnOpts {
    pub name: Option<String>,
    pub priority: i32,
    pub args: Vec<Value>,
}

impl SpawnOpts {
    pub fn new() -> Self {
        Self {
            name: None,
            priority: 1,
            args: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }
}

/// `{logical_time, pid, message}` (§3).
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub time: LogicalTime,
    pub pid: Pid,
    pub message: String,
}

/// Log ring capacity (§3: "capped at an implementation-defined ring size (≥ 500)").
const LOG_RING_CAPACITY: usize = 512;

/// Read-only snapshot of one process, as returned by [`Kernel::process_table`] (§6).
#[derive(Debug, Clone)]
pub struct ProcessSnapshot {
    pub pid: Pid,
    pub name: String,
    pub priority: i32,
    pub state: ProcessState,
    pub block_reason: &'static str,
    pub wake_time: Option<LogicalTime>,
    pub exit_code: Option<i32>,
    pub spawn_time_unix_ms: u128,
}

/// Read-only snapshot of one port, as returned by [`Kernel::ports_table`] (§6).
#[derive(Debug, Clone)]
pub struct PortSnapshot {
    pub port: String,
    pub owner_pid: Pid,
    pub queue_length: usize,
}

/// Read-only snapshot of one file, as returned by [`Kernel::list_files`] (§6).
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    pub path: String,
    pub size: usize,
    pub preview: String,
}

pub struct Kernel {
    pub(crate) config: KernelConfig,
    pub(crate) clock: Clock,
    pub(crate) vfs: Vfs,
    pub(crate) mailboxes: MailboxRegistry,
    pub(crate) ports: PortRegistry,
    pub(crate) processes: BTreeMap<Pid, Pcb>,
    pub(crate) pid_allocator: PidAllocator,
    pub(crate) programs: ProgramRegistry,
    pub(crate) logs: VecDeque<LogEntry>,
}

impl Kernel {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            clock: Clock::new(config.tick_ms),
            config,
            vfs: Vfs::new(),
            mailboxes: MailboxRegistry::new(),
            ports: PortRegistry::new(),
            processes: BTreeMap::new(),
            pid_allocator: PidAllocator::new(),
            programs: ProgramRegistry::new(),
            logs: VecDeque::new(),
        }
    }

    /// Replace the file namespace wholesale (used by a host restoring from
    /// the §6 persistence contract before spawning any processes).
    pub fn set_vfs(&mut self, vfs: Vfs) {
        self.vfs = vfs;
    }

    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    pub fn now(&self) -> LogicalTime {
        self.clock.now()
    }

    pub fn config(&self) -> KernelConfig {
        self.config
    }

    /// `register_program(name, factory)` (§6).
    pub fn register_program(&mut self, name: impl Into<String>, factory: ProgramFactory) {
        self.programs.register(name, factory);
    }

    /// `spawn(factory, opts)` (§6): create and schedule a process by looking
    /// its program up by name, returning the new pid. The routine is not
    /// polled here — it is left `READY` with an empty `pending_result`, and
    /// the scheduler steps it for the first time the same way it steps any
    /// other resumed process, the first time it is selected.
    ///
    /// Unlike the in-routine `spawn`/`exec` syscalls (§4.7), which report an
    /// unregistered program as a sentinel `-1` because a syscall never fails
    /// through a `Result`, this is a host-facing entry point with no such
    /// constraint, so an unknown `program_name` is a proper error.
    pub fn spawn(&mut self, program_name: &str, opts: SpawnOpts) -> Result<Pid, KernelError> {
        let pid = self.pid_allocator.allocate();
        let routine = self
            .programs
            .instantiate(program_name, pid, opts.args)
            .ok_or_else(|| KernelError::ProgramNotFound(program_name.to_string()))?;

        let name = opts.name.unwrap_or_else(|| program_name.to_string());
        let pcb = Pcb::new(pid, name, opts.priority, routine);

        self.mailboxes.ensure(pid);
        self.processes.insert(pid, pcb);
        Ok(pid)
    }

    /// One scheduling step, per §4.1.
    pub fn tick(&mut self) {
        crate::scheduler::tick(self);
    }

    /// `reap_terminated()` (§4.9): remove every terminated PCB and its
    /// mailbox and owned ports.
    pub fn reap_terminated(&mut self) {
        let terminated: Vec<Pid> = self
            .processes
            .iter()
            .filter(|(_, pcb)| pcb.state == ProcessState::Terminated)
            .map(|(pid, _)| *pid)
            .collect();

        for pid in terminated {
            self.processes.remove(&pid);
            self.mailboxes.remove(pid);
            self.ports.remove_owned_by(pid);
        }
    }

    pub(crate) fn push_log(&mut self, pid: Pid, message: impl Into<String>) {
        let entry = LogEntry {
            time: self.clock.now(),
            pid,
            message: message.into(),
        };
        log::info!(target: "kernel", "[pid {}] {}", entry.pid, entry.message);
        if self.logs.len() >= LOG_RING_CAPACITY {
            self.logs.pop_front();
        }
        self.logs.push_back(entry);
    }

    /// `process_table()` (§6).
    pub fn process_table(&self) -> Vec<ProcessSnapshot> {
        self.processes.values().map(snapshot_of).collect()
    }

    /// Like [`Kernel::process_table`], but folds in `running` — the PCB the
    /// scheduler has detached from `self.processes` for the duration of the
    /// current dispatch (§4.1 step 4). A `kernel_info(PS)` issued by the
    /// running process itself would otherwise see a table missing exactly
    /// one row: its own, since it has no entry in `self.processes` while it
    /// is mid-syscall. Used only from the syscall dispatcher, never from the
    /// host-facing snapshot API, since no PCB is ever detached between ticks.
    pub(crate) fn process_table_with_running(&self, running: &Pcb) -> Vec<ProcessSnapshot> {
        let mut rows: Vec<ProcessSnapshot> = self.processes.values().map(snapshot_of).collect();
        rows.push(snapshot_of(running));
        rows.sort_by_key(|row| row.pid);
        rows
    }

    /// `ports_table()` (§6).
    pub fn ports_table(&self) -> Vec<PortSnapshot> {
        self.ports
            .iter()
            .map(|(port, entry)| PortSnapshot {
                port: port.to_string(),
                owner_pid: entry.owner_pid,
                queue_length: entry.queue.len(),
            })
            .collect()
    }

    /// `list_files()` (§6): `preview` is the first 60-80 characters of content.
    pub fn list_files(&self) -> Vec<FileSnapshot> {
        const PREVIEW_LEN: usize = 80;
        self.vfs
            .iter()
            .map(|file| {
                let text = String::from_utf8_lossy(&file.content);
                let preview: String = text.chars().take(PREVIEW_LEN).collect();
                FileSnapshot {
                    path: file.path.clone(),
                    size: file.content.len(),
                    preview,
                }
            })
            .collect()
    }

    /// `logs(limit)` (§6), most-recent-last.
    pub fn logs(&self, limit: usize) -> Vec<LogEntry> {
        let skip = self.logs.len().saturating_sub(limit);
        self.logs.iter().skip(skip).cloned().collect()
    }
}

fn snapshot_of(pcb: &Pcb) -> ProcessSnapshot {
    ProcessSnapshot {
        pid: pcb.pid,
        name: pcb.name.clone(),
        priority: pcb.priority,
        state: pcb.state,
        block_reason: block_reason_label(&pcb.block_reason),
        wake_time: pcb.wake_time,
        exit_code: pcb.exit_code,
        spawn_time_unix_ms: pcb.spawn_time_unix_ms(),
    }
}

fn block_reason_label(reason: &crate::process::BlockReason) -> &'static str {
    use crate::process::BlockReason;
    match reason {
        BlockReason::None => "none",
        BlockReason::Sleep => "sleep",
        BlockReason::RecvMailbox { .. } => "recv_mailbox",
        BlockReason::RecvPort { .. } => "recv_port",
    }
}
