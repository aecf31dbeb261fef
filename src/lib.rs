//! An in-process, single-node simulation of a tiny cooperative kernel:
//! a process table, a priority scheduler, a syscall dispatcher, mailbox and
//! port IPC, and an in-memory file namespace.
//!
//! The host embeds a single [`kernel::Kernel`], registers program factories
//! through [`kernel::Kernel::register_program`], spawns processes with
//! [`kernel::Kernel::spawn`], and drives progress by calling
//! [`kernel::Kernel::tick`] at whatever cadence it likes. Everything a host
//! needs to build a UI around the kernel — process table, port table, file
//! listing, log tail — is exposed as read-only snapshots on `Kernel`.

pub mod clock;
pub mod error;
pub mod kernel;
pub mod mailbox;
pub mod persistence;
pub mod port;
pub mod process;
pub mod program;
pub mod programs;
mod scheduler;
mod syscall;
pub mod value;
pub mod vfs;

pub use error::KernelError;
pub use kernel::{
    FileSnapshot, Kernel, KernelConfig, LogEntry, PortSnapshot, ProcessSnapshot, SpawnOpts,
};
pub use process::Pid;
pub use program::{KInfoKind, Syscalls};
pub use value::Value;
