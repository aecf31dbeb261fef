//! Host-facing error boundary.
//!
//! Syscalls never fail this way — per §7 they always resolve to a sentinel
//! [`crate::value::Value`] and a state transition, never a `Result`. This
//! enum exists only for the handful of genuinely fallible operations a host
//! performs *outside* the syscall path: loading a persisted namespace, or
//! looking up a program that was never registered at the top level.
//!
//! The pack's `nvm` crate is the enrichment source for this: the teacher
//! kernel is `no_std` and represents its internal errors (`vfs::FsError`,
//! `resource::channel::ChannelError`) as plain enums without a derive macro,
//! because `thiserror` needs `alloc`'s `Error` trait support that a bare
//! `no_std` kernel doesn't carry. A host-facing std crate has no such
//! constraint, so it reaches for the same `thiserror` the rest of the pack's
//! std-side Rust uses.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("program '{0}' is not registered")]
    ProgramNotFound(String),

    #[error("failed to read persisted namespace: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode persisted namespace: {0}")]
    Decode(#[from] serde_json::Error),
}
