//! The dynamic payload type carried by messages, syscall results, and the
//! per-process heap.
//!
//! The source passes loosely-typed records between userland and the kernel
//! (syscall arguments, mailbox/port payloads, heap values). `serde_json::Value`
//! is the natural Rust stand-in: it is already structurally what the source's
//! values look like, and it gives the persistence layer (§6) serialization for
//! free.

/// A syscall result, message payload, or heap value.
pub type Value = serde_json::Value;

/// The sentinel returned by syscalls that fail with "not found", "permission
/// denied", or similar (§7). Distinguished from a real `false` message payload
/// only by convention at each call site, exactly as in the source.
pub fn sentinel_false() -> Value {
    Value::Bool(false)
}

/// The sentinel returned by syscalls that succeed without a meaningful value.
pub fn sentinel_true() -> Value {
    Value::Bool(true)
}

/// The "no value"/"timed out"/"nothing to read" sentinel.
pub fn sentinel_null() -> Value {
    Value::Null
}

/// Helper for constructing an integer-valued result (pids, fds, byte counts).
pub fn int(n: i64) -> Value {
    Value::Number(n.into())
}
