//! Direct mailbox IPC: per-pid ordered queues of messages addressed by pid
//! rather than by port (§4.4).
//!
//! Grounded on the teacher's `resource::mailbox::Mailbox`, which aggregates
//! events from attached handles behind a bounded `VecDeque`; this rendition
//! drops the attach/mask machinery (the source's mailbox has no subscription
//! step — any pid may be sent to at any time) but keeps the FIFO queue-per-
//! recipient shape and the "create lazily on first send" behaviour.

use std::collections::{HashMap, VecDeque};

use serde_json::json;

use crate::clock::LogicalTime;
use crate::process::Pid;
use crate::value::Value;

/// A single buffered message in a recipient's mailbox.
#[derive(Debug, Clone)]
pub struct MailboxMessage {
    pub from: Pid,
    pub payload: Value,
    pub enqueue_time: LogicalTime,
}

impl MailboxMessage {
    /// The shape delivered to a routine's `pending_result` on `recv`.
    pub fn to_value(&self) -> Value {
        json!({
            "from": self.from.0,
            "payload": self.payload,
            "enqueue_time": self.enqueue_time,
        })
    }
}

/// Per-pid ordered message queues.
#[derive(Default)]
pub struct MailboxRegistry {
    boxes: HashMap<Pid, VecDeque<MailboxMessage>>,
}

impl MailboxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a (possibly empty) mailbox exists for `pid`. Called when a
    /// process is spawned, matching the source's "register an empty mailbox"
    /// step (§4.7), and lazily by `send` to an arbitrary/unknown pid (§4.4).
    pub fn ensure(&mut self, pid: Pid) {
        self.boxes.entry(pid).or_default();
    }

    /// `send`: append to the recipient's mailbox, creating it if absent.
    /// Never fails, even for a pid with no live process (§4.4).
    pub fn push(&mut self, to: Pid, message: MailboxMessage) {
        self.boxes.entry(to).or_default().push_back(message);
    }

    /// Dequeue the oldest message for `pid`, optionally filtered by sender.
    /// A filtered scan dequeues the first *matching* message, which is not
    /// necessarily the head of the queue.
    pub fn take_matching(&mut self, pid: Pid, from: Option<Pid>) -> Option<MailboxMessage> {
        let queue = self.boxes.get_mut(&pid)?;
        match from {
            None => queue.pop_front(),
            Some(sender) => {
                let index = queue.iter().position(|m| m.from == sender)?;
                queue.remove(index)
            }
        }
    }

    /// Remove a pid's mailbox entirely (reap, §4.9).
    pub fn remove(&mut self, pid: Pid) {
        self.boxes.remove(&pid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn msg(from: u64, payload: &str) -> MailboxMessage {
        MailboxMessage {
            from: Pid(from),
            payload: Value::String(payload.to_string()),
            enqueue_time: 0,
        }
    }

    #[test]
    fn send_to_unknown_pid_buffers_without_panicking() {
        let mut reg = MailboxRegistry::new();
        reg.push(Pid(99), msg(1, "lost"));
        assert_eq!(
            reg.take_matching(Pid(99), None).unwrap().payload,
            Value::String("lost".into())
        );
    }

    #[test]
    fn unfiltered_recv_preserves_fifo_order() {
        let mut reg = MailboxRegistry::new();
        reg.push(Pid(1), msg(2, "first"));
        reg.push(Pid(1), msg(2, "second"));
        assert_eq!(
            reg.take_matching(Pid(1), None).unwrap().payload,
            Value::String("first".into())
        );
        assert_eq!(
            reg.take_matching(Pid(1), None).unwrap().payload,
            Value::String("second".into())
        );
    }

    #[test]
    fn filtered_recv_skips_non_matching_head() {
        let mut reg = MailboxRegistry::new();
        reg.push(Pid(1), msg(2, "from two"));
        reg.push(Pid(1), msg(3, "from three"));

        // A recv(from=3) must dequeue the matching message even though it is
        // not at the head of the queue, leaving pid 2's message behind.
        let taken = reg.take_matching(Pid(1), Some(Pid(3))).unwrap();
        assert_eq!(taken.payload, Value::String("from three".into()));
        assert_eq!(
            reg.take_matching(Pid(1), None).unwrap().payload,
            Value::String("from two".into())
        );
    }

    #[test]
    fn filtered_recv_with_no_match_leaves_queue_untouched() {
        let mut reg = MailboxRegistry::new();
        reg.push(Pid(1), msg(2, "from two"));
        assert!(reg.take_matching(Pid(1), Some(Pid(5))).is_none());
        assert_eq!(
            reg.take_matching(Pid(1), Some(Pid(2))).unwrap().payload,
            Value::String("from two".into())
        );
    }

    #[test]
    fn remove_drops_the_whole_mailbox() {
        let mut reg = MailboxRegistry::new();
        reg.push(Pid(1), msg(2, "x"));
        reg.remove(Pid(1));
        assert!(reg.take_matching(Pid(1), None).is_none());
    }
}
