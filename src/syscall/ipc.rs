//! Direct mailbox IPC: `send` and `recv`.

use crate::kernel::Kernel;
use crate::mailbox::MailboxMessage;
use crate::process::{BlockReason, Pcb, Pid, ProcessState};
use crate::value::{self, Value};

/// Appends to the target's mailbox, then attempts immediate delivery if the
/// target is blocked waiting for exactly this sender (or any sender).
pub fn send(kernel: &mut Kernel, pcb: &mut Pcb, to: Pid, message: Value) {
    let now = kernel.now();
    kernel.mailboxes.push(
        to,
        MailboxMessage {
            from: pcb.pid,
            payload: message,
            enqueue_time: now,
        },
    );

    let waiting_from = match kernel.processes.get(&to) {
        Some(target) if target.state == ProcessState::Blocked => match &target.block_reason {
            BlockReason::RecvMailbox { from } if from.is_none() || *from == Some(pcb.pid) => {
                Some(*from)
            }
            _ => None,
        },
        _ => None,
    };

    if let Some(from_filter) = waiting_from {
        if let Some(msg) = kernel.mailboxes.take_matching(to, from_filter) {
            let target = kernel
                .processes
                .get_mut(&to)
                .expect("target pid vanished between check and delivery");
            target.pending_result = msg.to_value();
            target.state = ProcessState::Ready;
            target.clear_wait_fields();
        }
    }

    pcb.pending_result = value::sentinel_true();
    pcb.state = ProcessState::Ready;
}

/// Dequeue the oldest (optionally sender-filtered) message for the caller,
/// blocking if none is available yet.
pub fn recv(kernel: &mut Kernel, pcb: &mut Pcb, from: Option<Pid>) {
    match kernel.mailboxes.take_matching(pcb.pid, from) {
        Some(msg) => {
            pcb.pending_result = msg.to_value();
            pcb.state = ProcessState::Ready;
        }
        None => {
            pcb.block_reason = BlockReason::RecvMailbox { from };
            pcb.state = ProcessState::Blocked;
        }
    }
}
