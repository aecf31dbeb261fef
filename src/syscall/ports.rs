//! Port-based IPC: `listen`, `unlisten`, `send_to_port`, `recv_from_port`.

use crate::kernel::Kernel;
use crate::port::{PortId, PortMessage};
use crate::process::{BlockReason, Pcb, ProcessState};
use crate::value::{self, Value};

pub fn listen(kernel: &mut Kernel, pcb: &mut Pcb, port: PortId) {
    let ok = kernel.ports.listen(port.clone(), pcb.pid);
    if ok && !pcb.owned_ports.contains(&port) {
        pcb.owned_ports.push(port);
    }
    pcb.pending_result = bool_value(ok);
    pcb.state = ProcessState::Ready;
}

pub fn unlisten(kernel: &mut Kernel, pcb: &mut Pcb, port: PortId) {
    let ok = kernel.ports.unlisten(&port, pcb.pid);
    if ok {
        pcb.owned_ports.retain(|owned| owned != &port);
    }
    pcb.pending_result = bool_value(ok);
    pcb.state = ProcessState::Ready;
}

pub fn send_to_port(kernel: &mut Kernel, pcb: &mut Pcb, port: PortId, payload: Value) {
    let now = kernel.now();
    let owner = match kernel.ports.get(&port) {
        Some(entry) => entry.owner_pid,
        None => {
            pcb.pending_result = value::sentinel_false();
            pcb.state = ProcessState::Ready;
            return;
        }
    };

    kernel
        .ports
        .get_mut(&port)
        .expect("port existence just confirmed")
        .queue
        .push_back(PortMessage {
            from_pid: pcb.pid,
            payload,
            enqueue_time: now,
        });

    let owner_waiting = match kernel.processes.get(&owner) {
        Some(target) if target.state == ProcessState::Blocked => {
            matches!(&target.block_reason, BlockReason::RecvPort { port: waiting } if *waiting == port)
        }
        _ => false,
    };

    if owner_waiting {
        if let Some(msg) = kernel.ports.get_mut(&port).and_then(|e| e.queue.pop_front()) {
            let target = kernel
                .processes
                .get_mut(&owner)
                .expect("owner pid vanished between check and delivery");
            target.pending_result = msg.to_value();
            target.state = ProcessState::Ready;
            target.clear_wait_fields();
        }
    }

    pcb.pending_result = value::sentinel_true();
    pcb.state = ProcessState::Ready;
}

pub fn recv_from_port(kernel: &mut Kernel, pcb: &mut Pcb, port: PortId, timeout_ms: Option<u64>) {
    let owner_pid = match kernel.ports.get(&port) {
        Some(entry) => entry.owner_pid,
        None => {
            pcb.pending_result = value::sentinel_false();
            pcb.state = ProcessState::Ready;
            return;
        }
    };
    if owner_pid != pcb.pid {
        pcb.pending_result = value::sentinel_false();
        pcb.state = ProcessState::Ready;
        return;
    }

    let message = kernel.ports.get_mut(&port).and_then(|e| e.queue.pop_front());
    match message {
        Some(msg) => {
            pcb.pending_result = msg.to_value();
            pcb.state = ProcessState::Ready;
        }
        None => {
            pcb.wait_timeout_at = timeout_ms.map(|ms| kernel.now() + ms);
            pcb.block_reason = BlockReason::RecvPort { port };
            pcb.state = ProcessState::Blocked;
        }
    }
}

fn bool_value(ok: bool) -> Value {
    if ok {
        value::sentinel_true()
    } else {
        value::sentinel_false()
    }
}
