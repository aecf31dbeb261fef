//! Introspection: `kernel_info`, `list_ports`, and the per-process heap.

use serde_json::json;

use crate::kernel::Kernel;
use crate::process::{Pcb, ProcessState};
use crate::program::KInfoKind;
use crate::value::Value;

pub fn kernel_info(kernel: &Kernel, pcb: &mut Pcb, kind: KInfoKind) {
    pcb.pending_result = match kind {
        // The caller itself is detached from `kernel.processes` for the
        // duration of this dispatch (§4.1 step 4), so its own row has to be
        // folded back in by hand or a process's `ps` would never list itself.
        KInfoKind::Ps => process_table_value(kernel, pcb),
        KInfoKind::Ports => ports_table_value(kernel),
        KInfoKind::Vfs => vfs_table_value(kernel),
    };
    pcb.state = ProcessState::Ready;
}

pub fn list_ports(kernel: &Kernel, pcb: &mut Pcb) {
    pcb.pending_result = ports_table_value(kernel);
    pcb.state = ProcessState::Ready;
}

pub fn heap_set(pcb: &mut Pcb, key: String, payload: Value) {
    pcb.heap.insert(key, payload);
    pcb.pending_result = crate::value::sentinel_true();
    pcb.state = ProcessState::Ready;
}

pub fn heap_get(pcb: &mut Pcb, key: String) {
    pcb.pending_result = pcb.heap.get(&key).cloned().unwrap_or(Value::Null);
    pcb.state = ProcessState::Ready;
}

fn process_table_value(kernel: &Kernel, running: &Pcb) -> Value {
    let rows: Vec<Value> = kernel
        .process_table_with_running(running)
        .into_iter()
        .map(|row| {
            json!({
                "pid": row.pid.0,
                "name": row.name,
                "priority": row.priority,
                "state": state_label(row.state),
                "block_reason": row.block_reason,
                "wake_time": row.wake_time,
                "exit_code": row.exit_code,
            })
        })
        .collect();
    Value::Array(rows)
}

fn ports_table_value(kernel: &Kernel) -> Value {
    let rows: Vec<Value> = kernel
        .ports_table()
        .into_iter()
        .map(|row| {
            json!({
                "port": row.port,
                "owner_pid": row.owner_pid.0,
                "queue_length": row.queue_length,
            })
        })
        .collect();
    Value::Array(rows)
}

fn vfs_table_value(kernel: &Kernel) -> Value {
    let rows: Vec<Value> = kernel
        .list_files()
        .into_iter()
        .map(|row| {
            json!({
                "path": row.path,
                "size": row.size,
                "preview": row.preview,
            })
        })
        .collect();
    Value::Array(rows)
}

fn state_label(state: crate::process::ProcessState) -> &'static str {
    use crate::process::ProcessState::*;
    match state {
        Ready => "ready",
        Running => "running",
        Blocked => "blocked",
        Terminated => "terminated",
    }
}
