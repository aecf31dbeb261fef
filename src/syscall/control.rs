//! Process control: `exec`, in-routine `spawn`, and `kill`.

use crate::kernel::Kernel;
use crate::process::{Pcb, Pid, ProcessState};
use crate::value::{self, Value};

/// Replaces the caller's routine in place with a fresh instance of
/// `program`, keeping the same pid, fd table, mailbox, heap, and owned
/// ports — only the routine itself is swapped.
pub fn exec(kernel: &Kernel, pcb: &mut Pcb, program: String, args: Vec<Value>) {
    match kernel.programs.instantiate(&program, pcb.pid, args) {
        Some(routine) => {
            pcb.routine = routine;
            pcb.pending_result = value::int(0);
        }
        None => {
            pcb.pending_result = value::int(-1);
        }
    }
    pcb.state = ProcessState::Ready;
}

/// `spawn` as called from within a routine: resolves the program by name and
/// schedules a new process, returning its pid (or `-1` if unregistered).
pub fn spawn(
    kernel: &mut Kernel,
    pcb: &mut Pcb,
    program: String,
    name: Option<String>,
    priority: i32,
    args: Vec<Value>,
) {
    let new_pid = kernel.pid_allocator.allocate();
    let routine = match kernel.programs.instantiate(&program, new_pid, args) {
        Some(routine) => routine,
        None => {
            pcb.pending_result = value::int(-1);
            pcb.state = ProcessState::Ready;
            return;
        }
    };

    let child_name = name.unwrap_or_else(|| program.clone());
    let child = Pcb::new(new_pid, child_name, priority, routine);
    kernel.mailboxes.ensure(new_pid);
    kernel.processes.insert(new_pid, child);

    pcb.pending_result = value::int(new_pid.0 as i64);
    pcb.state = ProcessState::Ready;
}

/// Force `target` to `TERMINATED` with `exit_code = -1`, clearing its wait
/// state. Always reports success to the caller, even if `target` is not a
/// live pid.
pub fn kill(kernel: &mut Kernel, pcb: &mut Pcb, target: Pid, signal: i32) {
    // The caller's own PCB is detached from `kernel.processes` while it is
    // being resumed, so a self-kill has to be applied to `pcb` directly.
    if target == pcb.pid {
        pcb.exit_code = Some(-1);
        pcb.clear_wait_fields();
        pcb.state = ProcessState::Terminated;
    } else if let Some(victim) = kernel.processes.get_mut(&target) {
        victim.state = ProcessState::Terminated;
        victim.exit_code = Some(-1);
        victim.clear_wait_fields();
    }
    kernel.push_log(pcb.pid, format!("sent signal {signal} to pid {target}"));

    pcb.pending_result = value::sentinel_true();
    if target != pcb.pid {
        pcb.state = ProcessState::Ready;
    }
}
