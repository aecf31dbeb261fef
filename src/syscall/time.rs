//! Sleep, pid query, logging, and exit — the syscalls that need no registry
//! but the caller's own PCB and the clock.

use crate::kernel::Kernel;
use crate::process::{BlockReason, Pcb, ProcessState};
use crate::value;

pub fn sleep(kernel: &Kernel, pcb: &mut Pcb, ms: u64) {
    pcb.block_reason = BlockReason::Sleep;
    pcb.wake_time = Some(kernel.now() + ms);
    pcb.state = ProcessState::Blocked;
}

pub fn get_pid(pcb: &mut Pcb) {
    pcb.pending_result = value::int(pcb.pid.0 as i64);
    pcb.state = ProcessState::Ready;
}

pub fn log(kernel: &mut Kernel, pcb: &mut Pcb, message: String) {
    kernel.push_log(pcb.pid, message);
    pcb.pending_result = value::sentinel_true();
    pcb.state = ProcessState::Ready;
}

pub fn exit(pcb: &mut Pcb, code: i32) {
    pcb.exit_code = Some(code);
    pcb.state = ProcessState::Terminated;
}
