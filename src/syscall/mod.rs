//! The syscall dispatcher: a total function of the caller's PCB, the
//! requested syscall, and the rest of kernel state, onto a new PCB state and
//! whatever side effects the syscall has on other registries.
//!
//! The caller's PCB is always passed in detached from `kernel.processes` —
//! either because the scheduler pulled it out of the table to resume it, or
//! because it has not been inserted yet (a brand-new child has no map entry
//! until after its first dispatch completes). This is what lets handlers
//! freely borrow `kernel.processes` to reach *other* pids (delivery targets,
//! `kill` victims, `spawn` children) without fighting the borrow checker.

mod control;
mod file;
mod introspect;
mod ipc;
mod ports;
mod time;

use crate::kernel::Kernel;
use crate::process::Pcb;
use crate::program::SyscallRequest;

/// Dispatch one yielded syscall request, mutating `pcb` and `kernel` to
/// reflect its outcome. On return, `pcb.state` is one of `READY`, `BLOCKED`,
/// or `TERMINATED`, and `pcb.pending_result` holds the value to hand back on
/// the next resume (meaningless if terminated).
pub(crate) fn dispatch(kernel: &mut Kernel, pcb: &mut Pcb, request: SyscallRequest) {
    match request {
        SyscallRequest::Sleep { ms } => time::sleep(kernel, pcb, ms),
        SyscallRequest::GetPid => time::get_pid(pcb),
        SyscallRequest::Log { message } => time::log(kernel, pcb, message),
        SyscallRequest::Exit { code } => time::exit(pcb, code),

        SyscallRequest::Send { to, message } => ipc::send(kernel, pcb, to, message),
        SyscallRequest::Recv { from } => ipc::recv(kernel, pcb, from),

        SyscallRequest::Open { path, mode } => file::open(kernel, pcb, path, mode),
        SyscallRequest::Read { fd, n } => file::read(kernel, pcb, fd, n),
        SyscallRequest::Write { fd, data } => file::write(kernel, pcb, fd, data),
        SyscallRequest::Close { fd } => file::close(pcb, fd),
        SyscallRequest::ListFiles => file::list_files(kernel, pcb),
        SyscallRequest::ReadFile { path } => file::read_file(kernel, pcb, path),
        SyscallRequest::WriteFile { path, text } => file::write_file(kernel, pcb, path, text),
        SyscallRequest::Unlink { path } => file::unlink(kernel, pcb, path),

        SyscallRequest::Exec { program, args } => control::exec(kernel, pcb, program, args),
        SyscallRequest::Spawn {
            program,
            name,
            priority,
            args,
        } => control::spawn(kernel, pcb, program, name, priority, args),
        SyscallRequest::Kill { target, signal } => control::kill(kernel, pcb, target, signal),

        SyscallRequest::Listen { port } => ports::listen(kernel, pcb, port),
        SyscallRequest::Unlisten { port } => ports::unlisten(kernel, pcb, port),
        SyscallRequest::SendPort { port, payload } => {
            ports::send_to_port(kernel, pcb, port, payload)
        }
        SyscallRequest::RecvPort { port, timeout_ms } => {
            ports::recv_from_port(kernel, pcb, port, timeout_ms)
        }
        SyscallRequest::ListPorts => introspect::list_ports(kernel, pcb),

        SyscallRequest::KernelInfo { kind } => introspect::kernel_info(kernel, pcb, kind),
        SyscallRequest::HeapSet { key, value } => introspect::heap_set(pcb, key, value),
        SyscallRequest::HeapGet { key } => introspect::heap_get(pcb, key),
    }
}
