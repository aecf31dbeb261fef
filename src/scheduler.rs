//! The tick loop: one atomic unit of kernel progress.
//!
//! Shaped after a `schedule`/run-queue walk (advance time, find the next
//! runnable task by priority, switch to it), generalized from a preemptive
//! multi-task context switch to a single cooperative step: this model
//! resumes exactly one process per tick and lets it run until its next
//! syscall, instead of timer-interrupting a running task.

use std::mem;

use log::warn;

use crate::kernel::Kernel;
use crate::process::{BlockReason, Pid, ProcessState};
use crate::program::RoutineStep;
use crate::value::Value;

pub fn tick(kernel: &mut Kernel) {
    let now = kernel.clock.advance();

    unblock_timed_waits(kernel, now);

    let Some(pid) = select_next(kernel) else {
        return;
    };

    let mut pcb = kernel
        .processes
        .remove(&pid)
        .expect("selected pid must be present in the process table");
    pcb.state = ProcessState::Running;

    let input = mem::replace(&mut pcb.pending_result, Value::Null);
    match pcb.routine.step(input) {
        RoutineStep::Done(code) => {
            pcb.exit_code = Some(code);
            pcb.state = ProcessState::Terminated;
        }
        RoutineStep::Crashed(message) => {
            warn!("process {pid} crashed: {message}");
            kernel.push_log(pid, format!("Process crashed: {message}"));
            pcb.exit_code = Some(1);
            pcb.state = ProcessState::Terminated;
        }
        RoutineStep::Yield(request) => {
            crate::syscall::dispatch(kernel, &mut pcb, request);
        }
        RoutineStep::Idle => {
            pcb.pending_result = Value::Null;
            pcb.state = ProcessState::Ready;
        }
    }

    kernel.processes.insert(pid, pcb);
}

/// Resolve sleep deadlines and port-recv timeouts that have come due.
fn unblock_timed_waits(kernel: &mut Kernel, now: u64) {
    for pcb in kernel.processes.values_mut() {
        if pcb.state != ProcessState::Blocked {
            continue;
        }
        match &pcb.block_reason {
            BlockReason::Sleep => {
                if pcb.wake_time.is_some_and(|deadline| deadline <= now) {
                    pcb.clear_wait_fields();
                    pcb.pending_result = crate::value::sentinel_true();
                    pcb.state = ProcessState::Ready;
                }
            }
            BlockReason::RecvPort { .. } => {
                if pcb.wait_timeout_at.is_some_and(|deadline| deadline <= now) {
                    pcb.clear_wait_fields();
                    pcb.pending_result = Value::Null;
                    pcb.state = ProcessState::Ready;
                }
            }
            _ => {}
        }
    }
}

/// Highest priority among `READY` PCBs; ties broken by ascending pid, which
/// falls out of `BTreeMap<Pid, _>`'s iteration order for free.
fn select_next(kernel: &Kernel) -> Option<Pid> {
    kernel
        .processes
        .iter()
        .filter(|(_, pcb)| pcb.state == ProcessState::Ready)
        .max_by_key(|(pid, pcb)| (pcb.priority, std::cmp::Reverse(pid.0)))
        .map(|(pid, _)| *pid)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use crate::kernel::{Kernel, KernelConfig, SpawnOpts};
    use crate::process::ProcessState;
    use crate::value::Value;

    /// Logs "ping" on every resume, forever; never blocks.
    fn register_logger(kernel: &mut Kernel) {
        kernel.register_program(
            "logger",
            Rc::new(|sys, _args| {
                Box::pin(async move {
                    loop {
                        sys.log("ping").await;
                    }
                })
            }),
        );
    }

    /// Sleeps for `args[0]` ms, then logs forever; never exits.
    fn register_sleeper(kernel: &mut Kernel) {
        kernel.register_program(
            "sleeper",
            Rc::new(|sys, args| {
                Box::pin(async move {
                    let ms = args[0].as_u64().unwrap();
                    sys.sleep(ms).await;
                    loop {
                        sys.log("awake").await;
                    }
                })
            }),
        );
    }

    fn log_count_for(kernel: &Kernel, pid: crate::process::Pid) -> usize {
        kernel.logs(10_000).iter().filter(|entry| entry.pid == pid).count()
    }

    #[test]
    fn first_syscall_a_routine_ever_issues_is_actually_dispatched() {
        // Regression test: `Routine::step` must not inject the process's
        // initial placeholder `pending_result` as though it were a genuine
        // prior syscall result on the very first poll, or the routine's
        // first request (here, `log`) would be silently skipped and never
        // reach the dispatcher.
        let mut kernel = Kernel::new(KernelConfig::new());
        register_logger(&mut kernel);
        let pid = kernel.spawn("logger", SpawnOpts::new()).unwrap();

        kernel.tick();

        assert_eq!(log_count_for(&kernel, pid), 1);
        assert_eq!(kernel.logs(1)[0].message, "ping");
    }

    #[test]
    fn same_priority_ties_are_broken_by_ascending_pid_every_time() {
        let mut kernel = Kernel::new(KernelConfig::new());
        register_logger(&mut kernel);
        let low_pid = kernel.spawn("logger", SpawnOpts::new().priority(1)).unwrap();
        let high_pid = kernel.spawn("logger", SpawnOpts::new().priority(1)).unwrap();
        assert!(low_pid.0 < high_pid.0);

        for _ in 0..5 {
            kernel.tick();
        }

        // The lower pid wins every tie, every tick, since it is always
        // ready again immediately after its log syscall completes.
        assert_eq!(log_count_for(&kernel, low_pid), 5);
        assert_eq!(log_count_for(&kernel, high_pid), 0);
    }

    #[test]
    fn higher_priority_process_runs_every_tick_starving_the_lower_one() {
        let mut kernel = Kernel::new(KernelConfig::new());
        register_logger(&mut kernel);
        let low = kernel.spawn("logger", SpawnOpts::new().priority(1)).unwrap();
        let high = kernel.spawn("logger", SpawnOpts::new().priority(2)).unwrap();

        for _ in 0..100 {
            kernel.tick();
        }

        assert_eq!(log_count_for(&kernel, high), 100);
        assert_eq!(log_count_for(&kernel, low), 0);
    }

    #[test]
    fn sleep_blocks_for_the_configured_number_of_ticks() {
        let mut kernel = Kernel::new(KernelConfig::new().tick_ms(50));
        register_sleeper(&mut kernel);
        let pid = kernel
            .spawn("sleeper", SpawnOpts::new().args(vec![Value::from(150)]))
            .unwrap();

        kernel.tick(); // t=50: dispatches sleep(150), wake_time=200, -> Blocked
        assert_eq!(state_of(&kernel, pid), ProcessState::Blocked);

        kernel.tick(); // t=100: still blocked
        assert_eq!(state_of(&kernel, pid), ProcessState::Blocked);

        kernel.tick(); // t=150: still blocked
        assert_eq!(state_of(&kernel, pid), ProcessState::Blocked);

        kernel.tick(); // t=200: wake_time reached, unblocked and resumed this tick
        assert_eq!(state_of(&kernel, pid), ProcessState::Ready);
        assert_eq!(log_count_for(&kernel, pid), 1);
    }

    fn state_of(kernel: &Kernel, pid: crate::process::Pid) -> ProcessState {
        kernel
            .process_table()
            .into_iter()
            .find(|row| row.pid == pid)
            .unwrap()
            .state
    }

    #[test]
    fn tick_with_no_ready_process_is_a_harmless_no_op() {
        let mut kernel = Kernel::new(KernelConfig::new());
        kernel.tick();
        assert!(kernel.process_table().is_empty());
    }

    #[test]
    fn no_pcb_is_ever_observed_running_between_ticks() {
        let mut kernel = Kernel::new(KernelConfig::new());
        register_logger(&mut kernel);
        kernel.spawn("logger", SpawnOpts::new()).unwrap();
        for _ in 0..10 {
            kernel.tick();
            assert!(kernel
                .process_table()
                .iter()
                .all(|row| row.state != ProcessState::Running));
        }
    }
}
