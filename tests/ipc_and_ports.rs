//! End-to-end mailbox and port IPC: blocked-receiver wakeup, the port
//! single-owner invariant, and the `recv_from_port` timeout (§8 scenarios
//! 4 and 5).

use std::rc::Rc;

use pretty_assertions::assert_eq;

use microkernel_sim::port::PortId;
use microkernel_sim::process::ProcessState;
use microkernel_sim::value::Value;
use microkernel_sim::{Kernel, KernelConfig, SpawnOpts};

fn new_kernel() -> Kernel {
    Kernel::new(KernelConfig::new().tick_ms(50))
}

fn state_of(kernel: &Kernel, pid: microkernel_sim::Pid) -> ProcessState {
    kernel
        .process_table()
        .into_iter()
        .find(|row| row.pid == pid)
        .unwrap()
        .state
}

#[test]
fn send_to_a_blocked_receiver_wakes_it_up_synchronously() {
    let mut kernel = new_kernel();

    kernel.register_program(
        "blocking_receiver",
        Rc::new(|sys, _args| {
            Box::pin(async move {
                let msg = sys.recv(None).await;
                sys.heap_set("received", msg).await;
                loop {
                    sys.log("done").await;
                }
            })
        }),
    );

    let receiver = kernel.spawn("blocking_receiver", SpawnOpts::new()).unwrap();

    // Tick 1: the receiver's first real syscall is `recv`, which finds
    // nothing and blocks.
    kernel.tick();
    assert_eq!(state_of(&kernel, receiver), ProcessState::Blocked);

    // A `send` from the host side of the simulation would normally come
    // from another process; spawn a one-shot sender instead.
    kernel.register_program(
        "sender",
        Rc::new(move |sys, _args| {
            Box::pin(async move {
                sys.send(receiver, Value::String("hello".into())).await;
                sys.exit(0).await;
                0
            })
        }),
    );
    kernel.spawn("sender", SpawnOpts::new().priority(5)).unwrap();

    // Tick 2: the sender (higher priority) runs, delivers directly into the
    // blocked receiver's pending_result, waking it without waiting for a
    // tick boundary.
    kernel.tick();
    assert_eq!(state_of(&kernel, receiver), ProcessState::Ready);

    // Tick 3: the receiver resumes with the delivered message already in
    // hand and stores it in its heap.
    kernel.tick();
    kernel.tick();
    // heap_get isn't directly observable from the host, so confirm delivery
    // indirectly: the receiver made it past `recv` without blocking again.
    assert_eq!(state_of(&kernel, receiver), ProcessState::Ready);
}

#[test]
fn port_is_single_owner_and_second_listener_is_delivered_to_the_first() {
    let mut kernel = new_kernel();

    kernel.register_program(
        "owner",
        Rc::new(|sys, _args| {
            Box::pin(async move {
                let ok = sys.listen(PortId::new(5000)).await;
                sys.heap_set("listen_ok", ok).await;
                let msg = sys.recv_from_port(PortId::new(5000), None).await;
                sys.heap_set("msg", msg).await;
                sys.exit(0).await;
                0
            })
        }),
    );
    kernel.register_program(
        "rival",
        Rc::new(|sys, _args| {
            Box::pin(async move {
                let ok = sys.listen(PortId::new(5000)).await;
                sys.heap_set("listen_ok", ok).await;
                sys.exit(0).await;
                0
            })
        }),
    );
    kernel.register_program(
        "outsider",
        Rc::new(|sys, _args| {
            Box::pin(async move {
                sys.send_to_port(PortId::new(5000), Value::String("x".into()))
                    .await;
                sys.exit(0).await;
                0
            })
        }),
    );

    let owner = kernel.spawn("owner", SpawnOpts::new().priority(3)).unwrap();
    kernel.spawn("rival", SpawnOpts::new().priority(2)).unwrap();
    kernel.spawn("outsider", SpawnOpts::new().priority(1)).unwrap();

    // owner listens first (highest priority), then rival's listen fails,
    // then outsider's send_to_port is delivered to the original owner.
    for _ in 0..6 {
        kernel.tick();
    }

    let ports = kernel.ports_table();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].port, "5000");
    assert_eq!(ports[0].owner_pid, owner);
}

#[test]
fn recv_from_port_times_out_with_a_null_sentinel_when_nothing_arrives() {
    let mut kernel = new_kernel();

    kernel.register_program(
        "owner",
        Rc::new(|sys, _args| {
            Box::pin(async move {
                sys.listen(PortId::new(7000)).await;
                let reply = sys.recv_from_port(PortId::new(7000), Some(100)).await;
                let verdict = if reply == Value::Null { "null" } else { "other" };
                loop {
                    sys.log(format!("timed out reply={verdict}")).await;
                }
            })
        }),
    );
    let pid = kernel.spawn("owner", SpawnOpts::new()).unwrap();

    kernel.tick(); // t=50: listen dispatched
    kernel.tick(); // t=100: recv_from_port(timeout=100) dispatched, deadline=200
    assert_eq!(state_of(&kernel, pid), ProcessState::Blocked);

    kernel.tick(); // t=150: still waiting
    assert_eq!(state_of(&kernel, pid), ProcessState::Blocked);

    kernel.tick(); // t=200: timeout fires, unblocked with a null sentinel
    assert_eq!(state_of(&kernel, pid), ProcessState::Ready);
    assert_eq!(kernel.logs(1)[0].message, "timed out reply=null");
}

#[test]
fn non_owner_cannot_recv_from_a_port_it_does_not_own() {
    let mut kernel = new_kernel();
    kernel.register_program(
        "owner",
        Rc::new(|sys, _args| {
            Box::pin(async move {
                sys.listen(PortId::new(42)).await;
                loop {
                    sys.log("owner idle").await;
                }
            })
        }),
    );
    kernel.register_program(
        "interloper",
        Rc::new(|sys, _args| {
            Box::pin(async move {
                let reply = sys.recv_from_port(PortId::new(42), None).await;
                let verdict = if reply == Value::Bool(false) { "rejected" } else { "other" };
                loop {
                    sys.log(verdict).await;
                }
            })
        }),
    );

    kernel.spawn("owner", SpawnOpts::new().priority(2)).unwrap();
    let interloper = kernel
        .spawn("interloper", SpawnOpts::new().priority(1))
        .unwrap();

    for _ in 0..4 {
        kernel.tick();
    }

    assert_eq!(state_of(&kernel, interloper), ProcessState::Ready);
    assert!(kernel
        .logs(10_000)
        .iter()
        .any(|entry| entry.pid == interloper && entry.message == "rejected"));
}
