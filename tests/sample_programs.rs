//! End-to-end scenarios built on the sample userland programs (§8 scenarios
//! 1 and 6): the echo server/client round trip and shell command dispatch.

use std::rc::Rc;

use pretty_assertions::assert_eq;

use microkernel_sim::port::PortId;
use microkernel_sim::process::ProcessState;
use microkernel_sim::programs;
use microkernel_sim::value::Value;
use microkernel_sim::{Kernel, KernelConfig, SpawnOpts};

fn new_kernel() -> Kernel {
    let mut kernel = Kernel::new(KernelConfig::new().tick_ms(50));
    programs::register_all(&mut kernel);
    kernel
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
fn echo_server_listens_on_its_port_and_echoes_the_clients_payload_back() {
    let mut kernel = new_kernel();

    kernel
        .spawn("echo_server", SpawnOpts::new().priority(2))
        .unwrap();

    // Two ticks are enough for the server to dispatch `listen` and then
    // block on `recv_from_port`.
    kernel.tick();
    kernel.tick();

    let ports = kernel.ports_table();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].port, "8080");
    assert_eq!(ports[0].queue_length, 0);

    let client = kernel
        .spawn(
            "echo_client",
            SpawnOpts::new()
                .priority(1)
                .args(vec![Value::from(8080), Value::String("hi".into())]),
        )
        .unwrap();

    for _ in 0..10 {
        kernel.tick();
    }

    assert_eq!(state_of(&kernel, client), ProcessState::Terminated);
    let client_row = kernel
        .process_table()
        .into_iter()
        .find(|row| row.pid == client)
        .unwrap();
    assert_eq!(client_row.exit_code, Some(0));

    assert!(kernel.logs(10_000).iter().any(|entry| {
        entry.pid == client && entry.message.starts_with("reply = ") && entry.message.contains("hi")
    }));
}

#[test]
fn echo_client_against_a_nonexistent_server_exits_with_failure() {
    let mut kernel = new_kernel();

    let client = kernel
        .spawn(
            "echo_client",
            SpawnOpts::new().args(vec![Value::from(8080), Value::String("hi".into())]),
        )
        .unwrap();

    for _ in 0..3 {
        kernel.tick();
    }

    let row = kernel
        .process_table()
        .into_iter()
        .find(|row| row.pid == client)
        .unwrap();
    assert_eq!(row.state, ProcessState::Terminated);
    assert_eq!(row.exit_code, Some(1));
}

#[test]
fn shell_dispatches_a_ps_command_and_replies_with_a_shell_result() {
    let mut kernel = new_kernel();

    kernel.spawn("shell", SpawnOpts::new().priority(2)).unwrap();
    kernel.tick(); // listen
    kernel.tick(); // block on recv_from_port

    kernel.register_program(
        "shell_client",
        Rc::new(|sys, _args| {
            Box::pin(async move {
                let sent = sys
                    .send_to_port(PortId::new(9999), serde_json::json!({ "command": "ps" }))
                    .await;
                if sent == Value::Bool(false) {
                    sys.log("shell_client: no shell listening").await;
                    sys.exit(1).await;
                    return 1;
                }
                let reply = sys.recv(None).await;
                let payload = reply.get("payload").cloned().unwrap_or(Value::Null);
                sys.log(format!("shell reply = {payload}")).await;
                sys.exit(0).await;
                0
            })
        }),
    );
    let client = kernel
        .spawn("shell_client", SpawnOpts::new().priority(1))
        .unwrap();

    for _ in 0..8 {
        kernel.tick();
    }

    assert_eq!(state_of(&kernel, client), ProcessState::Terminated);
    let logged = kernel
        .logs(10_000)
        .into_iter()
        .find(|entry| entry.pid == client && entry.message.starts_with("shell reply = "))
        .expect("shell_client should have logged the shell's reply");
    assert!(logged.message.contains("\"ok\":true"));
    assert!(logged.message.contains("SHELL_RESULT"));
    assert!(logged.message.contains("Started ps"));
}
