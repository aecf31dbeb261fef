//! A small demo host: builds a kernel, registers the sample programs,
//! spawns an echo server and client, and ticks until the client exits.

use microkernel_sim::{Kernel, KernelConfig, SpawnOpts};

fn main() {
    env_logger::init();

    let mut kernel = Kernel::new(KernelConfig::new().tick_ms(50));
    microkernel_sim::programs::register_all(&mut kernel);

    let server = kernel
        .spawn("echo_server", SpawnOpts::new().priority(2))
        .expect("echo_server is registered");
    let client = kernel
        .spawn(
            "echo_client",
            SpawnOpts::new()
                .priority(1)
                .args(vec![8080.into(), "hello from kernelsim".into()]),
        )
        .expect("echo_client is registered");

    println!("spawned echo_server as pid {server}, echo_client as pid {client}");

    for _ in 0..20 {
        kernel.tick();
        if kernel
            .process_table()
            .iter()
            .any(|p| p.pid == client && p.state == microkernel_sim::process::ProcessState::Terminated)
        {
            break;
        }
    }

    kernel.reap_terminated();

    for entry in kernel.logs(50) {
        println!("[{:>6}] pid {:>3}: {}", entry.time, entry.pid, entry.message);
    }

    println!("final process table:");
    for row in kernel.process_table() {
        println!(
            "  pid={} name={} state={:?} priority={}",
            row.pid, row.name, row.state, row.priority
        );
    }
}
