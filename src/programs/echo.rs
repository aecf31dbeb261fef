//! The echo round-trip fixture: a port-listening server and the client that
//! exercises it.

use serde_json::json;

use crate::port::PortId;
use crate::program::Syscalls;
use crate::value::Value;

use super::pid_from_value;

fn port_arg(args: &[Value], default: u64) -> PortId {
    let port = args.first().and_then(Value::as_u64).unwrap_or(default);
    PortId::new(port)
}

/// Listens on a port (default `8080`) forever, echoing every payload it
/// receives back to the sender's mailbox wrapped in `{"echo": payload}`.
pub async fn echo_server(sys: Syscalls, args: Vec<Value>) -> i32 {
    let port = port_arg(&args, 8080);
    let listened = sys.listen(port.clone()).await;
    if listened == Value::Bool(false) {
        sys.log(format!("echo_server: port {port} already owned, exiting")).await;
        return 1;
    }

    loop {
        let message = sys.recv_from_port(port.clone(), None).await;
        let Some(from_pid) = message.get("from_pid").and_then(pid_from_value) else {
            continue;
        };
        let payload = message.get("payload").cloned().unwrap_or(Value::Null);
        sys.log(format!("echo: {payload}")).await;
        sys.send(from_pid, json!({ "echo": payload })).await;
    }
}

/// Sends a single message to `echo_server`'s port and waits for the reply.
pub async fn echo_client(sys: Syscalls, args: Vec<Value>) -> i32 {
    let port = port_arg(&args, 8080);
    let text = args.get(1).and_then(Value::as_str).unwrap_or("hi").to_string();

    let sent = sys.send_to_port(port, Value::String(text.clone())).await;
    if sent == Value::Bool(false) {
        sys.log("echo_client: no such port").await;
        sys.exit(1).await;
        return 1;
    }

    let reply = sys.recv(None).await;
    let payload = reply.get("payload").cloned().unwrap_or(Value::Null);
    sys.log(format!("reply = {payload}")).await;
    sys.exit(0).await;
    0
}
