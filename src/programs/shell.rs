//! A minimal command shell: listens on the conventional shell port, spawns a
//! child for recognized commands, and replies with a `SHELL_RESULT` message.

use serde_json::json;

use crate::port::PortId;
use crate::program::Syscalls;
use crate::value::Value;

use super::pid_from_value;

const SHELL_PORT: u64 = 9999;

pub async fn shell(sys: Syscalls, _args: Vec<Value>) -> i32 {
    let port = PortId::new(SHELL_PORT);
    if sys.listen(port.clone()).await == Value::Bool(false) {
        sys.log("shell: port 9999 already owned, exiting").await;
        return 1;
    }

    loop {
        let message = sys.recv_from_port(port.clone(), None).await;
        let Some(from_pid) = message.get("from_pid").and_then(pid_from_value) else {
            continue;
        };
        let command = message
            .get("payload")
            .and_then(|payload| payload.get("command"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        let reply = dispatch_command(&sys, &command).await;
        sys.send(from_pid, reply).await;
    }
}

async fn dispatch_command(sys: &Syscalls, command: &str) -> Value {
    match command {
        "ps" => {
            let child_pid = sys.spawn("ps", None, 1, Vec::new()).await;
            let ok = child_pid.as_i64().is_some_and(|pid| pid >= 0);
            let output = if ok {
                format!("Started ps (pid={child_pid})")
            } else {
                "failed to start ps".to_string()
            };
            json!({ "type": "SHELL_RESULT", "ok": ok, "output": output })
        }
        other => json!({
            "type": "SHELL_RESULT",
            "ok": false,
            "output": format!("unknown command: {other}"),
        }),
    }
}
