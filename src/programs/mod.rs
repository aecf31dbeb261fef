//! Sample userland: the fixture programs used to anchor the end-to-end
//! scenarios — an echo service over a port, its client, a tiny command
//! shell, and a `ps` one-shot.

mod echo;
mod ps;
mod shell;

use std::rc::Rc;

use crate::kernel::Kernel;
use crate::process::Pid;
use crate::value::Value;

pub use echo::{echo_client, echo_server};
pub use ps::ps;
pub use shell::shell;

/// Register every sample program under its conventional name. A host wiring
/// up this crate for the first time can call this once and then `spawn`
/// any of the names below.
pub fn register_all(kernel: &mut Kernel) {
    kernel.register_program("echo_server", Rc::new(|sys, args| Box::pin(echo_server(sys, args))));
    kernel.register_program("echo_client", Rc::new(|sys, args| Box::pin(echo_client(sys, args))));
    kernel.register_program("shell", Rc::new(|sys, args| Box::pin(shell(sys, args))));
    kernel.register_program("ps", Rc::new(|sys, args| Box::pin(ps(sys, args))));
}

fn pid_from_value(value: &Value) -> Option<Pid> {
    value.as_u64().map(Pid)
}
