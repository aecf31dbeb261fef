//! A minimal process-listing one-shot: logs the process table and exits.

use crate::program::{KInfoKind, Syscalls};
use crate::value::Value;

pub async fn ps(sys: Syscalls, _args: Vec<Value>) -> i32 {
    let table = sys.kernel_info(KInfoKind::Ps).await;
    sys.log(format!("ps: {table}")).await;
    sys.exit(0).await;
    0
}
