//! The file namespace syscalls: descriptor-based `open`/`read`/`write`/`close`
//! and the path-based convenience calls that bypass descriptors entirely.

use serde_json::json;

use crate::kernel::Kernel;
use crate::process::{OpenFile, OpenMode, Pcb, ProcessState};
use crate::value::{self, Value};

pub fn open(kernel: &mut Kernel, pcb: &mut Pcb, path: String, mode: OpenMode) {
    let now = kernel.now();
    let position = match mode {
        OpenMode::Read => {
            if !kernel.vfs.exists(&path) {
                pcb.pending_result = value::int(-1);
                pcb.state = ProcessState::Ready;
                return;
            }
            0
        }
        OpenMode::Write => {
            kernel.vfs.create_or_truncate(&path, now);
            0
        }
        OpenMode::Append => {
            kernel.vfs.create_if_missing(&path, now);
            kernel.vfs.len_of(&path).unwrap_or(0)
        }
    };

    let fd = pcb.allocate_fd();
    pcb.fd_table.insert(fd, OpenFile { path, position, mode });
    pcb.pending_result = value::int(fd as i64);
    pcb.state = ProcessState::Ready;
}

/// Unlike `write`, which special-cases fds 1/2 as the host's standard
/// streams, `read`/`close` have no such case: a 0/1/2 descriptor is just
/// an unknown one here, matching the source.
pub fn read(kernel: &Kernel, pcb: &mut Pcb, fd: i32, n: Option<usize>) {
    let open_file = match pcb.fd_table.get(&fd) {
        Some(f) => f.clone(),
        None => {
            pcb.pending_result = value::sentinel_null();
            pcb.state = ProcessState::Ready;
            return;
        }
    };

    let data = kernel
        .vfs
        .read_at(&open_file.path, open_file.position, n)
        .unwrap_or_default();
    let advance = data.len();
    if let Some(entry) = pcb.fd_table.get_mut(&fd) {
        entry.position += advance;
    }
    pcb.pending_result = Value::String(String::from_utf8_lossy(&data).into_owned());
    pcb.state = ProcessState::Ready;
}

pub fn write(kernel: &mut Kernel, pcb: &mut Pcb, fd: i32, data: Vec<u8>) {
    if fd == 1 || fd == 2 {
        let text = String::from_utf8_lossy(&data);
        if fd == 1 {
            print!("{text}");
        } else {
            eprint!("{text}");
        }
        pcb.pending_result = value::int(data.len() as i64);
        pcb.state = ProcessState::Ready;
        return;
    }

    let open_file = match pcb.fd_table.get(&fd) {
        Some(f) => f.clone(),
        None => {
            pcb.pending_result = value::int(-1);
            pcb.state = ProcessState::Ready;
            return;
        }
    };

    let now = kernel.now();
    let written = kernel
        .vfs
        .write_at(&open_file.path, open_file.position, &data, now);
    match written {
        Some(n) => {
            if let Some(entry) = pcb.fd_table.get_mut(&fd) {
                entry.position += n;
            }
            pcb.pending_result = value::int(n as i64);
        }
        None => pcb.pending_result = value::int(-1),
    }
    pcb.state = ProcessState::Ready;
}

pub fn close(pcb: &mut Pcb, fd: i32) {
    pcb.fd_table.remove(&fd);
    pcb.pending_result = value::int(0);
    pcb.state = ProcessState::Ready;
}

pub fn read_file(kernel: &Kernel, pcb: &mut Pcb, path: String) {
    pcb.pending_result = match kernel.vfs.get(&path) {
        Some(entry) => Value::String(String::from_utf8_lossy(&entry.content).into_owned()),
        None => value::sentinel_null(),
    };
    pcb.state = ProcessState::Ready;
}

pub fn write_file(kernel: &mut Kernel, pcb: &mut Pcb, path: String, text: String) {
    let now = kernel.now();
    kernel.vfs.write_whole(&path, text.into_bytes(), now);
    pcb.pending_result = value::sentinel_true();
    pcb.state = ProcessState::Ready;
}

pub fn unlink(kernel: &mut Kernel, pcb: &mut Pcb, path: String) {
    let ok = kernel.vfs.unlink(&path);
    pcb.pending_result = if ok {
        value::sentinel_true()
    } else {
        value::sentinel_false()
    };
    pcb.state = ProcessState::Ready;
}

pub fn list_files(kernel: &Kernel, pcb: &mut Pcb) {
    let entries: Vec<Value> = kernel
        .vfs
        .iter()
        .map(|file| {
            json!({
                "path": file.path,
                "size": file.content.len(),
            })
        })
        .collect();
    pcb.pending_result = Value::Array(entries);
    pcb.state = ProcessState::Ready;
}
