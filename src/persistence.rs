//! JSON-backed implementation of the §6 persistence contract.
//!
//! The source leaves the durable store unspecified ("a durable key/value
//! store keyed by an implementation-chosen identifier") — this crate's host
//! boundary is a path on disk, and the "identifier" is just that path. Only
//! the host ever calls into this module; it is never reachable from a
//! syscall.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::clock::LogicalTime;
use crate::error::KernelError;
use crate::vfs::{FileEntry, Vfs};

const MOTD_PATH: &str = "/etc/motd";
const MOTD_DEFAULT: &str = "Welcome to the kernel simulation.\n";

/// Serialize the namespace as `{path -> {path, created_at, updated_at, content}}`.
pub fn save(vfs: &Vfs, mut writer: impl Write) -> Result<(), KernelError> {
    let json = serde_json::to_vec_pretty(vfs.entries())?;
    writer.write_all(&json)?;
    Ok(())
}

/// Restore a namespace from its serialized form.
pub fn load(mut reader: impl Read) -> Result<Vfs, KernelError> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    let entries: HashMap<String, FileEntry> = serde_json::from_str(&buf)?;
    Ok(Vfs::from_entries(entries))
}

pub fn save_to_path(vfs: &Vfs, path: impl AsRef<Path>) -> Result<(), KernelError> {
    let file = File::create(path)?;
    save(vfs, file)
}

/// Load the namespace at `path` if it exists, otherwise start an empty one.
/// Either way, apply the "missing `/etc/motd` gets a default welcome string"
/// rule from §6.
pub fn load_or_init_path(path: impl AsRef<Path>, now: LogicalTime) -> Result<Vfs, KernelError> {
    let mut vfs = match File::open(&path) {
        Ok(file) => load(file)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vfs::new(),
        Err(err) => return Err(err.into()),
    };
    ensure_motd(&mut vfs, now);
    Ok(vfs)
}

fn ensure_motd(vfs: &mut Vfs, now: LogicalTime) {
    if !vfs.exists(MOTD_PATH) {
        vfs.write_whole(MOTD_PATH, MOTD_DEFAULT.as_bytes().to_vec(), now);
    }
}
