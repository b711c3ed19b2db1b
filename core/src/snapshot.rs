//! Snapshot codec and atomic-replace writer.
//!
//! # Layout
//! One JSON document per store:
//!
//! ```text
//! { "next_id": 8, "todos": [ { "id": 1, ... }, ... ] }
//! ```
//!
//! A bare JSON array of todos (the layout written by older servers) is still
//! accepted on load; its counter is derived from the highest id.
//!
//! # Invariants
//! - The canonical file is only ever replaced by `rename`, never rewritten in
//!   place, so readers see either the old or the new document.
//! - The temp file lives in the same directory as the canonical file; a
//!   rename across filesystems would not be atomic.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::types::{Todo, TodoId};

/// The full collection plus its id counter, as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub next_id: TodoId,
    pub todos: Vec<Todo>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            next_id: 1,
            todos: Vec::new(),
        }
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    next_id: TodoId,
    todos: &'a [Todo],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OnDisk {
    Current { next_id: TodoId, todos: Vec<Todo> },
    Legacy(Vec<Todo>),
}

/// Read the snapshot at `path`. A missing file yields `Ok(None)`.
pub fn load(path: &Path) -> Result<Option<Snapshot>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(StoreError::StorageUnavailable(format!(
                "cannot read {}: {err}",
                path.display()
            )))
        }
    };
    decode(&bytes)
        .map(Some)
        .map_err(|err| match err {
            StoreError::StorageFailure(msg) => {
                StoreError::StorageFailure(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
}

/// Parse and validate a snapshot document.
pub fn decode(bytes: &[u8]) -> Result<Snapshot> {
    let on_disk: OnDisk = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::StorageFailure(format!("corrupt snapshot: {e}")))?;
    let (stored_next, todos) = match on_disk {
        OnDisk::Current { next_id, todos } => (next_id, todos),
        OnDisk::Legacy(todos) => (1, todos),
    };

    let mut seen = HashSet::with_capacity(todos.len());
    for todo in &todos {
        if todo.id == 0 {
            return Err(StoreError::StorageFailure(
                "corrupt snapshot: todo with id 0".to_string(),
            ));
        }
        if !seen.insert(todo.id) {
            return Err(StoreError::StorageFailure(format!(
                "corrupt snapshot: duplicate id {}",
                todo.id
            )));
        }
    }

    let max_id = todos.iter().map(|t| t.id).max().unwrap_or(0);
    let after_max = max_id.checked_add(1).ok_or_else(|| {
        StoreError::StorageFailure("corrupt snapshot: id counter exhausted".to_string())
    })?;
    Ok(Snapshot {
        next_id: stored_next.max(after_max),
        todos,
    })
}

/// Serialize a collection and its counter into a snapshot document.
pub fn encode(next_id: TodoId, todos: &[Todo]) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(&SnapshotRef { next_id, todos })
        .map_err(|e| StoreError::StorageFailure(format!("cannot encode snapshot: {e}")))
}

/// Atomically replace the file at `path` with `bytes`.
///
/// Writes a temp file next to `path`, fsyncs it and renames it over `path`.
/// On any error before the rename the previous file is untouched and the temp
/// file is removed when it drops.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = parent_dir(path);
    let mut tmp = tempfile::Builder::new()
        .prefix(".todos-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| failure("create temp file in", dir, e))?;

    tmp.write_all(bytes)
        .map_err(|e| failure("write temp file", tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| failure("fsync temp file", tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| failure("replace", path, e.error))?;

    sync_dir(dir);
    Ok(())
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn failure(action: &str, path: &Path, err: io::Error) -> StoreError {
    StoreError::StorageFailure(format!("{action} {}: {err}", path.display()))
}

// The rename is already committed here; a failed directory fsync only weakens
// durability against power loss, so it is logged rather than reported.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(err) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        tracing::warn!(dir = %dir.display(), error = %err, "failed to fsync snapshot directory");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
