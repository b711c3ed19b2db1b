//! Durable todo store.
//!
//! # Overview
//! Owns the todo collection in memory and mirrors every accepted mutation to
//! a single JSON snapshot file on disk. The HTTP binding lives in the
//! `todo-server` crate; this crate has no async runtime dependency.
//!
//! # Design
//! - `TodoStore` guards `{ next_id, todos }` with one `RwLock`. Reads share
//!   it; mutations hold it exclusively across validate, mutate, persist and,
//!   on failure, rollback.
//! - Ids come from a counter persisted in the snapshot, so a deleted id is
//!   never handed out again, not even after a restart.
//! - The snapshot is only ever replaced atomically (temp file in the same
//!   directory, fsync, rename). A crash mid-write leaves the previous file.

pub mod error;
pub mod snapshot;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use store::TodoStore;
pub use types::{NewTodo, Todo, TodoId, TodoPatch};
