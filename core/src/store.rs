//! The todo store: in-memory collection mirrored to a snapshot file.
//!
//! # Invariants
//! - Every id handed out is strictly greater than all ids handed out before,
//!   across deletes and restarts.
//! - A mutation returns `Ok` only after the snapshot containing it has been
//!   atomically written. If the write fails the in-memory state is restored
//!   before the lock is released, so no caller ever observes an unpersisted
//!   record.
//! - Readers never see a half-applied mutation: mutations hold the write
//!   lock for their whole read-modify-write-persist sequence.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::snapshot::{self, Snapshot};
use crate::types::{NewTodo, Todo, TodoId, TodoPatch};

#[derive(Debug)]
struct State {
    next_id: TodoId,
    todos: Vec<Todo>,
}

impl State {
    fn position(&self, id: TodoId) -> Option<usize> {
        self.todos.iter().position(|t| t.id == id)
    }
}

/// Single-writer store owning the todo collection and its backing file.
///
/// All methods are synchronous. Async callers should run mutations on a
/// blocking pool so a cancelled request cannot interrupt a write half-way.
#[derive(Debug)]
pub struct TodoStore {
    path: PathBuf,
    state: RwLock<State>,
}

impl TodoStore {
    /// Open the store backed by `path`, loading the snapshot if one exists.
    ///
    /// The parent directory is created when missing. A corrupt snapshot is a
    /// `StorageFailure`; one that cannot be read at all is
    /// `StorageUnavailable`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let dir = snapshot::parent_dir(&path);
        fs::create_dir_all(dir).map_err(|e| {
            StoreError::StorageUnavailable(format!("cannot create {}: {e}", dir.display()))
        })?;

        let Snapshot { next_id, todos } = snapshot::load(&path)?.unwrap_or_else(Snapshot::empty);
        info!(
            path = %path.display(),
            todos = todos.len(),
            next_id,
            "todo store opened"
        );

        Ok(Self {
            path,
            state: RwLock::new(State { next_id, todos }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.todos.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// All todos in insertion order.
    pub fn list(&self) -> Result<Vec<Todo>> {
        Ok(self.read()?.todos.clone())
    }

    pub fn get(&self, id: TodoId) -> Result<Todo> {
        let state = self.read()?;
        state
            .position(id)
            .map(|idx| state.todos[idx].clone())
            .ok_or(StoreError::NotFound(id))
    }

    /// Validate, assign the next id, append and persist.
    pub fn create(&self, input: NewTodo) -> Result<Todo> {
        let title = required("title", input.title)?;
        let description = required("description", input.description)?;

        let mut state = self.write()?;
        let id = state.next_id;
        let next_id = id.checked_add(1).ok_or_else(|| {
            StoreError::StorageFailure("id counter exhausted".to_string())
        })?;
        let todo = Todo {
            id,
            title,
            description,
            completed: false,
        };
        state.todos.push(todo.clone());
        state.next_id = next_id;

        if let Err(err) = self.persist(&state) {
            state.todos.pop();
            state.next_id = id;
            warn!(id = todo.id, error = %err, "create rolled back");
            return Err(err);
        }

        debug!(id = todo.id, "todo created");
        Ok(todo)
    }

    /// Apply the fields present in `patch` to todo `id` and persist.
    ///
    /// An unknown id is `NotFound` even when the patch is also empty or
    /// invalid.
    pub fn update(&self, id: TodoId, patch: TodoPatch) -> Result<Todo> {
        let mut state = self.write()?;
        let idx = state.position(id).ok_or(StoreError::NotFound(id))?;
        if patch.is_empty() {
            return Err(StoreError::InvalidInput(
                "no change was provided".to_string(),
            ));
        }
        if let Some(title) = &patch.title {
            not_blank("title", title)?;
        }
        if let Some(description) = &patch.description {
            not_blank("description", description)?;
        }

        let previous = state.todos[idx].clone();
        patch.apply_to(&mut state.todos[idx]);
        let updated = state.todos[idx].clone();

        if let Err(err) = self.persist(&state) {
            state.todos[idx] = previous;
            warn!(id, error = %err, "update rolled back");
            return Err(err);
        }

        debug!(id, completed = updated.completed, "todo updated");
        Ok(updated)
    }

    /// Remove todo `id` and persist. Returns the removed record.
    pub fn delete(&self, id: TodoId) -> Result<Todo> {
        let mut state = self.write()?;
        let idx = state.position(id).ok_or(StoreError::NotFound(id))?;
        let removed = state.todos.remove(idx);

        if let Err(err) = self.persist(&state) {
            state.todos.insert(idx, removed);
            warn!(id, error = %err, "delete rolled back");
            return Err(err);
        }

        debug!(id, "todo deleted");
        Ok(removed)
    }

    fn persist(&self, state: &State) -> Result<()> {
        let bytes = snapshot::encode(state.next_id, &state.todos)?;
        snapshot::write_atomic(&self.path, &bytes)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::StorageUnavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::StorageUnavailable("store lock poisoned".to_string()))
    }
}

fn required(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(value) => {
            not_blank(field, &value)?;
            Ok(value)
        }
        None => Err(StoreError::InvalidInput(format!("{field} is required"))),
    }
}

fn not_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StoreError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, TodoStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TodoStore::open(dir.path().join("todos.json")).unwrap();
        (dir, store)
    }

    /// A store whose data directory vanished after opening: every write fails.
    fn open_broken() -> (tempfile::TempDir, TodoStore) {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let store = TodoStore::open(data.join("todos.json")).unwrap();
        (dir, store)
    }

    fn break_storage(store: &TodoStore) {
        fs::remove_dir_all(store.path().parent().unwrap()).unwrap();
    }

    #[test]
    fn new_store_is_empty() {
        let (_dir, store) = open_temp();
        assert!(store.list().unwrap().is_empty());
        assert!(store.is_empty().unwrap());
        assert!(!store.path().exists());
    }

    #[test]
    fn create_assigns_sequential_ids_and_defaults() {
        let (_dir, store) = open_temp();
        let first = store.create(NewTodo::new("Buy milk", "2%")).unwrap();
        let second = store.create(NewTodo::new("Walk dog", "park")).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(!first.completed);
        assert_eq!(store.list().unwrap(), vec![first, second]);
    }

    #[test]
    fn create_rejects_missing_or_blank_fields() {
        let (_dir, store) = open_temp();

        let err = store.create(NewTodo::new("", "x")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));

        let err = store.create(NewTodo::new("x", "   ")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));

        let err = store
            .create(NewTodo {
                title: Some("x".to_string()),
                description: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));

        assert_eq!(store.len().unwrap(), 0);
        assert!(!store.path().exists());
    }

    #[test]
    fn get_finds_by_exact_id() {
        let (_dir, store) = open_temp();
        let created = store.create(NewTodo::new("a", "b")).unwrap();
        assert_eq!(store.get(created.id).unwrap(), created);
        assert!(matches!(store.get(42), Err(StoreError::NotFound(42))));
    }

    #[test]
    fn explicit_false_is_applied() {
        let (_dir, store) = open_temp();
        let todo = store.create(NewTodo::new("a", "b")).unwrap();
        store
            .update(
                todo.id,
                TodoPatch {
                    completed: Some(true),
                    ..TodoPatch::default()
                },
            )
            .unwrap();

        let updated = store
            .update(
                todo.id,
                TodoPatch {
                    completed: Some(false),
                    ..TodoPatch::default()
                },
            )
            .unwrap();
        assert!(!updated.completed);
        assert!(!store.get(todo.id).unwrap().completed);
    }

    #[test]
    fn empty_patch_is_invalid_and_changes_nothing() {
        let (_dir, store) = open_temp();
        let todo = store.create(NewTodo::new("a", "b")).unwrap();

        let err = store.update(todo.id, TodoPatch::default()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert_eq!(store.get(todo.id).unwrap(), todo);
    }

    #[test]
    fn update_unknown_id_is_not_found_before_empty_patch() {
        let (_dir, store) = open_temp();
        let err = store.update(9, TodoPatch::default()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(9)));
    }

    #[test]
    fn update_unknown_id_is_not_found_before_blank_field() {
        let (_dir, store) = open_temp();
        let err = store
            .update(
                999,
                TodoPatch {
                    title: Some(String::new()),
                    ..TodoPatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(999)));
    }

    #[test]
    fn update_rejects_blank_title() {
        let (_dir, store) = open_temp();
        let todo = store.create(NewTodo::new("a", "b")).unwrap();
        let err = store
            .update(
                todo.id,
                TodoPatch {
                    title: Some(String::new()),
                    completed: Some(true),
                    ..TodoPatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert_eq!(store.get(todo.id).unwrap(), todo);
    }

    #[test]
    fn deleted_ids_are_never_reused() {
        let (_dir, store) = open_temp();
        for i in 0..7 {
            store.create(NewTodo::new(format!("t{i}"), "d")).unwrap();
        }
        store.delete(7).unwrap();
        assert!(matches!(store.get(7), Err(StoreError::NotFound(7))));
        assert!(matches!(store.delete(7), Err(StoreError::NotFound(7))));

        let next = store.create(NewTodo::new("again", "d")).unwrap();
        assert_eq!(next.id, 8);
    }

    #[test]
    fn failed_create_rolls_back() {
        let (_dir, store) = open_broken();
        break_storage(&store);

        let err = store.create(NewTodo::new("a", "b")).unwrap_err();
        assert!(matches!(err, StoreError::StorageFailure(_)));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn failed_create_does_not_burn_an_id() {
        let (dir, store) = open_broken();
        break_storage(&store);
        store.create(NewTodo::new("a", "b")).unwrap_err();

        fs::create_dir_all(dir.path().join("data")).unwrap();
        let todo = store.create(NewTodo::new("a", "b")).unwrap();
        assert_eq!(todo.id, 1);
    }

    #[test]
    fn failed_update_restores_previous_record() {
        let (_dir, store) = open_broken();
        let todo = store.create(NewTodo::new("a", "b")).unwrap();
        break_storage(&store);

        let err = store
            .update(
                todo.id,
                TodoPatch {
                    title: Some("changed".to_string()),
                    completed: Some(true),
                    ..TodoPatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::StorageFailure(_)));
        assert_eq!(store.get(todo.id).unwrap(), todo);
    }

    #[test]
    fn failed_delete_restores_record_in_place() {
        let (_dir, store) = open_broken();
        let a = store.create(NewTodo::new("a", "1")).unwrap();
        let b = store.create(NewTodo::new("b", "2")).unwrap();
        let c = store.create(NewTodo::new("c", "3")).unwrap();
        break_storage(&store);

        let err = store.delete(b.id).unwrap_err();
        assert!(matches!(err, StoreError::StorageFailure(_)));
        assert_eq!(store.list().unwrap(), vec![a, b, c]);
    }

    #[test]
    fn reopen_reproduces_collection() {
        let (dir, store) = open_temp();
        store.create(NewTodo::new("a", "1")).unwrap();
        let b = store.create(NewTodo::new("b", "2")).unwrap();
        store
            .update(
                b.id,
                TodoPatch {
                    completed: Some(true),
                    ..TodoPatch::default()
                },
            )
            .unwrap();
        store.delete(1).unwrap();
        let before = store.list().unwrap();
        drop(store);

        let reopened = TodoStore::open(dir.path().join("todos.json")).unwrap();
        assert_eq!(reopened.list().unwrap(), before);
        assert_eq!(reopened.create(NewTodo::new("c", "3")).unwrap().id, 3);
    }

    #[test]
    fn exhausted_counter_fails_create_without_poisoning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        fs::write(&path, format!(r#"{{"next_id":{},"todos":[]}}"#, u64::MAX)).unwrap();
        let store = TodoStore::open(&path).unwrap();

        let err = store.create(NewTodo::new("a", "b")).unwrap_err();
        assert!(matches!(err, StoreError::StorageFailure(msg) if msg.contains("exhausted")));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn snapshot_with_max_id_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        fs::write(
            &path,
            format!(
                r#"[{{"id":{},"title":"t","description":"d","completed":false}}]"#,
                u64::MAX
            ),
        )
        .unwrap();

        let err = TodoStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::StorageFailure(_)));
    }

    #[test]
    fn corrupt_snapshot_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        fs::write(&path, "not json").unwrap();

        let err = TodoStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::StorageFailure(_)));
    }
}
