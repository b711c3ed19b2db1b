//! HTTP binding for the todo store.
//!
//! # Routes
//! - `GET /todos` — all todos in insertion order.
//! - `POST /todos` — create; `201` with the new record.
//! - `GET /todos/{id}` — one todo or `404`.
//! - `PUT /todos/{id}` — partial update; `400` when the body carries no field.
//! - `DELETE /todos/{id}` — `200` with a confirmation message.
//!
//! Anything else answers `404`. Store calls run on tokio's blocking pool:
//! they may fsync, and once started they run to completion even if the
//! client goes away.

use std::{future::Future, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use todo_core::{NewTodo, StoreError, Todo, TodoId, TodoPatch, TodoStore};

pub mod config;
pub mod error;

pub use config::Config;
pub use error::ApiError;

pub type Store = Arc<TodoStore>;

pub fn app(store: Store) -> Router {
    Router::new()
        .route(
            "/todos",
            get(list_todos).post(create_todo).fallback(not_found),
        )
        .route(
            "/todos/{id}",
            get(get_todo)
                .put(update_todo)
                .delete(delete_todo)
                .fallback(not_found),
        )
        .fallback(not_found)
        .with_state(store)
}

/// Serve `store` on `listener` until `shutdown` resolves.
pub async fn run<F>(listener: TcpListener, store: Store, shutdown: F) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app(store))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn list_todos(State(store): State<Store>) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = blocking(&store, |s| s.list()).await?;
    Ok(Json(todos))
}

async fn create_todo(
    State(store): State<Store>,
    input: Result<Json<NewTodo>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let Json(input) = input?;
    let todo = blocking(&store, move |s| s.create(input)).await?;
    tracing::info!(id = todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn get_todo(
    State(store): State<Store>,
    id: Result<Path<TodoId>, PathRejection>,
) -> Result<Json<Todo>, ApiError> {
    let Path(id) = id?;
    let todo = blocking(&store, move |s| s.get(id)).await?;
    Ok(Json(todo))
}

async fn update_todo(
    State(store): State<Store>,
    id: Result<Path<TodoId>, PathRejection>,
    patch: Result<Json<TodoPatch>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let Path(id) = id?;
    let Json(patch) = patch?;
    let todo = blocking(&store, move |s| s.update(id, patch)).await?;
    Ok(Json(todo))
}

async fn delete_todo(
    State(store): State<Store>,
    id: Result<Path<TodoId>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    blocking(&store, move |s| s.delete(id)).await?;
    tracing::info!(id, "todo deleted");
    Ok(Json(json!({ "message": "Todo deleted successfully" })))
}

async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// Run one store operation on the blocking pool.
async fn blocking<T, F>(store: &Store, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&TodoStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    Ok(tokio::task::spawn_blocking(move || op(&store)).await??)
}
