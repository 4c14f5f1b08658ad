use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get},
};

/// Authenticated Router Module
///
/// The todo resource. Every handler validates the session before it parses
/// input or touches the store.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /todo/{id}
        // Single todo by identifier. Not scoped by owner.
        .route("/todo/{id}", get(handlers::get_todo))
        // PUT|PATCH /todo
        // Field-set update; the body carries `id` and `userid`.
        .route(
            "/todo",
            axum::routing::put(handlers::update_todo).patch(handlers::update_todo),
        )
        // GET|POST|DELETE /todos/{userid}
        // List, create, and clear the todos of one user.
        .route(
            "/todos/{userid}",
            get(handlers::get_todos)
                .post(handlers::add_todo)
                .delete(handlers::clear_todos),
        )
        // DELETE /todos/{userid}/{id}
        // Delete one todo, scoped to its owner.
        .route("/todos/{userid}/{id}", delete(handlers::delete_todo))
}
