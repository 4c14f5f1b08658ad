use crate::{
    AppState,
    auth::Session,
    error::ApiError,
    models::{CreatedResponse, DeletedResponse, ErrorResponse, Todo, UpdatedResponse},
    repository::{TodoDocument, with_deadline},
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use mongodb::bson::oid::ObjectId;

// --- Input Helpers ---

fn parse_todo_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest("Invalid todo ID format"))
}

fn require_body(payload: Result<Json<Todo>, JsonRejection>) -> Result<Todo, ApiError> {
    match payload {
        Ok(Json(todo)) => Ok(todo),
        Err(rejection) => {
            tracing::debug!(%rejection, "rejected todo body");
            Err(ApiError::BadRequest("Invalid request body"))
        }
    }
}

// --- Handlers ---

/// get_todo
///
/// [Authenticated Route] Fetches a single todo by identifier.
///
/// *Authorization*: Any valid session. The lookup is by `_id` alone, so
/// ownership is not checked here, unlike update and delete.
#[utoipa::path(
    get,
    path = "/todo/{id}",
    params(("id" = String, Path, description = "Todo ID (24-char hex)")),
    responses(
        (status = 200, description = "Found", body = Todo),
        (status = 400, description = "Malformed ID", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_todo(
    _session: Session,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    let id = parse_todo_id(&id)?;

    let found = with_deadline(state.config.store_timeout, state.repo.find_one(id))
        .await
        .map_err(ApiError::store("Failed to fetch todo"))?;

    match found {
        Some(todo) => Ok(Json(todo.into())),
        None => Err(ApiError::NotFound("Todo not found")),
    }
}

/// get_todos
///
/// [Authenticated Route] Lists every todo owned by `userid`. An unknown or
/// empty user yields `[]`. One unreadable record fails the whole list.
#[utoipa::path(
    get,
    path = "/todos/{userid}",
    params(("userid" = String, Path, description = "Owning user")),
    responses(
        (status = 200, description = "Todos of the user", body = [Todo]),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub async fn get_todos(
    _session: Session,
    State(state): State<AppState>,
    Path(userid): Path<String>,
) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = with_deadline(state.config.store_timeout, state.repo.find_by_user(&userid))
        .await
        .map_err(ApiError::store("Failed to fetch todos"))?;

    Ok(Json(todos.into_iter().map(Todo::from).collect()))
}

/// add_todo
///
/// [Authenticated Route] Creates a todo for `userid`. Any `id` or `userid`
/// in the body is discarded: the identifier is generated here and the owner
/// comes from the route.
#[utoipa::path(
    post,
    path = "/todos/{userid}",
    params(("userid" = String, Path, description = "Owning user")),
    request_body = Todo,
    responses(
        (status = 201, description = "Created", body = CreatedResponse),
        (status = 400, description = "Missing user or bad body", body = ErrorResponse)
    )
)]
pub async fn add_todo(
    session: Session,
    State(state): State<AppState>,
    Path(userid): Path<String>,
    payload: Result<Json<Todo>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    // 1. Owner comes from the route
    if userid.is_empty() {
        return Err(ApiError::BadRequest("User ID is required"));
    }
    let todo = require_body(payload)?;

    // 2. Fresh identifier; client-supplied id and userid are dropped
    let document = TodoDocument {
        id: ObjectId::new(),
        userid,
        title: todo.title,
        completed: todo.completed,
    };

    // 3. Persist
    let id = with_deadline(state.config.store_timeout, state.repo.insert_one(document))
        .await
        .map_err(ApiError::store("Failed to create todo"))?;

    tracing::info!(%id, session = %session.user_id, "todo created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            success: "Todo created successfully".to_string(),
            id: id.to_hex(),
        }),
    ))
}

/// update_todo
///
/// [Authenticated Route] Overwrites the fields of an existing todo.
///
/// *Authorization*: The body must carry both `id` and `userid`, and the
/// repository filters on the pair, so a todo owned by someone else reads as
/// not found.
#[utoipa::path(
    put,
    path = "/todo",
    request_body = Todo,
    responses(
        (status = 200, description = "Updated", body = UpdatedResponse),
        (status = 400, description = "Bad body or missing ID/user", body = ErrorResponse),
        (status = 404, description = "Not found or not owned by user", body = ErrorResponse)
    )
)]
pub async fn update_todo(
    session: Session,
    State(state): State<AppState>,
    payload: Result<Json<Todo>, JsonRejection>,
) -> Result<Json<UpdatedResponse>, ApiError> {
    // 1. Body shape
    let todo = require_body(payload)?;

    // 2. Both halves of the ownership filter must be present
    if todo.id.is_empty() || todo.userid.is_empty() {
        return Err(ApiError::BadRequest("Todo ID and User ID are required"));
    }
    let document =
        TodoDocument::try_from(todo).map_err(|_| ApiError::BadRequest("Invalid request body"))?;
    // The all-zero ObjectId is the unset value.
    if document.id == ObjectId::from_bytes([0; 12]) {
        return Err(ApiError::BadRequest("Todo ID and User ID are required"));
    }

    // 3. Scoped update; zero matches means missing or foreign
    let id = document.id;
    let outcome = with_deadline(state.config.store_timeout, state.repo.update_one(document))
        .await
        .map_err(ApiError::store("Failed to update todo"))?;

    if outcome.matched == 0 {
        return Err(ApiError::NotFound("Todo not found or not owned by user"));
    }

    tracing::info!(%id, session = %session.user_id, modified = outcome.modified, "todo updated");

    Ok(Json(UpdatedResponse {
        success: "Todo updated successfully".to_string(),
        matched_count: outcome.matched,
        modified_count: outcome.modified,
    }))
}

/// delete_todo
///
/// [Authenticated Route] Deletes one todo.
///
/// *Authorization*: Scoped to the **Owner** named in the route.
#[utoipa::path(
    delete,
    path = "/todos/{userid}/{id}",
    params(
        ("userid" = String, Path, description = "Owning user"),
        ("id" = String, Path, description = "Todo ID (24-char hex)")
    ),
    responses(
        (status = 200, description = "Deleted", body = DeletedResponse),
        (status = 400, description = "Missing or malformed ID", body = ErrorResponse),
        (status = 404, description = "Not found or not owned by user", body = ErrorResponse)
    )
)]
pub async fn delete_todo(
    session: Session,
    State(state): State<AppState>,
    Path((userid, id)): Path<(String, String)>,
) -> Result<Json<DeletedResponse>, ApiError> {
    if id.is_empty() || userid.is_empty() {
        return Err(ApiError::BadRequest("Todo ID and User ID are required"));
    }
    let id = parse_todo_id(&id)?;

    let deleted = with_deadline(state.config.store_timeout, state.repo.delete_one(id, &userid))
        .await
        .map_err(ApiError::store("Failed to delete todo"))?;

    if deleted == 0 {
        return Err(ApiError::NotFound("Todo not found or not owned by user"));
    }

    tracing::info!(%id, session = %session.user_id, "todo deleted");

    Ok(Json(DeletedResponse {
        success: "Todo deleted successfully".to_string(),
        deleted_count: deleted,
    }))
}

/// clear_todos
///
/// [Authenticated Route] Deletes every todo owned by `userid`. Clearing an
/// empty list is a success with a zero count.
#[utoipa::path(
    delete,
    path = "/todos/{userid}",
    params(("userid" = String, Path, description = "Owning user")),
    responses(
        (status = 200, description = "Cleared", body = DeletedResponse),
        (status = 400, description = "Missing user", body = ErrorResponse)
    )
)]
pub async fn clear_todos(
    session: Session,
    State(state): State<AppState>,
    Path(userid): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    if userid.is_empty() {
        return Err(ApiError::BadRequest("User ID is required"));
    }

    let deleted = with_deadline(state.config.store_timeout, state.repo.delete_many(&userid))
        .await
        .map_err(ApiError::store("Failed to delete todos"))?;

    tracing::info!(%userid, session = %session.user_id, deleted, "todos cleared");

    Ok(Json(DeletedResponse {
        success: "All todos deleted".to_string(),
        deleted_count: deleted,
    }))
}
