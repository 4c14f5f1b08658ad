use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Resource ---

/// Todo
///
/// The API representation of a single todo item. The identifier travels as a
/// 24-character hex string; the stored form lives in `repository::TodoDocument`.
///
/// Every field defaults, so `{}` is a valid create body. The server overwrites
/// `id` and `userid` on create, and update rejects a body where either is empty.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Todo {
    #[serde(default)]
    #[schema(example = "665f1c2e8b3e4a0012345678")]
    pub id: String,
    // Owning session principal.
    #[serde(default)]
    pub userid: String,
    #[serde(default)]
    #[schema(example = "buy milk")]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

// --- Response Payloads ---

/// CreatedResponse
///
/// Body of a successful create (201). `id` is the freshly generated identifier.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreatedResponse {
    pub success: String,
    pub id: String,
}

/// UpdatedResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdatedResponse {
    pub success: String,
    pub matched_count: u64,
    pub modified_count: u64,
}

/// DeletedResponse
///
/// Shared by the single delete and the clear-all endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DeletedResponse {
    pub success: String,
    pub deleted_count: u64,
}

/// ErrorResponse
///
/// Every non-2xx response from the todo routes carries this body.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}
