use crate::models::Todo;
use async_trait::async_trait;
use mongodb::{
    Client, Collection,
    bson::{self, Document, doc, oid::ObjectId},
};
use serde::{Deserialize, Serialize};
use std::{
    future::Future,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use thiserror::Error;

/// StoreError
///
/// Operational failures of the document store. Every variant surfaces to the
/// client as a 500; the detail only reaches the logs.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mongodb error: {0}")]
    Backend(#[from] mongodb::error::Error),
    #[error("failed to encode todo: {0}")]
    Encode(#[from] bson::ser::Error),
    #[error("failed to decode todo: {0}")]
    Decode(#[from] bson::de::Error),
    #[error("store call exceeded {0:?}")]
    Timeout(Duration),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// TodoDocument
///
/// The stored shape of a todo in the `todos` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TodoDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub userid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl From<TodoDocument> for Todo {
    fn from(doc: TodoDocument) -> Self {
        Todo {
            id: doc.id.to_hex(),
            userid: doc.userid,
            title: doc.title,
            completed: doc.completed,
        }
    }
}

impl TryFrom<Todo> for TodoDocument {
    type Error = bson::oid::Error;

    fn try_from(todo: Todo) -> Result<Self, Self::Error> {
        Ok(TodoDocument {
            id: ObjectId::parse_str(&todo.id)?,
            userid: todo.userid,
            title: todo.title,
            completed: todo.completed,
        })
    }
}

/// Matched/modified counts of a field-set update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// TodoRepository
///
/// Contract for the document store behind the todo handlers. Every method is a
/// single store call. Mutating calls are scoped by `userid`; `find_one` is the
/// only lookup by identifier alone.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    async fn find_one(&self, id: ObjectId) -> StoreResult<Option<TodoDocument>>;

    /// All todos owned by `userid`, in the store's natural order. A record that
    /// fails to decode fails the whole call.
    async fn find_by_user(&self, userid: &str) -> StoreResult<Vec<TodoDocument>>;

    async fn insert_one(&self, todo: TodoDocument) -> StoreResult<ObjectId>;

    /// `$set` every field of `todo` except `_id` on the record matching
    /// `(todo.id, todo.userid)`.
    async fn update_one(&self, todo: TodoDocument) -> StoreResult<UpdateOutcome>;

    async fn delete_one(&self, id: ObjectId, userid: &str) -> StoreResult<u64>;

    async fn delete_many(&self, userid: &str) -> StoreResult<u64>;
}

/// RepositoryState
///
/// Shared handle to the store, injected into handlers through `AppState`.
pub type RepositoryState = Arc<dyn TodoRepository>;

/// with_deadline
///
/// Bounds a store call by `limit`. Expiry is reported as `StoreError::Timeout`.
pub async fn with_deadline<T, F>(limit: Duration, call: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

// --- MongoDB ---

/// MongoTodoRepository
///
/// Production store backed by a MongoDB collection. The driver's `Collection`
/// is a cheap, thread-safe handle over the client's connection pool.
#[derive(Clone)]
pub struct MongoTodoRepository {
    collection: Collection<TodoDocument>,
}

impl MongoTodoRepository {
    pub const COLLECTION: &'static str = "todos";

    pub fn new(collection: Collection<TodoDocument>) -> Self {
        Self { collection }
    }

    /// Builds a client from `uri` and opens the `todos` collection in `database`.
    /// The driver connects lazily; this does not wait for the server.
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self::new(
            client.database(database).collection(Self::COLLECTION),
        ))
    }
}

#[async_trait]
impl TodoRepository for MongoTodoRepository {
    async fn find_one(&self, id: ObjectId) -> StoreResult<Option<TodoDocument>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_user(&self, userid: &str) -> StoreResult<Vec<TodoDocument>> {
        let mut cursor = self.collection.find(doc! { "userid": userid }).await?;

        // The driver reports a bad document as a deserialization error on that
        // row; `?` abandons the rows collected so far.
        let mut todos = Vec::new();
        while cursor.advance().await? {
            todos.push(cursor.deserialize_current()?);
        }
        Ok(todos)
    }

    async fn insert_one(&self, todo: TodoDocument) -> StoreResult<ObjectId> {
        self.collection.insert_one(&todo).await?;
        tracing::debug!(id = %todo.id, userid = %todo.userid, "inserted todo");
        Ok(todo.id)
    }

    async fn update_one(&self, todo: TodoDocument) -> StoreResult<UpdateOutcome> {
        let mut fields = bson::to_document(&todo)?;
        fields.remove("_id");

        let result = self
            .collection
            .update_one(
                doc! { "_id": todo.id, "userid": todo.userid.as_str() },
                doc! { "$set": fields },
            )
            .await?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, id: ObjectId, userid: &str) -> StoreResult<u64> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id, "userid": userid })
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, userid: &str) -> StoreResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "userid": userid })
            .await?;
        Ok(result.deleted_count)
    }
}

// --- In-Memory (tests and local experiments) ---

/// InMemoryTodoRepository
///
/// A process-local store with the same filter semantics as the MongoDB one.
/// Records are kept as raw BSON in insertion order and decoded on read, so a
/// malformed record fails a read the way a bad document fails a cursor.
/// `new_failing` makes every call fail, and `with_latency` delays every call,
/// for exercising the error and deadline paths.
#[derive(Default)]
pub struct InMemoryTodoRepository {
    todos: Mutex<Vec<Document>>,
    calls: AtomicUsize,
    should_fail: bool,
    latency: Option<Duration>,
}

impl InMemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Seeds a record directly, bypassing the call counter.
    pub fn seed(&self, todo: TodoDocument) -> StoreResult<()> {
        self.seed_raw(bson::to_document(&todo)?);
        Ok(())
    }

    /// Seeds an arbitrary document, including ones that do not decode as a todo.
    pub fn seed_raw(&self, document: Document) {
        self.lock().push(document);
    }

    /// Number of store calls issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Document>> {
        // A poisoned lock only means another test thread panicked mid-call.
        self.todos.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn enter(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.should_fail {
            return Err(StoreError::Unavailable(
                "in-memory store set to fail".to_string(),
            ));
        }
        Ok(())
    }
}

fn has_id(document: &Document, id: ObjectId) -> bool {
    document.get_object_id("_id").ok() == Some(id)
}

fn owned_by(document: &Document, userid: &str) -> bool {
    document.get_str("userid").ok() == Some(userid)
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn find_one(&self, id: ObjectId) -> StoreResult<Option<TodoDocument>> {
        self.enter().await?;
        let found = self.lock().iter().find(|d| has_id(d, id)).cloned();
        match found {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    async fn find_by_user(&self, userid: &str) -> StoreResult<Vec<TodoDocument>> {
        self.enter().await?;
        let matching: Vec<Document> = self
            .lock()
            .iter()
            .filter(|d| owned_by(d, userid))
            .cloned()
            .collect();

        // First bad record fails the whole read.
        matching
            .into_iter()
            .map(|document| bson::from_document::<TodoDocument>(document).map_err(StoreError::from))
            .collect()
    }

    async fn insert_one(&self, todo: TodoDocument) -> StoreResult<ObjectId> {
        self.enter().await?;
        let id = todo.id;
        let document = bson::to_document(&todo)?;
        self.lock().push(document);
        Ok(id)
    }

    async fn update_one(&self, todo: TodoDocument) -> StoreResult<UpdateOutcome> {
        self.enter().await?;
        let mut fields = bson::to_document(&todo)?;
        fields.remove("_id");

        let mut todos = self.lock();
        let Some(existing) = todos
            .iter_mut()
            .find(|d| has_id(d, todo.id) && owned_by(d, &todo.userid))
        else {
            return Ok(UpdateOutcome::default());
        };

        // $set: overwrite the listed fields, leave the rest alone.
        let mut modified = 0;
        for (key, value) in fields {
            if existing.get(&key) != Some(&value) {
                existing.insert(key, value);
                modified = 1;
            }
        }
        Ok(UpdateOutcome {
            matched: 1,
            modified,
        })
    }

    async fn delete_one(&self, id: ObjectId, userid: &str) -> StoreResult<u64> {
        self.enter().await?;
        let mut todos = self.lock();
        match todos
            .iter()
            .position(|d| has_id(d, id) && owned_by(d, userid))
        {
            Some(index) => {
                todos.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, userid: &str) -> StoreResult<u64> {
        self.enter().await?;
        let mut todos = self.lock();
        let before = todos.len();
        todos.retain(|d| !owned_by(d, userid));
        Ok((before - todos.len()) as u64)
    }
}
