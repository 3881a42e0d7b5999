mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Collection names shared by the services and the store implementations.
pub mod collections {
    pub const COURSES: &str = "courses";
    pub const ENROLLMENTS: &str = "enrollments";
    pub const STUDENT_TASKS: &str = "studentTasks";
    pub const USERS: &str = "users";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
}

/// Equality/range predicate over a top-level document field.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Gte,
            value: value.into(),
        }
    }
}

/// In-list predicate, used for batched id lookups.
#[derive(Debug, Clone)]
pub struct InClause {
    pub field: String,
    pub values: Vec<Value>,
}

/// Narrow read/write contract over the document database. Everything the
/// services persist or read goes through this trait; the backing technology
/// stays swappable.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document and returns its freshly assigned id. The id is
    /// also injected into the stored body under the `id` key.
    async fn insert(&self, collection: &str, document: Value) -> Result<String, StoreError>;

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Value, StoreError>;

    /// Returns documents matching all filters (and the in-clause, if given),
    /// in the store's natural insertion order.
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        in_clause: Option<&InClause>,
    ) -> Result<Vec<Value>, StoreError>;

    /// Merges `changes` over the stored body, top-level key by key.
    /// Fails with `NotFound` if the id is absent.
    async fn update(&self, collection: &str, id: &str, changes: Value) -> Result<(), StoreError>;
}

/// Store stub whose every call fails. Lets tests exercise the degraded
/// paths without a broken database.
pub struct UnavailableStore;

impl UnavailableStore {
    fn offline<T>() -> Result<T, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }
}

#[async_trait]
impl DocumentStore for UnavailableStore {
    async fn insert(&self, _collection: &str, _document: Value) -> Result<String, StoreError> {
        Self::offline()
    }

    async fn get_by_id(&self, _collection: &str, _id: &str) -> Result<Value, StoreError> {
        Self::offline()
    }

    async fn query(
        &self,
        _collection: &str,
        _filters: &[Filter],
        _in_clause: Option<&InClause>,
    ) -> Result<Vec<Value>, StoreError> {
        Self::offline()
    }

    async fn update(&self, _collection: &str, _id: &str, _changes: Value) -> Result<(), StoreError> {
        Self::offline()
    }
}
