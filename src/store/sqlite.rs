use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{DocumentStore, Filter, FilterOp, InClause, StoreError};

/// `DocumentStore` backed by a single SQLite table of JSON bodies, keyed by
/// (collection, id). Predicates go through `json_extract` so filters apply
/// inside the database rather than after the fetch.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn sql_op(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => "=",
        FilterOp::Gte => ">=",
    }
}

fn parse_body(body: &str) -> Result<Value, StoreError> {
    serde_json::from_str(body)
        .map_err(|e| StoreError::Unavailable(format!("corrupt document body: {e}")))
}

fn merge_document(mut base: Value, changes: Value) -> Value {
    if let (Some(base_map), Value::Object(change_map)) = (base.as_object_mut(), changes) {
        for (key, value) in change_map {
            // Document ids are immutable.
            if key == "id" {
                continue;
            }
            base_map.insert(key, value);
        }
    }
    base
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert(&self, collection: &str, mut document: Value) -> Result<String, StoreError> {
        if !document.is_object() {
            return Err(StoreError::Unavailable(
                "document body must be a JSON object".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        document["id"] = Value::String(id.clone());

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)")
            .bind(collection)
            .bind(&id)
            .bind(document.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(id)
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Value, StoreError> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;

        match body {
            Some(body) => parse_body(&body),
            None => Err(StoreError::NotFound),
        }
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        in_clause: Option<&InClause>,
    ) -> Result<Vec<Value>, StoreError> {
        let mut sql = String::from("SELECT body FROM documents WHERE collection = ?");

        for filter in filters {
            sql.push_str(&format!(
                " AND json_extract(body, '$.{}') {} ?",
                filter.field,
                sql_op(filter.op)
            ));
        }

        if let Some(in_clause) = in_clause {
            let placeholders = vec!["?"; in_clause.values.len()].join(", ");
            sql.push_str(&format!(
                " AND json_extract(body, '$.{}') IN ({placeholders})",
                in_clause.field
            ));
        }

        sql.push_str(" ORDER BY rowid");

        let bind_values = filters
            .iter()
            .map(|filter| &filter.value)
            .chain(in_clause.into_iter().flat_map(|ic| ic.values.iter()));

        let mut query = sqlx::query_scalar::<_, String>(&sql).bind(collection.to_string());
        for value in bind_values {
            query = match value {
                Value::Null => query.bind(Option::<String>::None),
                Value::Bool(b) => query.bind(*b),
                Value::Number(n) if n.is_i64() => query.bind(n.as_i64().unwrap_or_default()),
                Value::Number(n) => query.bind(n.as_f64().unwrap_or_default()),
                Value::String(s) => query.bind(s.clone()),
                other => query.bind(other.to_string()),
            };
        }

        let bodies = query.fetch_all(&self.pool).await.map_err(backend)?;
        bodies.iter().map(|body| parse_body(body)).collect()
    }

    async fn update(&self, collection: &str, id: &str, changes: Value) -> Result<(), StoreError> {
        let current = self.get_by_id(collection, id).await?;
        let merged = merge_document(current, changes);

        sqlx::query("UPDATE documents SET body = ?1 WHERE collection = ?2 AND id = ?3")
            .bind(merged.to_string())
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    async fn setup_test_store() -> SqliteStore {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        SqliteStore::new(pool)
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_get_by_id_roundtrips() {
        let store = setup_test_store().await;

        let id = store
            .insert("courses", json!({"title": "Algebra", "status": "draft"}))
            .await
            .expect("Failed to insert");

        let doc = store.get_by_id("courses", &id).await.expect("Failed to get");
        assert_eq!(doc["id"], json!(id));
        assert_eq!(doc["title"], json!("Algebra"));
    }

    #[tokio::test]
    async fn test_get_by_id_missing_is_not_found() {
        let store = setup_test_store().await;

        let err = store.get_by_id("courses", "missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_query_applies_equality_and_range_filters() {
        let store = setup_test_store().await;

        store
            .insert("studentTasks", json!({"studentId": "s1", "dueDate": "2024-01-02T00:00:00Z"}))
            .await
            .expect("insert");
        store
            .insert("studentTasks", json!({"studentId": "s2", "dueDate": "2024-01-05T00:00:00Z"}))
            .await
            .expect("insert");

        let due = store
            .query(
                "studentTasks",
                &[Filter::gte("dueDate", "2024-01-03T00:00:00Z")],
                None,
            )
            .await
            .expect("query");
        assert_eq!(due.len(), 1);
        assert_eq!(due[0]["studentId"], json!("s2"));

        let by_student = store
            .query("studentTasks", &[Filter::eq("studentId", "s1")], None)
            .await
            .expect("query");
        assert_eq!(by_student.len(), 1);
    }

    #[tokio::test]
    async fn test_query_in_clause_matches_listed_ids() {
        let store = setup_test_store().await;

        let a = store
            .insert("users", json!({"email": "a@example.com"}))
            .await
            .expect("insert");
        let b = store
            .insert("users", json!({"email": "b@example.com"}))
            .await
            .expect("insert");
        store
            .insert("users", json!({"email": "c@example.com"}))
            .await
            .expect("insert");

        let in_clause = InClause {
            field: "id".to_string(),
            values: vec![json!(a), json!(b)],
        };
        let found = store
            .query("users", &[], Some(&in_clause))
            .await
            .expect("query");
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_query_returns_insertion_order() {
        let store = setup_test_store().await;

        let first = store
            .insert("enrollments", json!({"studentId": "s1"}))
            .await
            .expect("insert");
        let second = store
            .insert("enrollments", json!({"studentId": "s1"}))
            .await
            .expect("insert");

        let docs = store
            .query("enrollments", &[Filter::eq("studentId", "s1")], None)
            .await
            .expect("query");
        assert_eq!(docs[0]["id"], json!(first));
        assert_eq!(docs[1]["id"], json!(second));
    }

    #[tokio::test]
    async fn test_update_merges_partial_document() {
        let store = setup_test_store().await;

        let id = store
            .insert("courses", json!({"title": "Algebra", "accessCode": "AAAAAA", "status": "draft"}))
            .await
            .expect("insert");

        store
            .update("courses", &id, json!({"accessCode": "BBBBBB"}))
            .await
            .expect("update");

        let doc = store.get_by_id("courses", &id).await.expect("get");
        assert_eq!(doc["accessCode"], json!("BBBBBB"));
        // Unrelated fields and the id survive the merge.
        assert_eq!(doc["title"], json!("Algebra"));
        assert_eq!(doc["status"], json!("draft"));
        assert_eq!(doc["id"], json!(id));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = setup_test_store().await;

        let err = store
            .update("courses", "missing", json!({"accessCode": "BBBBBB"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
