//! SQLite-based content store implementation.
//!
//! Documents are stored as JSON field blobs in a single table. Each call is
//! its own statement; there is no cross-document transaction.

use super::{ContentStore, Document, DocumentType, Fields};
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    doc_type TEXT NOT NULL,
    fields TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_doc_type ON documents(doc_type);
"#;

/// SQLite-based content store.
pub struct SqliteContentStore {
    conn: Mutex<Connection>,
}

impl SqliteContentStore {
    /// Open (or create) a store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite content store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SyllabusError::ContentStore(format!("Failed to acquire lock: {}", e)))
    }

    fn select_by_id(conn: &Connection, id: &str) -> Result<Option<Document>> {
        let raw = conn
            .query_row(
                "SELECT id, doc_type, fields, created_at, updated_at FROM documents WHERE id = ?1",
                params![id],
                RawDocument::from_row,
            )
            .optional()?;
        raw.map(RawDocument::into_document).transpose()
    }
}

/// Row as stored, before JSON and timestamp decoding.
struct RawDocument {
    id: String,
    doc_type: String,
    fields: String,
    created_at: String,
    updated_at: String,
}

impl RawDocument {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            doc_type: row.get(1)?,
            fields: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn into_document(self) -> Result<Document> {
        Ok(Document {
            id: self.id,
            doc_type: self.doc_type.parse()?,
            fields: serde_json::from_str(&self.fields)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SyllabusError::ContentStore(format!("Invalid timestamp '{}': {}", value, e)))
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    #[instrument(skip(self, fields))]
    async fn create(&self, doc_type: DocumentType, fields: Fields) -> Result<Document> {
        let doc = Document::new(doc_type, fields);
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO documents (id, doc_type, fields, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                doc.id,
                doc.doc_type.as_str(),
                serde_json::to_string(&doc.fields)?,
                doc.created_at.to_rfc3339(),
                doc.updated_at.to_rfc3339(),
            ],
        )?;

        debug!("Created {} document {}", doc_type, doc.id);
        Ok(doc)
    }

    #[instrument(skip(self, set))]
    async fn patch(&self, id: &str, set: Fields) -> Result<Document> {
        let conn = self.lock()?;

        let mut doc = Self::select_by_id(&conn, id)?
            .ok_or_else(|| SyllabusError::DocumentNotFound(id.to_string()))?;
        doc.apply_set(set);

        conn.execute(
            "UPDATE documents SET fields = ?1, updated_at = ?2 WHERE id = ?3",
            params![
                serde_json::to_string(&doc.fields)?,
                doc.updated_at.to_rfc3339(),
                id
            ],
        )?;

        debug!("Patched document {}", id);
        Ok(doc)
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let conn = self.lock()?;
        Self::select_by_id(&conn, id)
    }

    async fn list(&self, doc_type: DocumentType) -> Result<Vec<Document>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, doc_type, fields, created_at, updated_at FROM documents WHERE doc_type = ?1 ORDER BY rowid",
        )?;

        let rows = stmt
            .query_map(params![doc_type.as_str()], RawDocument::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(RawDocument::into_document).collect()
    }

    async fn document_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(title: &str) -> Fields {
        let mut f = Fields::new();
        f.insert("title".into(), json!(title));
        f.insert("description".into(), json!(""));
        f
    }

    #[tokio::test]
    async fn test_create_get_list() {
        let store = SqliteContentStore::in_memory().unwrap();

        let a = store.create(DocumentType::Lesson, fields("A")).await.unwrap();
        let b = store.create(DocumentType::Lesson, fields("B")).await.unwrap();
        store.create(DocumentType::Course, fields("C")).await.unwrap();

        let lessons = store.list(DocumentType::Lesson).await.unwrap();
        assert_eq!(lessons.iter().map(|d| d.id.clone()).collect::<Vec<_>>(), vec![a.id.clone(), b.id]);

        let fetched = store.get(&a.id).await.unwrap().unwrap();
        assert_eq!(fetched.title(), Some("A"));
        assert_eq!(fetched.doc_type, DocumentType::Lesson);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_patch_keeps_untouched_fields_and_siblings() {
        let store = SqliteContentStore::in_memory().unwrap();
        let a = store.create(DocumentType::Lesson, fields("A")).await.unwrap();
        let b = store.create(DocumentType::Lesson, fields("B")).await.unwrap();

        let mut set = Fields::new();
        set.insert("content".into(), json!("body"));
        store.patch(&a.id, set).await.unwrap();

        let a = store.get(&a.id).await.unwrap().unwrap();
        assert_eq!(a.title(), Some("A"));
        assert_eq!(a.text("content"), Some("body"));

        let b_after = store.get(&b.id).await.unwrap().unwrap();
        assert_eq!(b_after, b);
    }

    #[tokio::test]
    async fn test_patch_missing_is_not_found() {
        let store = SqliteContentStore::in_memory().unwrap();
        let err = store.patch("stale-id", Fields::new()).await.unwrap_err();
        assert!(matches!(err, SyllabusError::DocumentNotFound(_)));
        assert_eq!(store.document_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("content.db");

        let id = {
            let store = SqliteContentStore::new(&path).unwrap();
            store.create(DocumentType::Course, fields("Rust")).await.unwrap().id
        };

        let reopened = SqliteContentStore::new(&path).unwrap();
        let doc = reopened.get(&id).await.unwrap().unwrap();
        assert_eq!(doc.title(), Some("Rust"));
    }
}
