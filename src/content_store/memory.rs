//! In-memory content store implementation.
//!
//! Useful for testing and throwaway wizard sessions.

use super::{ContentStore, Document, DocumentType, Fields};
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use std::sync::RwLock;

/// In-memory content store. Keeps insertion order.
pub struct MemoryContentStore {
    documents: RwLock<Vec<Document>>,
}

impl MemoryContentStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
        }
    }

    fn poisoned<E: std::fmt::Display>(e: E) -> SyllabusError {
        SyllabusError::ContentStore(format!("Failed to acquire lock: {}", e))
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn create(&self, doc_type: DocumentType, fields: Fields) -> Result<Document> {
        let doc = Document::new(doc_type, fields);
        let mut docs = self.documents.write().map_err(Self::poisoned)?;
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn patch(&self, id: &str, set: Fields) -> Result<Document> {
        let mut docs = self.documents.write().map_err(Self::poisoned)?;
        let doc = docs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| SyllabusError::DocumentNotFound(id.to_string()))?;
        doc.apply_set(set);
        Ok(doc.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let docs = self.documents.read().map_err(Self::poisoned)?;
        Ok(docs.iter().find(|d| d.id == id).cloned())
    }

    async fn list(&self, doc_type: DocumentType) -> Result<Vec<Document>> {
        let docs = self.documents.read().map_err(Self::poisoned)?;
        Ok(docs.iter().filter(|d| d.doc_type == doc_type).cloned().collect())
    }

    async fn document_count(&self) -> Result<usize> {
        let docs = self.documents.read().map_err(Self::poisoned)?;
        Ok(docs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(title: &str) -> Fields {
        let mut f = Fields::new();
        f.insert("title".into(), json!(title));
        f
    }

    #[tokio::test]
    async fn test_memory_content_store() {
        let store = MemoryContentStore::new();

        let lesson = store.create(DocumentType::Lesson, fields("Borrowing")).await.unwrap();
        store.create(DocumentType::Module, fields("Memory")).await.unwrap();

        assert_eq!(store.document_count().await.unwrap(), 2);
        assert_eq!(store.list(DocumentType::Lesson).await.unwrap().len(), 1);

        let mut set = Fields::new();
        set.insert("content".into(), json!("# Borrowing"));
        let patched = store.patch(&lesson.id, set).await.unwrap();
        assert_eq!(patched.title(), Some("Borrowing"));
        assert_eq!(patched.text("content"), Some("# Borrowing"));
    }

    #[tokio::test]
    async fn test_patch_missing_document_does_not_create() {
        let store = MemoryContentStore::new();
        let err = store.patch("nope", fields("x")).await.unwrap_err();
        assert!(matches!(err, SyllabusError::DocumentNotFound(id) if id == "nope"));
        assert_eq!(store.document_count().await.unwrap(), 0);
    }
}
