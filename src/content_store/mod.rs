//! Content store abstraction for Syllabus.
//!
//! Courses, modules and lessons are persisted as loosely-typed documents
//! keyed by id. Backends implement a small create/patch/get/list trait; the
//! course tools never assume transactions.

mod memory;
mod sanity;
mod sqlite;

pub use memory::MemoryContentStore;
pub use sanity::SanityContentStore;
pub use sqlite::SqliteContentStore;

use crate::config::{ContentStoreProvider, Settings};
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Field set of a document, excluding identity and timestamps.
pub type Fields = Map<String, Value>;

/// Kind of document in the course hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Course,
    Module,
    Lesson,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Course => "course",
            DocumentType::Module => "module",
            DocumentType::Lesson => "lesson",
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = SyllabusError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "course" => Ok(DocumentType::Course),
            "module" => Ok(DocumentType::Module),
            "lesson" => Ok(DocumentType::Lesson),
            other => Err(SyllabusError::ContentStore(format!(
                "Unknown document type: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription tier, used both as a course access level and a user plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
    Ultra,
}

impl Tier {
    /// Whether a user on `self` may open content gated at `required`.
    ///
    /// Ungated content is open to everyone, pro content needs pro or ultra,
    /// ultra content needs ultra.
    pub fn has_access(self, required: Option<Tier>) -> bool {
        match required {
            None | Some(Tier::Free) => true,
            Some(Tier::Pro) => matches!(self, Tier::Pro | Tier::Ultra),
            Some(Tier::Ultra) => self == Tier::Ultra,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Free => write!(f, "free"),
            Tier::Pro => write!(f, "pro"),
            Tier::Ultra => write!(f, "ultra"),
        }
    }
}

/// A document held by the content store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub doc_type: DocumentType,
    pub fields: Fields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document with a fresh id.
    pub fn new(doc_type: DocumentType, fields: Fields) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            doc_type,
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// Read a string field.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.text("title")
    }

    /// The `current` value of the `slug` field.
    pub fn slug(&self) -> Option<&str> {
        self.fields
            .get("slug")
            .and_then(|s| s.get("current"))
            .and_then(Value::as_str)
    }

    /// Ids referenced by an array-of-references field, in order.
    pub fn references(&self, key: &str) -> Vec<String> {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .map(|refs| {
                refs.iter()
                    .filter_map(|r| r.get("_ref").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Apply a set-patch: every key in `set` replaces the existing value.
    pub fn apply_set(&mut self, set: Fields) {
        for (key, value) in set {
            self.fields.insert(key, value);
        }
        self.updated_at = Utc::now();
    }
}

/// Reference value pointing at another document.
pub fn reference(id: &str) -> Value {
    json!({ "_type": "reference", "_ref": id })
}

/// Slug value wrapping a slug string.
pub fn slug_field(slug: &str) -> Value {
    json!({ "_type": "slug", "current": slug })
}

/// Derive a URL-friendly slug.
///
/// Lower-cases the input, collapses every run of characters outside
/// `[a-z0-9]` into one hyphen and trims hyphens at both ends.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Trait for document persistence backends.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Create a new document and return it with its assigned id.
    async fn create(&self, doc_type: DocumentType, fields: Fields) -> Result<Document>;

    /// Replace the given fields on an existing document.
    ///
    /// Never creates a document: a missing id is `DocumentNotFound`.
    async fn patch(&self, id: &str, set: Fields) -> Result<Document>;

    /// Fetch a document by id.
    async fn get(&self, id: &str) -> Result<Option<Document>>;

    /// List all documents of one type, oldest first.
    async fn list(&self, doc_type: DocumentType) -> Result<Vec<Document>>;

    /// Total number of documents of all types.
    async fn document_count(&self) -> Result<usize>;
}

/// Build the configured content store backend.
pub fn create_content_store(settings: &Settings) -> Result<Arc<dyn ContentStore>> {
    let store: Arc<dyn ContentStore> = match settings.content_store.provider {
        ContentStoreProvider::Memory => Arc::new(MemoryContentStore::new()),
        ContentStoreProvider::Sqlite => Arc::new(SqliteContentStore::new(&settings.sqlite_path())?),
        ContentStoreProvider::Sanity => {
            Arc::new(SanityContentStore::new(&settings.content_store.sanity)?)
        }
    };
    Ok(store)
}
