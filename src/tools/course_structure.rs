//! Persist an approved course outline as a course → modules → lessons graph.
//!
//! Creation is leaf-first: every lesson skeleton, then every module, then
//! the course. There is no rollback; a failure reports the ids that were
//! already written.

use super::ToolFailure;
use crate::content_store::{reference, slug_field, slugify, ContentStore, Document, DocumentType, Fields, Tier};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetAudience {
    Beginner,
    Intermediate,
    Advanced,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDescriptor {
    pub title: String,
    pub description: String,
    pub tier: Tier,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub target_audience: Option<TargetAudience>,
    /// Estimated hours to complete.
    #[serde(default)]
    pub estimated_duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModuleDescriptor {
    pub title: String,
    pub description: String,
    pub lessons: Vec<LessonDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LessonDescriptor {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Arguments for `createCourseStructure`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateCourseArgs {
    pub course: CourseDescriptor,
    pub modules: Vec<ModuleDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedRef {
    pub id: String,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedModule {
    pub id: String,
    pub title: String,
    pub lessons: Vec<CreatedRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureStats {
    pub total_modules: usize,
    pub total_lessons: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseStructure {
    pub course: CreatedRef,
    pub modules: Vec<CreatedModule>,
    pub stats: StructureStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedCourse {
    pub message: String,
    pub structure: CourseStructure,
}

/// Ids written so far, reported when a later step fails.
#[derive(Default)]
struct Written(Vec<String>);

impl Written {
    fn record(&mut self, docs: &[Document]) {
        self.0.extend(docs.iter().map(|d| d.id.clone()));
    }

    fn failure(&self, error: impl std::fmt::Display) -> ToolFailure {
        let mut message = format!("Failed to create course structure: {}", error);
        if !self.0.is_empty() {
            message.push_str(&format!(
                " ({} documents were already created: {})",
                self.0.len(),
                self.0.join(", ")
            ));
        }
        ToolFailure::new(message)
    }
}

/// Run a batch of creates concurrently. Successes are recorded even when a
/// sibling fails.
async fn create_batch(
    store: &dyn ContentStore,
    doc_type: DocumentType,
    batch: Vec<Fields>,
    written: &mut Written,
) -> Result<Vec<Document>, ToolFailure> {
    let results = join_all(batch.into_iter().map(|fields| store.create(doc_type, fields))).await;

    let mut created = Vec::with_capacity(results.len());
    let mut first_error = None;
    for result in results {
        match result {
            Ok(doc) => created.push(doc),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    written.record(&created);

    match first_error {
        Some(e) => Err(written.failure(e)),
        None => Ok(created),
    }
}

fn lesson_fields(lesson: &LessonDescriptor) -> Fields {
    let mut fields = Fields::new();
    fields.insert("title".into(), json!(lesson.title));
    fields.insert("description".into(), json!(lesson.description.clone().unwrap_or_default()));
    fields.insert("slug".into(), slug_field(&slugify(&lesson.title)));
    fields
}

fn course_fields(course: &CourseDescriptor, modules: &[Document]) -> Fields {
    let mut fields = Fields::new();
    fields.insert("title".into(), json!(course.title));
    fields.insert("description".into(), json!(course.description));
    fields.insert("slug".into(), slug_field(&slugify(&course.title)));
    fields.insert("tier".into(), json!(course.tier));
    fields.insert("featured".into(), json!(false));
    fields.insert(
        "modules".into(),
        json!(modules.iter().map(|m| reference(&m.id)).collect::<Vec<_>>()),
    );
    fields.insert("aiGenerated".into(), json!(true));
    if let Some(category) = &course.category_id {
        fields.insert("category".into(), reference(category));
    }
    if let Some(audience) = course.target_audience {
        fields.insert("targetAudience".into(), json!(audience));
    }
    if let Some(hours) = course.estimated_duration {
        fields.insert("estimatedDuration".into(), json!(hours));
    }
    fields
}

fn created_ref(doc: &Document) -> CreatedRef {
    CreatedRef {
        id: doc.id.clone(),
        title: doc.title().unwrap_or_default().to_string(),
        slug: doc.slug().unwrap_or_default().to_string(),
    }
}

/// Create the whole course hierarchy.
pub async fn create_course_structure(
    store: &dyn ContentStore,
    args: &CreateCourseArgs,
) -> Result<CreatedCourse, ToolFailure> {
    let mut written = Written::default();

    let lesson_batch: Vec<Fields> = args
        .modules
        .iter()
        .flat_map(|m| m.lessons.iter().map(lesson_fields))
        .collect();
    let lessons = create_batch(store, DocumentType::Lesson, lesson_batch, &mut written)
        .await
        .inspect_err(|e| warn!("{}", e))?;

    // Module i owns the contiguous slice of lessons that follows module i-1's.
    let mut slices = Vec::with_capacity(args.modules.len());
    let mut offset = 0;
    for module in &args.modules {
        let end = offset + module.lessons.len();
        slices.push(&lessons[offset..end]);
        offset = end;
    }

    let module_batch: Vec<Fields> = args
        .modules
        .iter()
        .zip(&slices)
        .map(|(module, owned)| {
            let mut fields = Fields::new();
            fields.insert("title".into(), json!(module.title));
            fields.insert("description".into(), json!(module.description));
            fields.insert(
                "lessons".into(),
                json!(owned.iter().map(|l| reference(&l.id)).collect::<Vec<_>>()),
            );
            fields
        })
        .collect();
    let modules = create_batch(store, DocumentType::Module, module_batch, &mut written)
        .await
        .inspect_err(|e| warn!("{}", e))?;

    let course = store
        .create(DocumentType::Course, course_fields(&args.course, &modules))
        .await
        .map_err(|e| written.failure(e))
        .inspect_err(|e| warn!("{}", e))?;

    info!(
        "Created course {} with {} modules and {} lessons",
        course.id,
        modules.len(),
        lessons.len()
    );

    let structure = CourseStructure {
        course: created_ref(&course),
        modules: modules
            .iter()
            .zip(&slices)
            .map(|(module, owned)| CreatedModule {
                id: module.id.clone(),
                title: module.title().unwrap_or_default().to_string(),
                lessons: owned.iter().map(created_ref).collect(),
            })
            .collect(),
        stats: StructureStats {
            total_modules: modules.len(),
            total_lessons: lessons.len(),
        },
    };

    Ok(CreatedCourse {
        message: format!(
            "Course \"{}\" created with {} modules and {} lessons",
            args.course.title,
            structure.stats.total_modules,
            structure.stats.total_lessons
        ),
        structure,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_store::MemoryContentStore;
    use crate::error::{Result, SyllabusError};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn args(lesson_counts: &[usize]) -> CreateCourseArgs {
        serde_json::from_value(json!({
            "course": {
                "title": "Intro to APIs!!",
                "description": "HTTP from the ground up",
                "tier": "pro",
                "targetAudience": "beginner"
            },
            "modules": lesson_counts.iter().enumerate().map(|(m, count)| json!({
                "title": format!("Module {}", m + 1),
                "description": "",
                "lessons": (0..*count).map(|l| json!({ "title": format!("Lesson {}.{}", m + 1, l + 1) })).collect::<Vec<_>>()
            })).collect::<Vec<_>>()
        }))
        .unwrap()
    }

    #[test]
    fn test_validation_rejects_bad_tier_and_missing_fields() {
        let bad_tier = json!({
            "course": { "title": "T", "description": "D", "tier": "platinum" },
            "modules": []
        });
        assert!(serde_json::from_value::<CreateCourseArgs>(bad_tier).is_err());

        let missing_modules = json!({ "course": { "title": "T", "description": "D", "tier": "free" } });
        assert!(serde_json::from_value::<CreateCourseArgs>(missing_modules).is_err());

        let optional_absent = json!({
            "course": { "title": "T", "description": "D", "tier": "free" },
            "modules": [{ "title": "M", "description": "", "lessons": [{ "title": "L" }] }]
        });
        let parsed: CreateCourseArgs = serde_json::from_value(optional_absent).unwrap();
        assert!(parsed.course.target_audience.is_none());
        assert!(parsed.modules[0].lessons[0].description.is_none());
    }

    #[tokio::test]
    async fn test_leaf_first_creation_and_slices() {
        let store = MemoryContentStore::new();
        let created = create_course_structure(&store, &args(&[3, 2])).await.unwrap();

        assert_eq!(created.structure.stats.total_modules, 2);
        assert_eq!(created.structure.stats.total_lessons, 5);
        assert_eq!(created.structure.course.slug, "intro-to-apis");

        let course = store.get(&created.structure.course.id).await.unwrap().unwrap();
        let module_ids = course.references("modules");
        assert_eq!(module_ids.len(), 2);
        assert_eq!(course.fields["aiGenerated"], json!(true));
        assert_eq!(course.fields["featured"], json!(false));
        assert_eq!(course.fields["tier"], json!("pro"));

        let first = store.get(&module_ids[0]).await.unwrap().unwrap().references("lessons");
        let second = store.get(&module_ids[1]).await.unwrap().unwrap().references("lessons");
        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 2);

        let all: HashSet<_> = first.iter().chain(second.iter()).collect();
        assert_eq!(all.len(), 5);

        // Lessons follow input order across modules.
        let lessons = store.list(DocumentType::Lesson).await.unwrap();
        let titles: Vec<_> = lessons.iter().map(|l| l.title().unwrap().to_string()).collect();
        assert_eq!(titles, vec!["Lesson 1.1", "Lesson 1.2", "Lesson 1.3", "Lesson 2.1", "Lesson 2.2"]);
        let first_title = store.get(&first[0]).await.unwrap().unwrap();
        assert_eq!(first_title.title(), Some("Lesson 1.1"));
        assert_eq!(first_title.slug(), Some("lesson-1-1"));
    }

    /// Store that fails every create after the first `limit`.
    struct FlakyStore {
        inner: MemoryContentStore,
        limit: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentStore for FlakyStore {
        async fn create(&self, doc_type: DocumentType, fields: Fields) -> Result<Document> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.limit {
                return Err(SyllabusError::ContentStore("quota exceeded".to_string()));
            }
            self.inner.create(doc_type, fields).await
        }
        async fn patch(&self, id: &str, set: Fields) -> Result<Document> {
            self.inner.patch(id, set).await
        }
        async fn get(&self, id: &str) -> Result<Option<Document>> {
            self.inner.get(id).await
        }
        async fn list(&self, doc_type: DocumentType) -> Result<Vec<Document>> {
            self.inner.list(doc_type).await
        }
        async fn document_count(&self) -> Result<usize> {
            self.inner.document_count().await
        }
    }

    #[tokio::test]
    async fn test_failure_reports_already_created_documents() {
        let store = FlakyStore {
            inner: MemoryContentStore::new(),
            limit: 5,
            calls: AtomicUsize::new(0),
        };

        let err = create_course_structure(&store, &args(&[3, 2])).await.unwrap_err();
        assert!(err.0.starts_with("Failed to create course structure:"));
        assert!(err.0.contains("quota exceeded"));
        assert!(err.0.contains("5 documents were already created"));

        // No rollback: the lessons stay.
        assert_eq!(store.document_count().await.unwrap(), 5);
        for lesson in store.list(DocumentType::Lesson).await.unwrap() {
            assert!(err.0.contains(&lesson.id));
        }
    }
}
