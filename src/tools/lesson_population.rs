//! Attach rich content to an existing lesson skeleton.
//!
//! Both variants are strict patches: they never create a document, and an
//! unknown lesson id is reported as a failure.

use super::ToolFailure;
use crate::content_store::{ContentStore, Fields};
use crate::error::SyllabusError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Heading,
    Paragraph,
    List,
    Code,
}

/// A structured content block as produced by the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub text: String,
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Video,
    Article,
    Documentation,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

/// Kinds of external resource a structured lesson links to. Narrower than
/// [`ResourceType`]: no tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalResourceType {
    Video,
    Article,
    Documentation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalResource {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub resource_type: ExternalResourceType,
}

/// Arguments for `populateLesson`: structured blocks.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulateLessonArgs {
    pub lesson_id: String,
    pub description: String,
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub youtube_url: Option<String>,
    #[serde(default)]
    pub external_resources: Option<Vec<ExternalResource>>,
}

/// Arguments for `populateSingleLesson`: one markdown document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulateSingleLessonArgs {
    pub lesson_id: String,
    pub content: String,
    #[serde(default)]
    pub resources: Option<Vec<Resource>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content_blocks: usize,
    pub has_video: bool,
    pub external_resources_count: usize,
}

/// Result of either population variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedLesson {
    pub message: String,
    pub lesson_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson: Option<LessonSummary>,
}

fn text_block(style: &str, text: &str) -> Value {
    json!({
        "_type": "block",
        "style": style,
        "children": [{ "_type": "span", "text": text }],
    })
}

/// Convert structured blocks into portable-text blocks.
///
/// Lists expand to one bullet block per item; code becomes a normal block
/// whose single span carries the `code` mark.
pub fn to_portable_text(blocks: &[ContentBlock]) -> Vec<Value> {
    blocks
        .iter()
        .flat_map(|block| match block.block_type {
            BlockType::Heading => {
                vec![text_block(&format!("h{}", block.level.unwrap_or(2)), &block.text)]
            }
            BlockType::Paragraph => vec![text_block("normal", &block.text)],
            BlockType::List => block
                .items
                .iter()
                .flatten()
                .map(|item| {
                    let mut b = text_block("normal", item);
                    b["listItem"] = json!("bullet");
                    b
                })
                .collect(),
            BlockType::Code => vec![json!({
                "_type": "block",
                "style": "normal",
                "children": [{
                    "_type": "span",
                    "text": format!(
                        "[Code - {}]\n{}",
                        block.language.as_deref().unwrap_or("plain"),
                        block.text
                    ),
                    "marks": ["code"],
                }],
            })],
        })
        .collect()
}

fn not_found_or(error: SyllabusError, lesson_id: &str) -> ToolFailure {
    match error {
        SyllabusError::DocumentNotFound(_) => ToolFailure::new(format!(
            "Failed to populate lesson: lesson {} not found",
            lesson_id
        )),
        other => ToolFailure::new(format!("Failed to populate lesson: {}", other)),
    }
}

/// Patch a lesson with structured content, converted to portable text.
pub async fn populate_lesson(
    store: &dyn ContentStore,
    args: &PopulateLessonArgs,
) -> Result<PopulatedLesson, ToolFailure> {
    let blocks = to_portable_text(&args.content);
    let resources = args.external_resources.as_deref().unwrap_or_default();

    let mut set = Fields::new();
    set.insert("description".into(), json!(args.description));
    set.insert("content".into(), json!(blocks));
    if let Some(url) = args.youtube_url.as_deref().filter(|u| !u.is_empty()) {
        set.insert("youtubeUrl".into(), json!(url));
    }
    if !resources.is_empty() {
        set.insert("externalResources".into(), json!(resources));
    }

    let lesson = store
        .patch(&args.lesson_id, set)
        .await
        .map_err(|e| not_found_or(e, &args.lesson_id))
        .inspect_err(|e| warn!("{}", e))?;

    let title = lesson.title().unwrap_or_default().to_string();
    info!("Populated lesson {} with {} blocks", lesson.id, blocks.len());

    Ok(PopulatedLesson {
        message: format!("Successfully populated lesson: {}", title),
        lesson_id: lesson.id.clone(),
        lesson: Some(LessonSummary {
            id: lesson.id.clone(),
            title,
            description: lesson.text("description").unwrap_or_default().to_string(),
            content_blocks: blocks.len(),
            has_video: args.youtube_url.as_deref().is_some_and(|u| !u.is_empty()),
            external_resources_count: resources.len(),
        }),
    })
}

/// Patch a lesson with markdown content and resources.
pub async fn populate_single_lesson(
    store: &dyn ContentStore,
    args: &PopulateSingleLessonArgs,
) -> Result<PopulatedLesson, ToolFailure> {
    let mut set = Fields::new();
    set.insert("content".into(), json!(args.content));
    set.insert(
        "resources".into(),
        json!(args.resources.clone().unwrap_or_default()),
    );
    set.insert("updatedAt".into(), json!(Utc::now().to_rfc3339()));

    let lesson = store
        .patch(&args.lesson_id, set)
        .await
        .map_err(|e| not_found_or(e, &args.lesson_id))
        .inspect_err(|e| warn!("{}", e))?;

    info!("Populated lesson {} with markdown content", lesson.id);

    Ok(PopulatedLesson {
        message: format!(
            "Lesson \"{}\" populated successfully with {} characters of content",
            lesson.title().unwrap_or(&args.lesson_id),
            args.content.chars().count()
        ),
        lesson_id: lesson.id,
        lesson: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_store::{DocumentType, MemoryContentStore};

    fn block(value: Value) -> ContentBlock {
        serde_json::from_value(value).unwrap()
    }

    async fn seeded() -> (MemoryContentStore, String, String) {
        let store = MemoryContentStore::new();
        let mut a = Fields::new();
        a.insert("title".into(), json!("Ownership"));
        let mut b = Fields::new();
        b.insert("title".into(), json!("Borrowing"));
        let a = store.create(DocumentType::Lesson, a).await.unwrap();
        let b = store.create(DocumentType::Lesson, b).await.unwrap();
        (store, a.id, b.id)
    }

    #[test]
    fn test_portable_text_conversion() {
        let blocks = vec![
            block(json!({ "type": "heading", "text": "Intro" })),
            block(json!({ "type": "heading", "text": "Deep", "level": 3 })),
            block(json!({ "type": "paragraph", "text": "Hello" })),
            block(json!({ "type": "list", "text": "", "items": ["a", "b"] })),
            block(json!({ "type": "code", "text": "let x = 1;", "language": "rust" })),
            block(json!({ "type": "code", "text": "x" })),
        ];

        let pt = to_portable_text(&blocks);
        assert_eq!(pt.len(), 7);
        assert_eq!(pt[0]["style"], json!("h2"));
        assert_eq!(pt[1]["style"], json!("h3"));
        assert_eq!(pt[2]["style"], json!("normal"));
        assert_eq!(pt[3]["listItem"], json!("bullet"));
        assert_eq!(pt[4]["children"][0]["text"], json!("b"));
        assert_eq!(pt[5]["children"][0]["text"], json!("[Code - rust]\nlet x = 1;"));
        assert_eq!(pt[5]["children"][0]["marks"], json!(["code"]));
        assert_eq!(pt[6]["children"][0]["text"], json!("[Code - plain]\nx"));
    }

    #[test]
    fn test_block_type_must_be_known() {
        assert!(serde_json::from_value::<ContentBlock>(json!({ "type": "table", "text": "" })).is_err());
        assert!(serde_json::from_value::<PopulateSingleLessonArgs>(json!({ "content": "# x" })).is_err());
    }

    #[test]
    fn test_tool_resources_only_for_markdown_lessons() {
        let tool = json!([{ "title": "Playground", "url": "https://play.rust-lang.org", "type": "tool" }]);

        let structured = serde_json::from_value::<PopulateLessonArgs>(json!({
            "lessonId": "l1",
            "description": "d",
            "content": [],
            "externalResources": tool,
        }));
        assert!(structured.is_err());

        let markdown = serde_json::from_value::<PopulateSingleLessonArgs>(json!({
            "lessonId": "l1",
            "content": "# Ownership",
            "resources": tool,
        }))
        .unwrap();
        assert_eq!(markdown.resources.unwrap()[0].resource_type, ResourceType::Tool);
    }

    #[tokio::test]
    async fn test_populate_lesson_patches_only_target() {
        let (store, a, b) = seeded().await;
        let before_b = store.get(&b).await.unwrap().unwrap();

        let args: PopulateLessonArgs = serde_json::from_value(json!({
            "lessonId": a,
            "description": "Who owns what",
            "content": [{ "type": "paragraph", "text": "Every value has an owner." }],
            "youtubeUrl": "https://www.youtube.com/watch?v=abc",
            "externalResources": [{ "title": "Book", "url": "https://doc.rust-lang.org/book", "type": "documentation" }]
        }))
        .unwrap();

        let populated = populate_lesson(&store, &args).await.unwrap();
        let summary = populated.lesson.unwrap();
        assert_eq!(summary.title, "Ownership");
        assert_eq!(summary.content_blocks, 1);
        assert!(summary.has_video);
        assert_eq!(summary.external_resources_count, 1);

        let lesson = store.get(&a).await.unwrap().unwrap();
        assert_eq!(lesson.text("description"), Some("Who owns what"));
        assert_eq!(lesson.text("youtubeUrl"), Some("https://www.youtube.com/watch?v=abc"));
        assert_eq!(store.get(&b).await.unwrap().unwrap(), before_b);
    }

    #[tokio::test]
    async fn test_populate_single_lesson_sets_markdown() {
        let (store, a, _) = seeded().await;
        let args = PopulateSingleLessonArgs {
            lesson_id: a.clone(),
            content: "# Ownership".to_string(),
            resources: None,
        };

        let populated = populate_single_lesson(&store, &args).await.unwrap();
        assert!(populated.message.contains("Ownership"));
        assert!(populated.message.contains("11 characters"));

        let lesson = store.get(&a).await.unwrap().unwrap();
        assert_eq!(lesson.text("content"), Some("# Ownership"));
        assert_eq!(lesson.fields["resources"], json!([]));
        assert!(lesson.text("updatedAt").is_some());
    }

    #[tokio::test]
    async fn test_stale_id_is_not_found_and_creates_nothing() {
        let (store, _, _) = seeded().await;
        let args = PopulateSingleLessonArgs {
            lesson_id: "stale-id".to_string(),
            content: "text".to_string(),
            resources: None,
        };

        let err = populate_single_lesson(&store, &args).await.unwrap_err();
        assert!(err.0.contains("not found"));
        assert_eq!(store.document_count().await.unwrap(), 2);
    }
}
