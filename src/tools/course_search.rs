//! Catalog search used by the tutor agent.

use super::ToolFailure;
use crate::content_store::{ContentStore, Document, DocumentType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

const EXCERPT_CHARS: usize = 200;

/// Arguments for `searchCourses`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchCoursesArgs {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseSearchHit {
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub score: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseSearchResults {
    pub results: Vec<CourseSearchHit>,
    pub query: String,
}

/// Flatten lesson content into plain text, whether markdown or portable text.
fn content_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|b| b.get("children").and_then(Value::as_array))
            .flatten()
            .filter_map(|span| span.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}

/// Score a document: how many query terms occur in it, title hits counted twice.
fn score(doc: &Document, terms: &[String]) -> usize {
    let title = doc.title().unwrap_or_default().to_lowercase();
    let body = format!(
        "{} {}",
        doc.text("description").unwrap_or_default(),
        content_text(doc.fields.get("content"))
    )
    .to_lowercase();

    terms
        .iter()
        .map(|term| {
            let in_title = title.contains(term.as_str());
            let in_body = body.contains(term.as_str());
            match (in_title, in_body) {
                (true, _) => 2,
                (false, true) => 1,
                (false, false) => 0,
            }
        })
        .sum()
}

/// Search courses, modules and lessons in the content store.
pub async fn search_courses(
    store: &dyn ContentStore,
    args: &SearchCoursesArgs,
) -> Result<CourseSearchResults, ToolFailure> {
    let terms: Vec<String> = args
        .query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    if terms.is_empty() {
        return Err(ToolFailure::new("Search query must not be empty"));
    }

    let mut hits = Vec::new();
    for doc_type in [DocumentType::Course, DocumentType::Module, DocumentType::Lesson] {
        let docs = store
            .list(doc_type)
            .await
            .map_err(|e| ToolFailure::new(format!("Course search failed: {}", e)))?;

        for doc in docs {
            let score = score(&doc, &terms);
            if score == 0 {
                continue;
            }
            let url = match doc_type {
                DocumentType::Course => doc.slug().map(|s| format!("/courses/{}", s)),
                DocumentType::Lesson => doc.slug().map(|s| format!("/lessons/{}", s)),
                DocumentType::Module => None,
            };
            hits.push(CourseSearchHit {
                doc_type,
                title: doc.title().unwrap_or_default().to_string(),
                description: excerpt(doc.text("description").unwrap_or_default()),
                url,
                score,
                id: doc.id,
            });
        }
    }

    // Stable sort keeps catalog order among equal scores.
    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits.truncate(args.limit);

    info!("Course search '{}' matched {} documents", args.query, hits.len());

    Ok(CourseSearchResults {
        results: hits,
        query: args.query.clone(),
    })
}
