//! Tool executors the agents can call.
//!
//! Every executor takes already-validated arguments and returns a tagged
//! outcome. Failures are values, never errors thrown past the tool boundary,
//! so the agent loop can hand them back to the model.

pub mod course_search;
pub mod course_structure;
pub mod lesson_population;
pub mod video_search;
pub mod web_research;

pub use course_search::{search_courses, CourseSearchHit, SearchCoursesArgs};
pub use course_structure::{create_course_structure, CourseStructure, CreateCourseArgs, CreatedCourse};
pub use lesson_population::{
    populate_lesson, populate_single_lesson, to_portable_text, ContentBlock, PopulateLessonArgs,
    PopulateSingleLessonArgs, PopulatedLesson,
};
pub use video_search::{format_duration, parse_iso_duration, VideoSearchArgs, VideoSearcher};
pub use web_research::{ResearchOutcome, WebResearchArgs, WebResearcher};

use serde::Serialize;
use serde_json::{json, Map, Value};

/// Payload handed back to the model for one tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub payload: Value,
}

impl ToolResult {
    /// Successful result. Object payloads gain `"success": true`.
    pub fn ok<T: Serialize>(value: &T) -> Self {
        let payload = match serde_json::to_value(value) {
            Ok(Value::Object(mut map)) => {
                map.insert("success".to_string(), Value::Bool(true));
                Value::Object(map)
            }
            Ok(other) => json!({ "success": true, "result": other }),
            Err(e) => return Self::failure(format!("Failed to encode tool result: {}", e)),
        };
        Self {
            success: true,
            payload,
        }
    }

    /// Failed result carrying only an error message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self::failure_with(error, Map::new())
    }

    /// Failed result with extra keys, e.g. an empty result list.
    pub fn failure_with(error: impl Into<String>, extra: Map<String, Value>) -> Self {
        let mut map = extra;
        map.insert("success".to_string(), Value::Bool(false));
        map.insert("error".to_string(), Value::String(error.into()));
        Self {
            success: false,
            payload: Value::Object(map),
        }
    }

    /// The error message of a failed result.
    pub fn error(&self) -> Option<&str> {
        self.payload.get("error").and_then(Value::as_str)
    }
}

/// Failure message from a tool executor.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolFailure(pub String);

impl ToolFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_marks_object_payloads() {
        let result = ToolResult::ok(&json!({ "videos": [] }));
        assert!(result.success);
        assert_eq!(result.payload["success"], json!(true));
        assert_eq!(result.payload["videos"], json!([]));
    }

    #[test]
    fn test_failure_with_extra_keys() {
        let mut extra = Map::new();
        extra.insert("results".to_string(), json!([]));
        let result = ToolResult::failure_with("boom", extra);
        assert!(!result.success);
        assert_eq!(result.error(), Some("boom"));
        assert_eq!(result.payload["results"], json!([]));
    }
}
