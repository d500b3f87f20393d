//! Tool definitions, argument parsing and dispatch for the agents.

use crate::config::Settings;
use crate::content_store::ContentStore;
use crate::error::{Result, SyllabusError};
use crate::tools::{
    create_course_structure, populate_lesson, populate_single_lesson, search_courses,
    CreateCourseArgs, PopulateLessonArgs, PopulateSingleLessonArgs, SearchCoursesArgs, ToolResult,
    VideoSearchArgs, VideoSearcher, WebResearchArgs, WebResearcher,
};
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use serde_json::{json, Value};
use std::sync::Arc;

/// Tools known to the system. Each agent enables a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    WebResearch,
    YoutubeSearch,
    CreateCourseStructure,
    PopulateLesson,
    PopulateSingleLesson,
    SearchCourses,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::WebResearch,
        ToolKind::YoutubeSearch,
        ToolKind::CreateCourseStructure,
        ToolKind::PopulateLesson,
        ToolKind::PopulateSingleLesson,
        ToolKind::SearchCourses,
    ];

    /// Wire name the model calls the tool by.
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::WebResearch => "webResearch",
            ToolKind::YoutubeSearch => "youtubeSearch",
            ToolKind::CreateCourseStructure => "createCourseStructure",
            ToolKind::PopulateLesson => "populateLesson",
            ToolKind::PopulateSingleLesson => "populateSingleLesson",
            ToolKind::SearchCourses => "searchCourses",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    fn description(&self) -> &'static str {
        match self {
            ToolKind::WebResearch => {
                "Research a topic on the web to find current best practices, learning \
                 resources and key concepts. Use during the research stage."
            }
            ToolKind::YoutubeSearch => {
                "Search YouTube for embeddable educational videos on a topic. Returns \
                 titles, channels, durations and embed URLs."
            }
            ToolKind::CreateCourseStructure => {
                "Create the full course structure (course, modules and lesson skeletons) \
                 in the content store. Call exactly once, after the user types 'finalize'."
            }
            ToolKind::PopulateLesson => {
                "Populate a lesson with a description, formatted content blocks and an \
                 optional video. Fill in lessons ONE AT A TIME to avoid token limits."
            }
            ToolKind::PopulateSingleLesson => {
                "Populate a SINGLE lesson with detailed markdown content. Use this to add \
                 content one lesson at a time."
            }
            ToolKind::SearchCourses => {
                "Search the course catalog for courses, modules and lessons relevant to \
                 the student's question. Returns titles, excerpts and links."
            }
        }
    }

    fn parameters(&self) -> Value {
        let resource_types = match self {
            ToolKind::PopulateSingleLesson => json!(["video", "article", "documentation", "tool"]),
            _ => json!(["video", "article", "documentation"]),
        };

        match self {
            ToolKind::WebResearch => json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The topic to research" },
                    "maxResults": {
                        "type": "integer",
                        "description": "Maximum number of results (default: 5)",
                        "default": 5
                    }
                },
                "required": ["query"]
            }),
            ToolKind::YoutubeSearch => json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query for videos" },
                    "maxResults": {
                        "type": "integer",
                        "description": "Maximum number of videos, at most 10 (default: 5)",
                        "default": 5
                    },
                    "maxDuration": {
                        "type": "number",
                        "description": "Maximum video length in minutes"
                    },
                    "language": {
                        "type": "string",
                        "description": "Relevance language (default: en)",
                        "default": "en"
                    }
                },
                "required": ["query"]
            }),
            ToolKind::CreateCourseStructure => json!({
                "type": "object",
                "properties": {
                    "course": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "description": { "type": "string" },
                            "tier": { "type": "string", "enum": ["free", "pro", "ultra"] },
                            "categoryId": { "type": "string", "description": "Existing category document id" },
                            "targetAudience": {
                                "type": "string",
                                "enum": ["beginner", "intermediate", "advanced", "mixed"]
                            },
                            "estimatedDuration": { "type": "number", "description": "Estimated hours" }
                        },
                        "required": ["title", "description", "tier"]
                    },
                    "modules": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "description": { "type": "string" },
                                "lessons": {
                                    "type": "array",
                                    "items": {
                                        "type": "object",
                                        "properties": {
                                            "title": { "type": "string" },
                                            "description": { "type": "string" }
                                        },
                                        "required": ["title"]
                                    }
                                }
                            },
                            "required": ["title", "description", "lessons"]
                        }
                    }
                },
                "required": ["course", "modules"]
            }),
            ToolKind::PopulateLesson => json!({
                "type": "object",
                "properties": {
                    "lessonId": { "type": "string", "description": "Id of the lesson document" },
                    "description": {
                        "type": "string",
                        "description": "Comprehensive 2-3 paragraph description of the lesson"
                    },
                    "content": {
                        "type": "array",
                        "description": "Structured content blocks for the lesson",
                        "items": {
                            "type": "object",
                            "properties": {
                                "type": { "type": "string", "enum": ["heading", "paragraph", "list", "code"] },
                                "text": { "type": "string" },
                                "level": { "type": "integer", "description": "Heading level (1-6)" },
                                "language": { "type": "string", "description": "Language of a code block" },
                                "items": { "type": "array", "items": { "type": "string" } }
                            },
                            "required": ["type", "text"]
                        }
                    },
                    "youtubeUrl": { "type": "string" },
                    "externalResources": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "url": { "type": "string" },
                                "type": { "type": "string", "enum": resource_types }
                            },
                            "required": ["title", "url", "type"]
                        }
                    }
                },
                "required": ["lessonId", "description", "content"]
            }),
            ToolKind::PopulateSingleLesson => json!({
                "type": "object",
                "properties": {
                    "lessonId": { "type": "string", "description": "Id of the lesson document to populate" },
                    "content": {
                        "type": "string",
                        "description": "The full markdown content for this lesson"
                    },
                    "resources": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "url": { "type": "string" },
                                "type": { "type": "string", "enum": resource_types }
                            },
                            "required": ["title", "url", "type"]
                        }
                    }
                },
                "required": ["lessonId", "content"]
            }),
            ToolKind::SearchCourses => json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "What the student is looking for" },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default: 5)",
                        "default": 5
                    }
                },
                "required": ["query"]
            }),
        }
    }

    /// Function definition sent to the model.
    pub fn definition(&self) -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: self.name().to_string(),
                description: Some(self.description().to_string()),
                parameters: Some(self.parameters()),
                strict: None,
            },
        }
    }
}

/// Tools enabled for the course generator.
pub const COURSE_GENERATOR_TOOLS: &[ToolKind] = &[
    ToolKind::WebResearch,
    ToolKind::YoutubeSearch,
    ToolKind::CreateCourseStructure,
    ToolKind::PopulateSingleLesson,
    ToolKind::PopulateLesson,
];

/// Tools enabled for the tutor.
pub const TUTOR_TOOLS: &[ToolKind] = &[ToolKind::SearchCourses];

/// OpenAI function definitions for a tool set.
pub fn tool_definitions(kinds: &[ToolKind]) -> Vec<ChatCompletionTool> {
    kinds.iter().map(ToolKind::definition).collect()
}

/// A validated tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    WebResearch(WebResearchArgs),
    YoutubeSearch(VideoSearchArgs),
    CreateCourseStructure(CreateCourseArgs),
    PopulateLesson(PopulateLessonArgs),
    PopulateSingleLesson(PopulateSingleLessonArgs),
    SearchCourses(SearchCoursesArgs),
}

impl ToolCall {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolCall::WebResearch(_) => ToolKind::WebResearch,
            ToolCall::YoutubeSearch(_) => ToolKind::YoutubeSearch,
            ToolCall::CreateCourseStructure(_) => ToolKind::CreateCourseStructure,
            ToolCall::PopulateLesson(_) => ToolKind::PopulateLesson,
            ToolCall::PopulateSingleLesson(_) => ToolKind::PopulateSingleLesson,
            ToolCall::SearchCourses(_) => ToolKind::SearchCourses,
        }
    }
}

/// Parse and validate a tool call from the model's raw arguments.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    let kind = ToolKind::from_name(name).ok_or_else(|| SyllabusError::UnknownTool(name.to_string()))?;
    let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };

    fn args<T: serde::de::DeserializeOwned>(tool: &str, raw: &str) -> Result<T> {
        serde_json::from_str(raw).map_err(|e| SyllabusError::InvalidToolArguments {
            tool: tool.to_string(),
            reason: e.to_string(),
        })
    }

    Ok(match kind {
        ToolKind::WebResearch => ToolCall::WebResearch(args(name, arguments)?),
        ToolKind::YoutubeSearch => ToolCall::YoutubeSearch(args(name, arguments)?),
        ToolKind::CreateCourseStructure => ToolCall::CreateCourseStructure(args(name, arguments)?),
        ToolKind::PopulateLesson => ToolCall::PopulateLesson(args(name, arguments)?),
        ToolKind::PopulateSingleLesson => ToolCall::PopulateSingleLesson(args(name, arguments)?),
        ToolKind::SearchCourses => ToolCall::SearchCourses(args(name, arguments)?),
    })
}

/// Tool execution context with access to the content store and providers.
pub struct ToolContext {
    pub store: Arc<dyn ContentStore>,
    pub researcher: WebResearcher,
    pub videos: VideoSearcher,
}

impl ToolContext {
    pub fn new(store: Arc<dyn ContentStore>, settings: &Settings) -> Self {
        Self {
            store,
            researcher: WebResearcher::new(settings.research.clone()),
            videos: VideoSearcher::new(settings.video.clone()),
        }
    }

    /// Execute a validated tool call. Failures come back as tagged results.
    pub async fn execute(&self, tool: &ToolCall) -> ToolResult {
        let store = self.store.as_ref();
        match tool {
            ToolCall::WebResearch(args) => self.researcher.research(args).await.into_tool_result(),
            ToolCall::YoutubeSearch(args) => self.videos.search(args).await,
            ToolCall::CreateCourseStructure(args) => match create_course_structure(store, args).await {
                Ok(created) => ToolResult::ok(&created),
                Err(e) => ToolResult::failure(e.0),
            },
            ToolCall::PopulateLesson(args) => match populate_lesson(store, args).await {
                Ok(populated) => ToolResult::ok(&populated),
                Err(e) => ToolResult::failure(e.0),
            },
            ToolCall::PopulateSingleLesson(args) => match populate_single_lesson(store, args).await {
                Ok(populated) => ToolResult::ok(&populated),
                Err(e) => ToolResult::failure(e.0),
            },
            ToolCall::SearchCourses(args) => match search_courses(store, args).await {
                Ok(results) => ToolResult::ok(&results),
                Err(e) => ToolResult::failure(e.0),
            },
        }
    }
}
