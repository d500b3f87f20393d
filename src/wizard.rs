//! Client-side state for the course creation wizard.
//!
//! UI-agnostic: the terminal wizard drives it, but nothing here does I/O.

use crate::agent::{latest_assistant_text, Message, Role};
use crate::stage::{detect_stage, Stage, StageInfo, StageTracker, Trigger};
use regex::Regex;
use std::sync::OnceLock;

/// Phrase the model uses to announce a finished course.
pub const COMPLETION_SENTINEL: &str = "🎉 Course Complete";

/// Why a submission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    Paused,
    Busy,
}

impl std::fmt::Display for SubmitRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitRejected::Paused => write!(f, "the wizard is paused"),
            SubmitRejected::Busy => write!(f, "a response is still in progress"),
        }
    }
}

/// Shortcut commands offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Next,
    Approve,
    Revise,
    Finalize,
    Skip,
}

impl QuickAction {
    /// Text submitted when the action is chosen.
    pub fn command(&self) -> &'static str {
        match self {
            QuickAction::Next => "next",
            QuickAction::Approve => "approve",
            QuickAction::Revise => "revise",
            QuickAction::Finalize => "finalize",
            QuickAction::Skip => "skip",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuickAction::Next => "➡️  Next stage",
            QuickAction::Approve => "✅ Approve",
            QuickAction::Revise => "🔄 Revise",
            QuickAction::Finalize => "🎯 Finalize structure",
            QuickAction::Skip => "⏭  Skip",
        }
    }
}

/// Actions always available between turns.
pub const FALLBACK_ACTIONS: [QuickAction; 3] = [QuickAction::Next, QuickAction::Approve, QuickAction::Skip];

/// Progress label for a tool call.
pub fn tool_label(tool_name: &str) -> String {
    match tool_name {
        "youtubeSearch" => "🎥 Searching YouTube...".to_string(),
        "webResearch" => "🔍 Researching topic...".to_string(),
        "createCourseStructure" => "🏗️ Creating structure...".to_string(),
        "populateLesson" | "populateSingleLesson" => "✍️ Adding lesson content...".to_string(),
        "searchCourses" => "📖 Searching courses...".to_string(),
        other => format!("🔧 Running {}...", other),
    }
}

/// Tool indicator shown under a transcript message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolIndicator {
    pub label: String,
    pub done: bool,
    pub success: Option<bool>,
}

/// One displayed transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    pub tools: Vec<ToolIndicator>,
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("Invalid regex"))
}

fn course_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"course-id: ([a-z0-9-]+)")
}

/// Course id announced in a completion message, if the message is one.
pub fn completed_course_id(text: &str) -> Option<String> {
    if !text.contains(COMPLETION_SENTINEL) {
        return None;
    }
    course_id_regex()
        .captures(text)
        .map(|caps| caps[1].to_string())
}

/// Quick actions suggested by a message's text.
pub fn infer_quick_actions(text: &str) -> Vec<QuickAction> {
    static NEXT: OnceLock<Regex> = OnceLock::new();
    static STAGE: OnceLock<Regex> = OnceLock::new();
    static APPROVE: OnceLock<Regex> = OnceLock::new();
    static REVISE: OnceLock<Regex> = OnceLock::new();
    static FINALIZE: OnceLock<Regex> = OnceLock::new();

    let mut actions = Vec::new();
    if regex(&NEXT, r"(?i)next").is_match(text) && regex(&STAGE, r"(?i)stage").is_match(text) {
        actions.push(QuickAction::Next);
    }
    if regex(&APPROVE, r"(?i)approve").is_match(text) {
        actions.push(QuickAction::Approve);
    }
    if regex(&REVISE, r"(?i)revise").is_match(text) {
        actions.push(QuickAction::Revise);
    }
    if regex(&FINALIZE, r"(?i)finalize").is_match(text) {
        actions.push(QuickAction::Finalize);
    }
    actions
}

/// One assistant message from the rounds of a turn: texts joined, tool
/// invocations in order.
fn merge_turn(messages: Vec<Message>) -> Option<Message> {
    let mut texts = Vec::new();
    let mut invocations = Vec::new();
    let mut any = false;
    for message in messages.into_iter().filter(|m| m.role == Role::Assistant) {
        any = true;
        if !message.text.is_empty() {
            texts.push(message.text);
        }
        invocations.extend(message.tool_invocations);
    }
    any.then(|| Message::assistant(texts.join("\n\n")).with_invocations(invocations))
}

/// Wizard session state.
#[derive(Debug, Default)]
pub struct WizardController {
    messages: Vec<Message>,
    paused: bool,
    in_flight: bool,
    tracker: StageTracker,
    displayed: Option<StageInfo>,
    completed_course: Option<String>,
}

/// What a finished turn changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub stage: StageInfo,
    pub completed_course: Option<String>,
}

impl WizardController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin the flow.
    pub fn start(&mut self) -> Result<bool, SubmitRejected> {
        self.submit("start")
    }

    /// Queue a user turn. Returns `Ok(false)` for blank input, which is ignored.
    pub fn submit(&mut self, text: &str) -> Result<bool, SubmitRejected> {
        if self.paused {
            return Err(SubmitRejected::Paused);
        }
        if self.in_flight {
            return Err(SubmitRejected::Busy);
        }
        let text = text.trim();
        if text.is_empty() {
            return Ok(false);
        }

        if self.tracker.observe(text) == Some(Trigger::Start) {
            self.displayed = None;
        }
        self.messages.push(Message::user(text));
        self.in_flight = true;
        Ok(true)
    }

    /// Record the assistant messages of a completed turn.
    ///
    /// Every round of the turn is folded into one assistant message, so the
    /// completion marker and stage phrases count wherever they appeared.
    pub fn finish_turn(&mut self, messages: Vec<Message>) -> TurnOutcome {
        self.messages.extend(merge_turn(messages));
        self.in_flight = false;

        let detected = detect_stage(&self.messages);
        let displayed = match self.displayed {
            Some(current) if (detected.ordinal, detected.progress) < (current.ordinal, current.progress) => current,
            _ => detected,
        };
        self.displayed = Some(displayed);

        let completed = latest_assistant_text(&self.messages).and_then(completed_course_id);
        if completed.is_some() {
            self.completed_course = completed.clone();
        }

        TurnOutcome {
            stage: displayed,
            completed_course: completed,
        }
    }

    /// Record a failed turn. The user message stays in the transcript.
    pub fn fail_turn(&mut self) {
        self.in_flight = false;
    }

    /// Toggle pause. Does not cancel a turn in flight. Returns the new state.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Conversation to send with the next request.
    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    /// Authoritative workflow stage from the user's triggers.
    pub fn workflow_stage(&self) -> Stage {
        self.tracker.stage()
    }

    /// Stage shown to the user. Never moves backwards except after `start`.
    pub fn displayed_stage(&self) -> StageInfo {
        self.displayed.unwrap_or_else(StageInfo::initial)
    }

    pub fn completed_course(&self) -> Option<&str> {
        self.completed_course.as_deref()
    }

    /// Suggested actions for the latest assistant message. Empty while busy.
    pub fn quick_actions(&self) -> Vec<QuickAction> {
        if self.in_flight {
            return Vec::new();
        }
        latest_assistant_text(&self.messages)
            .map(infer_quick_actions)
            .unwrap_or_default()
    }

    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.messages
            .iter()
            .map(|m| TranscriptEntry {
                role: m.role,
                text: m.text.clone(),
                tools: m
                    .tool_invocations
                    .iter()
                    .map(|inv| ToolIndicator {
                        label: tool_label(&inv.tool_name),
                        done: inv.is_resolved(),
                        success: inv.result.as_ref().map(|r| r.success),
                    })
                    .collect(),
            })
            .collect()
    }
}
