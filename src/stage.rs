//! Workflow stages of the course generator.
//!
//! Two views of the same five stages live here. [`detect_stage`] classifies
//! assistant text by phrase matching and is for display only; it has no
//! memory and may move backwards. [`StageTracker`] is the authoritative
//! state, advanced only by trigger words the user types.

use crate::agent::{latest_assistant_text, Message, Role};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Discovery,
    Research,
    Structure,
    Modules,
    Complete,
}

impl Stage {
    pub fn ordinal(&self) -> u8 {
        match self {
            Stage::Discovery => 1,
            Stage::Research => 2,
            Stage::Structure => 3,
            Stage::Modules => 4,
            Stage::Complete => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Discovery => "Discovery",
            Stage::Research => "Research",
            Stage::Structure => "Structure Planning",
            Stage::Modules => "Module Content",
            Stage::Complete => "Complete",
        }
    }

    /// Progress percentage shown once the stage is confirmed.
    pub fn progress(&self) -> u8 {
        match self {
            Stage::Discovery => 15,
            Stage::Research => 30,
            Stage::Structure => 50,
            Stage::Modules => 70,
            Stage::Complete => 100,
        }
    }

    /// Apply a trigger. Unrecognised combinations leave the stage unchanged.
    pub fn advance(self, trigger: Trigger) -> Stage {
        use Stage::*;
        use Trigger::*;

        match (self, trigger) {
            (_, Start) => Discovery,
            (Discovery, Next | Skip) => Research,
            (Research, Next | Skip) => Structure,
            (Structure, Approve | Skip) => Modules,
            (Modules, Finalize | Skip) => Complete,
            (stage, _) => stage,
        }
    }

    /// Context line appended to the agent instructions.
    pub fn context(&self) -> String {
        let expectation = match self {
            Stage::Discovery => "Ask about the topic, audience and goals, then summarize and ask to proceed.",
            Stage::Research => "Research the topic and suggest resources, then ask to proceed.",
            Stage::Structure => "Propose or revise the module outline and wait for 'approve' or 'revise'.",
            Stage::Modules => {
                "Outline ONE module per turn. When all modules are outlined, ask the user to type 'finalize'."
            }
            Stage::Complete => {
                "Create the course structure once, then populate lessons one at a time and report the course id."
            }
        };
        format!(
            "CURRENT STAGE: Stage {} of 5 ({}). {}",
            self.ordinal(),
            self.name(),
            expectation
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Control words a user types to steer the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Start,
    Next,
    Approve,
    Revise,
    Finalize,
    Skip,
}

impl Trigger {
    /// Parse a whole message as a trigger word, ignoring case and surrounding
    /// whitespace or quotes.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text
            .trim()
            .trim_matches(|c: char| c == '\'' || c == '"' || c == '.' || c == '!')
            .to_lowercase();
        match word.as_str() {
            "start" => Some(Trigger::Start),
            "next" => Some(Trigger::Next),
            "approve" => Some(Trigger::Approve),
            "revise" => Some(Trigger::Revise),
            "finalize" => Some(Trigger::Finalize),
            "skip" => Some(Trigger::Skip),
            _ => None,
        }
    }
}

/// Authoritative workflow stage, replayed from the user's messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageTracker {
    stage: Stage,
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay every user message of a conversation.
    pub fn replay(history: &[Message]) -> Self {
        let mut tracker = Self::new();
        for message in history.iter().filter(|m| m.role == Role::User) {
            tracker.observe(&message.text);
        }
        tracker
    }

    /// Feed one user message. Returns the trigger it carried, if any.
    pub fn observe(&mut self, user_text: &str) -> Option<Trigger> {
        let trigger = Trigger::parse(user_text)?;
        self.stage = self.stage.advance(trigger);
        Some(trigger)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }
}

/// Stage classification of assistant output, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageInfo {
    pub stage: Stage,
    pub ordinal: u8,
    pub name: &'static str,
    pub progress: u8,
    /// `(current, total)` from a "Module X of Y" phrase.
    pub module_progress: Option<(u32, u32)>,
}

impl StageInfo {
    fn new(stage: Stage, progress: u8, module_progress: Option<(u32, u32)>) -> Self {
        Self {
            stage,
            ordinal: stage.ordinal(),
            name: stage.name(),
            progress,
            module_progress,
        }
    }

    /// Nothing recognisable yet.
    pub fn initial() -> Self {
        Self::new(Stage::Discovery, 5, None)
    }
}

fn module_progress_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Module (\d+) of (\d+)").expect("Invalid regex"))
}

/// Extract `Module X of Y` progress from text.
pub fn module_progress(text: &str) -> Option<(u32, u32)> {
    let caps = module_progress_regex().captures(text)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Classify a single piece of assistant text. First matching stage wins,
/// checked from Complete downwards.
pub fn classify(text: &str) -> StageInfo {
    let has = |needle: &str| text.contains(needle);

    let stage = if has("🎉 Course Complete") {
        Some(Stage::Complete)
    } else if (has("Module") && has("ready!"))
        || has("Type 'next' to create Module")
        || has("Type 'finalize'")
        || (has("Module") && has("of") && has("complete"))
    {
        Some(Stage::Modules)
    } else if has("Structure looks good?")
        || has("Does this structure look good?")
        || has("Type 'approve' to proceed to Stage 4")
        || has("List of Modules")
    {
        Some(Stage::Structure)
    } else if has("Research complete!")
        || has("Type 'next' to move to Stage 3")
        || has("📚")
        || has("🎥")
    {
        Some(Stage::Research)
    } else if has("Ready to proceed?") || has("Type 'next' to move to Stage 2") {
        Some(Stage::Discovery)
    } else {
        None
    };

    match stage {
        Some(stage) => {
            let modules = (stage == Stage::Modules).then(|| module_progress(text)).flatten();
            StageInfo::new(stage, stage.progress(), modules)
        }
        None => StageInfo::initial(),
    }
}

/// Classify the latest assistant message of a conversation.
pub fn detect_stage(history: &[Message]) -> StageInfo {
    latest_assistant_text(history)
        .map(classify)
        .unwrap_or_else(StageInfo::initial)
}
