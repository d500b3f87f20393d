//! Configuration module for Syllabus.
//!
//! Handles loading application settings and agent instruction templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts};
pub use settings::{
    AgentSettings, AuthSettings, ContentStoreProvider, ContentStoreSettings, GeneralSettings,
    ModelSettings, PromptSettings, ResearchSettings, SanitySettings, ServerSettings, Settings,
    VideoSettings,
};
