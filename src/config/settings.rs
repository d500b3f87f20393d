//! Configuration settings for Syllabus.

use crate::content_store::Tier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub model: ModelSettings,
    pub agents: AgentSettings,
    pub research: ResearchSettings,
    pub video: VideoSettings,
    pub content_store: ContentStoreSettings,
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.syllabus".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Chat model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Base URL of an OpenAI-compatible chat completions API.
    pub api_base: String,
    /// Model identifier. Overridden by `AI_MODEL`.
    pub model: String,
    /// API key. Usually supplied through `OPENROUTER_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            api_base: "https://openrouter.ai/api/v1".to_string(),
            model: "qwen/qwen3-next-80b-a3b-instruct:free".to_string(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

/// Step ceilings for the two agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum inference rounds per course generator request.
    pub course_max_steps: usize,
    /// Maximum inference rounds per tutor request.
    pub tutor_max_steps: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            course_max_steps: 20,
            tutor_max_steps: 10,
        }
    }
}

/// Web research provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchSettings {
    /// Search endpoint (Tavily-compatible).
    pub api_url: String,
    /// API key. Usually supplied through `TAVILY_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Search depth passed to the provider.
    pub search_depth: String,
    /// Domains the search is restricted to.
    pub include_domains: Vec<String>,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.tavily.com/search".to_string(),
            api_key: None,
            search_depth: "basic".to_string(),
            include_domains: [
                "developer.mozilla.org",
                "stackoverflow.com",
                "github.com",
                "medium.com",
                "dev.to",
                "freecodecamp.org",
                "udemy.com",
                "coursera.org",
            ]
            .iter()
            .map(|d| d.to_string())
            .collect(),
        }
    }
}

/// Video search provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    /// YouTube Data API v3 base URL.
    pub api_base: String,
    /// API key. Usually supplied through `YOUTUBE_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/youtube/v3".to_string(),
            api_key: None,
        }
    }
}

/// Content store backend type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ContentStoreProvider {
    /// Process-local store, lost on exit.
    Memory,
    /// Local SQLite database (default).
    #[default]
    Sqlite,
    /// Hosted Sanity dataset over HTTP.
    Sanity,
}

impl std::str::FromStr for ContentStoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(ContentStoreProvider::Memory),
            "sqlite" => Ok(ContentStoreProvider::Sqlite),
            "sanity" => Ok(ContentStoreProvider::Sanity),
            _ => Err(format!("Unknown content store provider: {}", s)),
        }
    }
}

impl std::fmt::Display for ContentStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentStoreProvider::Memory => write!(f, "memory"),
            ContentStoreProvider::Sqlite => write!(f, "sqlite"),
            ContentStoreProvider::Sanity => write!(f, "sanity"),
        }
    }
}

/// Content store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentStoreSettings {
    pub provider: ContentStoreProvider,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
    pub sanity: SanitySettings,
}

impl Default for ContentStoreSettings {
    fn default() -> Self {
        Self {
            provider: ContentStoreProvider::Sqlite,
            sqlite_path: "~/.syllabus/content.db".to_string(),
            sanity: SanitySettings::default(),
        }
    }
}

/// Sanity dataset coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitySettings {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    /// Write token. Usually supplied through `SANITY_API_TOKEN`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for SanitySettings {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset: "production".to_string(),
            api_version: "2024-01-01".to_string(),
            token: None,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Request-duration ceiling for streamed agent runs.
    pub request_timeout_secs: u64,
    /// Development mode: unauthenticated callers become `dev_user_123` and
    /// the tutor tier check is skipped.
    pub dev_mode: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 60,
            dev_mode: false,
        }
    }
}

/// Static identity and tier tables used by the bundled auth collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthSettings {
    /// Bearer token -> user id.
    pub tokens: HashMap<String, String>,
    /// User id -> subscription tier. Unlisted users are `free`.
    pub tiers: HashMap<String, Tier>,
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment credentials are applied on top of the file.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Overlay credentials and the model override from the environment.
    ///
    /// Takes a lookup function so tests don't have to touch process env.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENROUTER_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(model) = non_empty("AI_MODEL") {
            self.model.model = model;
        }
        if let Some(key) = non_empty("TAVILY_API_KEY") {
            self.research.api_key = Some(key);
        }
        if let Some(key) = non_empty("YOUTUBE_API_KEY") {
            self.video.api_key = Some(key);
        }
        if let Some(token) = non_empty("SANITY_API_TOKEN") {
            self.content_store.sanity.token = Some(token);
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SyllabusError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("syllabus")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.content_store.sqlite_path)
    }
}
