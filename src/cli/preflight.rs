//! Pre-flight checks before starting agents.
//!
//! Fails fast when the model provider can't be reached at all, instead of
//! surfacing the problem as an error part on the first request.

use crate::config::Settings;
use crate::error::{Result, SyllabusError};

/// Operations with different requirements.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Serving requires a model key. Research and video keys are optional.
    Serve,
    /// The wizard requires a model key.
    Wizard,
    /// Listing courses only needs the content store.
    Courses,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Serve | Operation::Wizard => check_model_key(settings),
        Operation::Courses => Ok(()),
    }
}

fn check_model_key(settings: &Settings) -> Result<()> {
    match settings.model.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(()),
        _ => Err(SyllabusError::Config(
            "OPENROUTER_API_KEY not set. Set it with: export OPENROUTER_API_KEY='sk-or-...'".to_string(),
        )),
    }
}
