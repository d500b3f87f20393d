//! Doctor command - verify API keys and the content store.

use crate::cli::Output;
use crate::config::{ContentStoreProvider, Settings};
use crate::content_store::create_content_store;
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Syllabus Doctor");
    println!();

    let mut checks = Vec::new();

    println!("{}", style("API Keys").bold());
    let key_checks = vec![
        check_key(
            "OPENROUTER_API_KEY",
            settings.model.api_key.as_deref(),
            true,
            "Required for both agents",
        ),
        check_key(
            "TAVILY_API_KEY",
            settings.research.api_key.as_deref(),
            false,
            "Without it, web research returns fallback suggestions",
        ),
        check_key(
            "YOUTUBE_API_KEY",
            settings.video.api_key.as_deref(),
            false,
            "Without it, video search reports an error to the agent",
        ),
    ];
    for check in &key_checks {
        check.print();
    }
    checks.extend(key_checks);

    println!();

    println!("{}", style("Content Store").bold());
    let store_check = check_content_store(settings).await;
    store_check.print();
    checks.push(store_check);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Syllabus.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Syllabus is ready to use.");
    }

    Ok(())
}

/// Check a credential. Missing required keys are errors, optional ones warnings.
fn check_key(name: &str, value: Option<&str>, required: bool, hint: &str) -> CheckResult {
    match value.map(str::trim) {
        Some(key) if !key.is_empty() => CheckResult::ok(name, &format!("configured ({})", mask(key))),
        _ if required => CheckResult::error(name, "not set", &format!("Set with: export {}='...'", name)),
        _ => CheckResult::warning(name, "not set", hint),
    }
}

/// Mask all but the ends of a secret.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 10 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

async fn check_content_store(settings: &Settings) -> CheckResult {
    let name = format!("{} store", settings.content_store.provider);
    let store = match create_content_store(settings) {
        Ok(store) => store,
        Err(e) => return CheckResult::error(&name, &e.to_string(), "Check the [content_store] section"),
    };

    match store.document_count().await {
        Ok(count) => {
            let location = match settings.content_store.provider {
                ContentStoreProvider::Sqlite => settings.sqlite_path().display().to_string(),
                ContentStoreProvider::Sanity => format!(
                    "{}/{}",
                    settings.content_store.sanity.project_id, settings.content_store.sanity.dataset
                ),
                ContentStoreProvider::Memory => "in memory, not persisted".to_string(),
            };
            let status = format!("{} ({} documents)", location, count);
            if settings.content_store.provider == ContentStoreProvider::Memory {
                CheckResult::warning(&name, &status, "Courses are lost when the process exits")
            } else {
                CheckResult::ok(&name, &status)
            }
        }
        Err(e) => CheckResult::error(&name, &e.to_string(), "Check credentials and connectivity"),
    }
}

fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: syllabus config edit",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_key_severity() {
        assert_eq!(check_key("A", Some("sk-or-1234567890"), true, "").status, CheckStatus::Ok);
        assert_eq!(check_key("A", None, true, "").status, CheckStatus::Error);
        assert_eq!(check_key("A", Some("  "), false, "").status, CheckStatus::Warning);
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("short"), "*****");
        assert_eq!(mask("tvly-abcdef123456"), "tvly...3456");
    }

    #[tokio::test]
    async fn test_memory_store_check_warns() {
        let mut settings = Settings::default();
        settings.content_store.provider = ContentStoreProvider::Memory;
        let result = check_content_store(&settings).await;
        assert_eq!(result.status, CheckStatus::Warning);
        assert!(result.message.contains("0 documents"));
    }
}
