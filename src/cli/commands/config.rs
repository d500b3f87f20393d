//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&redacted(settings))
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Edit => {
            let config_path = Settings::default_config_path();

            if !config_path.exists() {
                Settings::default().save()?;
                Output::info(&format!("Created default config at {:?}", config_path));
            }

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());

            Output::info(&format!("Opening config in {}...", editor));

            let status = std::process::Command::new(&editor)
                .arg(&config_path)
                .status();

            match status {
                Ok(s) if s.success() => {
                    Output::success("Config saved.");
                }
                Ok(_) => {
                    Output::warning("Editor exited with non-zero status.");
                }
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {:?}", config_path));
                }
            }
        }

        ConfigAction::Path => {
            let config_path = Settings::default_config_path();
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Settings with secrets replaced, for display.
fn redacted(mut settings: Settings) -> Settings {
    const HIDDEN: &str = "<redacted>";

    for secret in [
        &mut settings.model.api_key,
        &mut settings.research.api_key,
        &mut settings.video.api_key,
        &mut settings.content_store.sanity.token,
    ] {
        if secret.is_some() {
            *secret = Some(HIDDEN.to_string());
        }
    }
    settings.auth.tokens = settings
        .auth
        .tokens
        .into_values()
        .map(|user| (HIDDEN.to_string() + ":" + &user, user))
        .collect();
    settings
}
