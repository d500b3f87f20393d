//! CLI output formatting utilities.

use crate::stage::StageInfo;
use crate::tools::ToolResult;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a course line.
    pub fn course_info(title: &str, id: &str, tier: &str, modules: usize) {
        println!(
            "  {} {} ({}, {}, {} modules)",
            style("*").cyan(),
            style(title).bold(),
            style(id).dim(),
            tier,
            modules
        );
    }

    /// Print the stage bar: `[#####-----] 50% Stage 3 of 5: Structure Planning`.
    pub fn stage(info: &StageInfo) {
        let filled = (info.progress as usize / 10).min(10);
        let bar = format!("{}{}", "#".repeat(filled), "-".repeat(10 - filled));
        let mut line = format!(
            "[{}] {:>3}% Stage {} of 5: {}",
            bar, info.progress, info.ordinal, info.name
        );
        if let Some((current, total)) = info.module_progress {
            line.push_str(&format!(" (Module {} of {})", current, total));
        }
        println!("{}", style(line).dim());
    }

    /// Print the outcome of a tool call under its label.
    pub fn tool_outcome(label: &str, result: &ToolResult) {
        if result.success {
            println!("  {} {}", style("✓").green(), style(label).dim());
        } else {
            println!(
                "  {} {} {}",
                style("✗").red(),
                style(label).dim(),
                style(result.error().unwrap_or("failed")).red()
            );
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let template = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(template);
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}
