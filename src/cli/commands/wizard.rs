//! Interactive course creation wizard.

use crate::agent::{build_agent, AgentEvent, AgentRole, ChatModel, OpenAiChatModel, ToolContext};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::content_store::create_content_store;
use crate::wizard::{tool_label, QuickAction, SubmitRejected, WizardController, FALLBACK_ACTIONS};
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything a turn needs besides the controller.
struct Session {
    settings: Settings,
    prompts: Prompts,
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolContext>,
}

/// Run the interactive wizard.
pub async fn run_wizard(model: Option<String>, mut settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Wizard, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'syllabus doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.model.model = model;
    }

    let store = create_content_store(&settings)?;
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let session = Session {
        model: Arc::new(OpenAiChatModel::new(&settings.model)?),
        tools: Arc::new(ToolContext::new(store, &settings)),
        settings,
        prompts,
    };

    println!("\n{}", style("Syllabus Course Wizard").bold().cyan());
    println!(
        "{}\n",
        style("Answer the questions, or use: next, approve, revise, finalize, skip. 'pause' toggles pause, 'exit' quits.")
            .dim()
    );

    let mut wizard = WizardController::new();
    if wizard.start().is_ok() {
        run_turn(&mut wizard, &session).await;
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if wizard.completed_course().is_some() {
            break;
        }

        print_actions(&wizard);
        if wizard.is_paused() {
            print!("{} ", style("You (paused):").yellow().bold());
        } else {
            print!("{} ", style("You:").green().bold());
        }
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("pause") {
            if wizard.toggle_pause() {
                Output::info("Paused. Type 'pause' again to resume.");
            } else {
                Output::info("Resumed.");
            }
            continue;
        }

        match wizard.submit(input) {
            Ok(true) => run_turn(&mut wizard, &session).await,
            Ok(false) => continue,
            Err(SubmitRejected::Paused) => Output::warning("The wizard is paused. Type 'pause' to resume."),
            Err(e) => Output::warning(&format!("Can't send yet: {}", e)),
        }
    }

    if let Some(course_id) = wizard.completed_course() {
        println!();
        Output::success("Course created!");
        Output::kv("Course id", course_id);
        Output::kv("Admin page", &format!("/admin/courses/{}", course_id));
    }

    Ok(())
}

/// Send the current history to the course generator and record the reply.
async fn run_turn(wizard: &mut WizardController, session: &Session) {
    let agent = build_agent(
        AgentRole::CourseGenerator,
        session.model.clone(),
        session.tools.clone(),
        &session.settings,
        &session.prompts,
    )
    .with_stage(wizard.workflow_stage());

    let history = wizard.history().to_vec();
    let (tx, mut rx) = mpsc::channel::<AgentEvent>(64);
    let spinner = Output::spinner("Thinking...");

    let run = async move { agent.run(&history, Some(&tx)).await };
    let progress = async {
        while let Some(event) = rx.recv().await {
            match event {
                AgentEvent::ToolCallRequested { tool_name, .. } => {
                    spinner.set_message(tool_label(&tool_name));
                }
                AgentEvent::ToolResult { tool_name, result, .. } => {
                    spinner.suspend(|| Output::tool_outcome(&tool_label(&tool_name), &result));
                    spinner.set_message("Thinking...");
                }
                _ => {}
            }
        }
    };

    let (result, _) = tokio::join!(run, progress);
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{} {}\n", style("Assistant:").cyan().bold(), response.content);
            if response.hit_step_limit {
                Output::warning("Stopped at the step limit. Send another message to continue.");
            }
            let outcome = wizard.finish_turn(response.messages);
            Output::stage(&outcome.stage);
        }
        Err(e) => {
            wizard.fail_turn();
            Output::error(&format!("Error: {}", e));
        }
    }
}

fn print_actions(wizard: &WizardController) {
    let mut actions: Vec<QuickAction> = wizard.quick_actions();
    for action in FALLBACK_ACTIONS {
        if !actions.contains(&action) {
            actions.push(action);
        }
    }
    let labels: Vec<String> = actions
        .iter()
        .map(|a| format!("{} [{}]", a.label(), a.command()))
        .collect();
    println!("{}", style(labels.join("   ")).dim());
}
