//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::session::{SessionError, SessionState, SlashCommand, Toggle, KNOWLEDGE_CLEARED};
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Run the interactive chat command.
pub async fn run_chat(
    user: Option<String>,
    run_id: Option<String>,
    debug_mode: bool,
    settings: Settings,
) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Chat) {
        Output::error(&e.to_string());
        Output::info("Run 'llmos doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let user = match user {
        Some(user) => user,
        None => prompt_line("Username:")?.unwrap_or_default(),
    };

    let orchestrator = Arc::new(Orchestrator::new(settings)?);
    let mut state = match SessionState::new(orchestrator, &user) {
        Ok(state) => state.with_debug_mode(debug_mode),
        Err(e) => {
            Output::warning(&e.to_string());
            return Ok(());
        }
    };
    if let Some(run_id) = run_id {
        state.load_run(&run_id);
    }

    println!("\n{}", style("LLM OS").bold().cyan());
    println!(
        "{}\n",
        style("Type a message, /help for commands, or 'exit' to quit.").dim()
    );
    Output::info(&format!("User: {}", state.user_id()));

    if !start_run(&mut state).await {
        return Ok(());
    }

    loop {
        let Some(input) = prompt_line(&style("You:").green().bold().to_string())? else {
            break;
        };
        if input.is_empty() {
            continue;
        }

        let command = match SlashCommand::parse(&input) {
            None => {
                send(&mut state, &input).await;
                continue;
            }
            Some(Ok(command)) => command,
            Some(Err(e)) => {
                Output::error(&e.to_string());
                continue;
            }
        };

        match command {
            SlashCommand::Exit => {
                Output::info("Goodbye!");
                break;
            }
            SlashCommand::Help => print_help(),
            SlashCommand::Tools => print_toggles(&state),
            SlashCommand::Toggle(toggle) => {
                let enabled = state.toggle(toggle);
                Output::success(&format!(
                    "{} {}. Starting a new run.",
                    toggle.label(),
                    if enabled { "enabled" } else { "disabled" }
                ));
            }
            SlashCommand::AddUrl(url) => {
                let spinner = Output::spinner("Processing URL...");
                let result = state.add_url(&url).await;
                spinner.finish_and_clear();
                report_ingest(result);
            }
            SlashCommand::AddPdf(path) => {
                if let Err(e) = preflight::check(Operation::IngestPdf) {
                    Output::error(&e.to_string());
                    continue;
                }
                let spinner = Output::spinner("Processing PDF...");
                let result = state.add_pdf(&path).await;
                spinner.finish_and_clear();
                report_ingest(result);
            }
            SlashCommand::ClearKnowledge => match state.clear_knowledge().await {
                Ok(_) => Output::success(KNOWLEDGE_CLEARED),
                Err(e) => Output::error(&e.to_string()),
            },
            SlashCommand::Runs => match state.run_ids().await {
                Ok(run_ids) => {
                    Output::header("Runs");
                    for run_id in run_ids {
                        if state.run_id() == Some(run_id.as_str()) {
                            Output::list_item(&format!("{} {}", run_id, style("(current)").dim()));
                        } else {
                            Output::list_item(&run_id);
                        }
                    }
                    println!();
                }
                Err(e) => Output::error(&e.to_string()),
            },
            SlashCommand::Load(run_id) => {
                if state.load_run(&run_id) && !start_run(&mut state).await {
                    return Ok(());
                }
            }
            SlashCommand::New => {
                state.restart();
                if !start_run(&mut state).await {
                    return Ok(());
                }
            }
            SlashCommand::Team => print_team(&state),
        }
    }

    Ok(())
}

/// Create or resume the run and print its history. False when the
/// assistant could not be created.
async fn start_run(state: &mut SessionState) -> bool {
    if let Err(e) = state.ensure_assistant().await {
        Output::warning(&e.to_string());
        return false;
    }
    if let Some(run_id) = state.run_id() {
        Output::info(&format!("Run: {}", run_id));
    }
    for message in state.load_messages() {
        Output::message(message);
    }
    true
}

async fn send(state: &mut SessionState, prompt: &str) {
    let spinner = Output::spinner("Thinking...");
    let result = state.send(prompt).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{} {}\n", style("LLM OS:").cyan().bold(), response.content);
        }
        Err(e @ SessionError::AssistantUnavailable(_)) => Output::warning(&e.to_string()),
        Err(e) => Output::error(&format!("Error: {}", e)),
    }
}

fn report_ingest(result: Result<Option<crate::orchestrator::IngestResult>, SessionError>) {
    match result {
        Ok(Some(ingest)) => Output::success(&format!(
            "Added {} ({} of {} chunks new)",
            ingest.name, ingest.documents_loaded, ingest.documents_read
        )),
        Ok(None) => Output::info("Already added in this session."),
        Err(e) => Output::error(&e.to_string()),
    }
}

fn print_toggles(state: &SessionState) {
    Output::header("Select Tools");
    for toggle in Toggle::ALL.iter().filter(|t| !t.is_team_member()) {
        Output::toggle(toggle.label(), toggle.key(), state.toggles().get(*toggle));
    }
    Output::header("Select Team Members");
    for toggle in Toggle::ALL.iter().filter(|t| t.is_team_member()) {
        Output::toggle(toggle.label(), toggle.key(), state.toggles().get(*toggle));
    }
    println!();
}

fn print_team(state: &SessionState) {
    let team = state.team_memory();
    if team.is_empty() {
        Output::info("No team member has been used in this run yet.");
        return;
    }
    for (name, messages) in team {
        Output::header(&format!("{} Memory", name));
        match serde_json::to_string_pretty(&messages) {
            Ok(json) => println!("{}", json),
            Err(e) => Output::error(&e.to_string()),
        }
    }
    println!();
}

fn print_help() {
    Output::header("Commands");
    for (command, help) in [
        ("/tools", "Show enabled tools and team members"),
        ("/toggle <name>", "Enable or disable a tool or team member"),
        ("/add-url <url>", "Add a website to the knowledge base"),
        ("/add-pdf <path>", "Add a PDF to the knowledge base"),
        ("/clear-kb", "Clear the knowledge base"),
        ("/runs", "List your runs"),
        ("/load <run id>", "Switch to another run"),
        ("/new", "Start a new run"),
        ("/team", "Show team member memory"),
        ("/exit", "Quit"),
    ] {
        Output::kv(command, help);
    }
    println!();
}

/// Read one trimmed line; `None` at end of input.
fn prompt_line(prompt: &str) -> io::Result<Option<String>> {
    print!("{} ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}
