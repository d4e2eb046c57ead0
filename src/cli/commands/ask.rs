//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use console::style;

/// Run one turn outside the interactive session.
pub async fn run_ask(
    question: &str,
    user: Option<String>,
    run_id: Option<String>,
    debug_mode: bool,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Chat) {
        Output::error(&e.to_string());
        Output::info("Run 'llmos doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let mut options = orchestrator.settings().assistant_options();
    options.user_id = user;
    options.run_id = run_id;
    options.debug_mode = debug_mode;

    let mut assistant = orchestrator.build_llm_os(&options)?;
    let run_id = match assistant.create_run().await {
        Ok(run_id) => run_id,
        Err(e) => {
            Output::warning("Could not create assistant, is the database running?");
            return Err(e.into());
        }
    };

    let spinner = Output::spinner("Thinking...");
    let result = assistant.run(question).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{}\n", response.content);
            if !response.tool_calls.is_empty() {
                Output::header("Tool calls");
                for call in &response.tool_calls {
                    Output::list_item(&call.to_string());
                }
                println!();
            }
            println!(
                "{}",
                style(format!("run {} · {} iteration(s)", run_id, response.iterations)).dim()
            );
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
