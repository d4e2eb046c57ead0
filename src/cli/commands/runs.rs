//! List stored assistant runs.

use crate::cli::Output;
use crate::config::Settings;
use crate::storage::{AssistantStorage, SqliteAssistantStorage};
use anyhow::Result;
use console::style;

/// Run the runs command.
pub async fn run_runs(user: Option<String>, settings: Settings) -> Result<()> {
    let storage = SqliteAssistantStorage::new(&settings.sqlite_path(), &settings.storage.table_name)?;
    storage.create().await?;

    let runs = storage.get_all_runs(user.as_deref()).await?;
    if runs.is_empty() {
        Output::info("No runs stored yet. Start one with 'llmos chat'.");
        return Ok(());
    }

    Output::header(&format!("Runs ({})", runs.len()));
    println!();
    for run in &runs {
        let chats = run.memory.get_chats().len();
        println!(
            "  {} {} {} ({} exchange(s), updated {})",
            style("*").cyan(),
            style(&run.run_id).bold(),
            style(run.user_id.as_deref().unwrap_or("-")).dim(),
            chats,
            run.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!();
    Output::info("Resume one with: llmos chat --run <run id>");

    Ok(())
}
