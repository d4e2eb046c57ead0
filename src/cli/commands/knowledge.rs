//! Knowledge base commands.

use crate::cli::output::content_preview;
use crate::cli::preflight::{self, Operation};
use crate::cli::{KnowledgeAction, Output};
use crate::config::Settings;
use crate::orchestrator::{IngestResult, Orchestrator};
use anyhow::Result;

/// Run a knowledge subcommand.
pub async fn run_knowledge(action: &KnowledgeAction, settings: Settings) -> Result<()> {
    let operation = match action {
        KnowledgeAction::AddPdf { .. } => Operation::IngestPdf,
        KnowledgeAction::AddUrl { .. } | KnowledgeAction::Search { .. } => Operation::Ingest,
        KnowledgeAction::List | KnowledgeAction::Clear => Operation::Runs,
    };
    if let Err(e) = preflight::check(operation) {
        Output::error(&e.to_string());
        Output::info("Run 'llmos doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let knowledge = orchestrator.knowledge();

    match action {
        KnowledgeAction::AddUrl { url } => {
            if knowledge.contains_source(url).await? {
                Output::info(&format!("{} is already in the knowledge base, refreshing it.", url));
            }
            let spinner = Output::spinner("Processing URL...");
            let result = orchestrator.add_url(url).await;
            spinner.finish_and_clear();
            report(result?, "Could not read website")?;
        }

        KnowledgeAction::AddPdf { path } => {
            let spinner = Output::spinner("Processing PDF...");
            let result = orchestrator.add_pdf(path).await;
            spinner.finish_and_clear();
            report(result?, "Could not read PDF")?;
        }

        KnowledgeAction::Search { query, limit } => {
            let limit = limit.unwrap_or_else(|| knowledge.num_documents());
            let spinner = Output::spinner("Searching...");
            let results = knowledge.search_top(query, limit).await;
            spinner.finish_and_clear();

            let results = results?;
            if results.is_empty() {
                Output::warning("No documents found");
            } else {
                Output::success(&format!("Found {} documents", results.len()));
                for result in &results {
                    Output::search_result(&result.document.name, result.score, &result.document.content);
                }
                println!();
            }
        }

        KnowledgeAction::List => {
            let sources = knowledge.sources().await?;
            if sources.is_empty() {
                Output::info("The knowledge base is empty. Use 'llmos knowledge add-url <url>' to add content.");
            } else {
                Output::header(&format!("Knowledge Sources ({})", sources.len()));
                for source in &sources {
                    Output::list_item(&format!(
                        "{} ({} chunks, added {})",
                        content_preview(&source.name, 80),
                        source.chunk_count,
                        source.indexed_at.format("%Y-%m-%d %H:%M")
                    ));
                }
                println!();
            }
        }

        KnowledgeAction::Clear => {
            let removed = knowledge.clear().await?;
            Output::success(&format!("Knowledge base cleared ({} documents removed)", removed));
        }
    }

    Ok(())
}

fn report(result: IngestResult, empty_message: &str) -> Result<()> {
    if result.is_empty() {
        Output::error(empty_message);
        anyhow::bail!("{}", empty_message);
    }
    Output::success(&format!(
        "Added {}: {} chunks read, {} stored",
        result.name, result.documents_read, result.documents_loaded
    ));
    Ok(())
}
