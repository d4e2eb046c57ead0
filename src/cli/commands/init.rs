//! Init command - interactive first-run setup.

use crate::cli::preflight::{check_env_key, check_exa_key, check_tool, OPENAI_API_KEY_ENV};
use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::io::{self, Write};

/// A missing binary and how to get it.
struct MissingTool {
    name: &'static str,
    needed_for: &'static str,
}

/// Run the init command for first-time setup.
pub fn run_init(settings: &Settings) -> anyhow::Result<()> {
    Output::header("llmos Setup");
    println!();

    println!("{}", style("Step 1: External programs").bold().cyan());
    println!();

    let missing = missing_tools();
    if missing.is_empty() {
        Output::success("python3 and pdftotext are installed.");
    } else {
        for tool in &missing {
            println!(
                "  {} {} - not found, needed for {}",
                style("✗").red(),
                style(tool.name).bold(),
                tool.needed_for
            );
            println!("    {} {}", style("→").dim(), style(install_hint(tool.name)).dim());
        }
        println!();
        if !prompt_continue("Continue anyway?")? {
            Output::info("Setup cancelled. Install the missing programs and run 'llmos init' again.");
            return Ok(());
        }
    }

    println!();
    println!("{}", style("Step 2: API keys").bold().cyan());
    println!();

    match check_env_key(OPENAI_API_KEY_ENV, "sk-...") {
        Ok(()) => Output::success("OPENAI_API_KEY is configured."),
        Err(e) => {
            Output::warning(&e.to_string());
            println!("  The assistant and the knowledge base embeddings need it.");
            println!(
                "  Get a key from: {}",
                style("https://platform.openai.com/api-keys").underlined()
            );
            println!();
            if !prompt_continue("Continue without an OpenAI key?")? {
                Output::info("Setup cancelled. Set your API key and run 'llmos init' again.");
                return Ok(());
            }
        }
    }
    match check_exa_key() {
        Ok(()) => Output::success("EXA_API_KEY is configured."),
        Err(_) => Output::warning("EXA_API_KEY is not set; the research assistant cannot search."),
    }

    println!();
    println!("{}", style("Step 3: Directories").bold().cyan());
    println!();

    for (label, dir) in [
        ("Data directory", settings.data_dir()),
        ("Workspace", settings.workspace_dir()),
    ] {
        if dir.exists() {
            Output::info(&format!("{} exists: {}", label, dir.display()));
        } else {
            std::fs::create_dir_all(&dir)?;
            Output::success(&format!("Created {}: {}", label.to_lowercase(), dir.display()));
        }
    }
    let scratch = settings.scratch_dir()?;
    Output::info(&format!("Scratch directory: {}", scratch.display()));

    println!();
    println!("{}", style("Step 4: Configuration file").bold().cyan());
    println!();

    let config_path = Settings::default_config_path();
    if config_path.exists() {
        Output::info(&format!("Config file exists: {}", config_path.display()));
    } else if prompt_continue("Create default configuration file?")? {
        settings.save_to(&config_path)?;
        Output::success(&format!("Created config file: {}", config_path.display()));
        println!("  Edit it with: {}", style("llmos config edit").green());
    } else {
        Output::info("Skipped config file creation. Using defaults.");
    }

    println!();
    println!("{}", style("Setup Complete!").bold().green());
    println!();
    println!("Next steps:");
    println!("  {} Check system status", style("llmos doctor").cyan());
    println!("  {} Start chatting", style("llmos chat --user <name>").cyan());
    println!(
        "  {} Teach it something",
        style("llmos knowledge add-url <url>").cyan()
    );
    println!();

    Ok(())
}

fn missing_tools() -> Vec<MissingTool> {
    let mut missing = Vec::new();
    if check_tool("python3", "--version").is_err() {
        missing.push(MissingTool {
            name: "python3",
            needed_for: "the Python assistant",
        });
    }
    if check_tool("pdftotext", "-v").is_err() {
        missing.push(MissingTool {
            name: "pdftotext",
            needed_for: "adding PDFs to the knowledge base",
        });
    }
    missing
}

/// Platform-specific install hint.
pub(super) fn install_hint(tool: &str) -> &'static str {
    match tool {
        "python3" => {
            if cfg!(target_os = "macos") {
                "Install with: brew install python"
            } else if cfg!(target_os = "linux") {
                "Install with: sudo apt install python3"
            } else {
                "Install from: https://www.python.org/downloads/"
            }
        }
        "pdftotext" => {
            if cfg!(target_os = "macos") {
                "Install with: brew install poppler"
            } else if cfg!(target_os = "linux") {
                "Install with: sudo apt install poppler-utils"
            } else {
                "Install from: https://poppler.freedesktop.org/"
            }
        }
        _ => "Check the documentation for installation instructions",
    }
}

/// Prompt user for yes/no confirmation.
fn prompt_continue(message: &str) -> io::Result<bool> {
    print!("{} {} {} ", style("?").cyan(), message, style("[y/N]").dim());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let answer = input.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
