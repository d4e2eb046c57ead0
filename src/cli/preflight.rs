//! Pre-flight checks before operations that need keys or binaries.

use crate::error::{LlmOsError, Result};
use crate::tools::EXA_API_KEY_ENV;
use std::process::Command;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Chatting needs the model key.
    Chat,
    /// Ingestion needs the embedding key.
    Ingest,
    /// Reading PDFs also needs pdftotext.
    IngestPdf,
    /// Listing runs only reads the database.
    Runs,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Chat | Operation::Ingest => check_env_key(OPENAI_API_KEY_ENV, "sk-...")?,
        Operation::IngestPdf => {
            check_env_key(OPENAI_API_KEY_ENV, "sk-...")?;
            check_tool("pdftotext", "-v")?;
        }
        Operation::Runs => {}
    }
    Ok(())
}

/// Check that an environment variable holds a non-empty key.
pub fn check_env_key(name: &str, example: &str) -> Result<()> {
    match std::env::var(name) {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        Ok(_) => Err(LlmOsError::Config(format!(
            "{} is empty. Set it with: export {}='{}'",
            name, name, example
        ))),
        Err(_) => Err(LlmOsError::Config(format!(
            "{} not set. Set it with: export {}='{}'",
            name, name, example
        ))),
    }
}

/// The Exa key used by the research assistant.
pub fn check_exa_key() -> Result<()> {
    check_env_key(EXA_API_KEY_ENV, "...")
}

/// Check that an external binary runs.
pub fn check_tool(name: &str, version_arg: &str) -> Result<()> {
    match Command::new(name).arg(version_arg).output() {
        // pdftotext -v exits 0 on poppler and 99 on xpdf
        Ok(output) if output.status.success() || name == "pdftotext" => Ok(()),
        Ok(_) => Err(LlmOsError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LlmOsError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(LlmOsError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_has_no_requirements() {
        assert!(check(Operation::Runs).is_ok());
    }

    #[test]
    fn test_missing_env_key() {
        let err = check_env_key("LLMOS_TEST_KEY_THAT_IS_NEVER_SET", "x").unwrap_err();
        assert!(err.to_string().contains("LLMOS_TEST_KEY_THAT_IS_NEVER_SET not set"));
    }

    #[test]
    fn test_missing_binary() {
        let err = check_tool("llmos-binary-that-does-not-exist", "--version").unwrap_err();
        assert!(matches!(err, LlmOsError::ToolNotFound(_)));
    }
}
