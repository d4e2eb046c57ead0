//! Doctor command - verify system requirements and configuration.

use super::init::install_hint;
use crate::cli::preflight::OPENAI_API_KEY_ENV;
use crate::cli::Output;
use crate::config::Settings;
use crate::tools::EXA_API_KEY_ENV;
use console::style;
use std::process::Command;

/// Outcome of one diagnostic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

/// One line of the doctor report.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

impl CheckResult {
    fn new(status: CheckStatus, name: &str, message: impl Into<String>, hint: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            hint: hint.map(str::to_string),
        }
    }

    fn ok(name: &str, message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Ok, name, message, None)
    }

    fn warning(name: &str, message: impl Into<String>, hint: &str) -> Self {
        Self::new(CheckStatus::Warning, name, message, Some(hint))
    }

    fn error(name: &str, message: impl Into<String>, hint: &str) -> Self {
        Self::new(CheckStatus::Error, name, message, Some(hint))
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

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("llmos Doctor");
    println!();

    let programs = vec![
        check_program("python3", &["--version"], "needed by the Python assistant"),
        check_program("pdftotext", &["-v"], "needed to add PDFs"),
    ];
    print_section("External Programs", &programs);

    let keys = vec![
        check_key(OPENAI_API_KEY_ENV, true, "the assistant and embeddings"),
        check_key(EXA_API_KEY_ENV, false, "the research assistant"),
    ];
    print_section("API Keys", &keys);

    let dirs = check_directories(settings);
    print_section("Storage", &dirs);

    let config = vec![check_config_file()];
    print_section("Configuration", &config);

    let checks: Vec<&CheckResult> = programs
        .iter()
        .chain(&keys)
        .chain(&dirs)
        .chain(&config)
        .collect();
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using llmos.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! llmos is ready to use.");
    }

    Ok(())
}

/// Missing programs only disable a feature, so they are warnings.
fn check_program(name: &str, args: &[&str], purpose: &str) -> CheckResult {
    match Command::new(name).args(args).output() {
        Ok(output) => {
            // Both streams: pdftotext prints its version on stderr
            let text = format!(
                "{}{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
            let version = text.lines().next().unwrap_or("installed").trim();
            CheckResult::ok(name, &truncate(version, 50))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::warning(
            name,
            &format!("not found, {}", purpose),
            install_hint(name),
        ),
        Err(e) => CheckResult::warning(name, &format!("error: {}", e), install_hint(name)),
    }
}

fn check_key(name: &str, required: bool, purpose: &str) -> CheckResult {
    let value = std::env::var(name).ok().filter(|v| !v.trim().is_empty());
    match value {
        Some(key) => CheckResult::ok(name, &format!("configured ({})", mask_key(&key))),
        None => {
            let hint = format!("Set with: export {}='...' (used by {})", name, purpose);
            if required {
                CheckResult::error(name, "not set", &hint)
            } else {
                CheckResult::warning(name, "not set", &hint)
            }
        }
    }
}

fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    for (label, dir) in [
        ("Data directory", settings.data_dir()),
        ("Workspace", settings.workspace_dir()),
    ] {
        if dir.exists() {
            results.push(CheckResult::ok(label, &dir.display().to_string()));
        } else {
            results.push(CheckResult::warning(
                label,
                &format!("{} (will be created)", dir.display()),
                "Run: llmos init",
            ));
        }
    }

    let db_path = settings.sqlite_path();
    if db_path.exists() {
        let size = std::fs::metadata(&db_path)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        results.push(CheckResult::ok(
            "Database",
            &format!("{} ({})", db_path.display(), size),
        ));
    } else {
        results.push(CheckResult::warning(
            "Database",
            &format!("{} (not created yet)", db_path.display()),
            "The database is created on the first chat",
        ));
    }

    results
}

fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: llmos init (or llmos config edit)",
        )
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Human-readable byte count.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_missing_optional_key_is_warning() {
        let result = check_key("LLMOS_DOCTOR_KEY_NEVER_SET", false, "tests");
        assert_eq!(result.status, CheckStatus::Warning);
        let result = check_key("LLMOS_DOCTOR_KEY_NEVER_SET", true, "tests");
        assert_eq!(result.status, CheckStatus::Error);
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-abcdefghijklmnop"), "sk-a...mnop");
        assert_eq!(mask_key("short"), "*****");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }
}
