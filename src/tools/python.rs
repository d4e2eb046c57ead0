//! Python code execution with the `python3` interpreter.

use super::{list_dir_files, opt_bool_arg, opt_str_arg, resolve_in_dir, str_arg, FunctionSpec, Toolkit};
use crate::error::{LlmOsError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::process::Command;
use tracing::{info, instrument, warn};

const PYTHON: &str = "python3";
const RESULT_MARKER: &str = "__LLMOS_RESULT__";

/// Runs a file (argv[1]) or code string (argv[2] when argv[1] is "-") and
/// prints the requested variable (argv[3]) after a marker line.
const DRIVER: &str = r#"
import runpy, sys
target, code, var = sys.argv[1], sys.argv[2], sys.argv[3]
if target == "-":
    ns = {"__name__": "__main__"}
    exec(compile(code, "<llmos>", "exec"), ns)
else:
    ns = runpy.run_path(target, run_name="__main__")
if var:
    print("__LLMOS_RESULT__")
    if var in ns:
        print(ns[var])
    else:
        print("Variable " + var + " not found")
"#;

static PACKAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._\-]*(\[[A-Za-z0-9,._\-]+\])?([<>=!~]=?[A-Za-z0-9.*]+)?$")
        .expect("Invalid regex")
});

/// Write and run python files inside `base_dir`.
pub struct PythonTools {
    base_dir: PathBuf,
    pip_install: bool,
    run_code: bool,
}

impl PythonTools {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            pip_install: false,
            run_code: false,
        }
    }

    /// Expose `pip_install_package`.
    pub fn with_pip_install(mut self, enabled: bool) -> Self {
        self.pip_install = enabled;
        self
    }

    /// Expose `run_python_code` (code run without saving a file).
    pub fn with_run_code(mut self, enabled: bool) -> Self {
        self.run_code = enabled;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    async fn execute(&self, target: &str, code: &str, variable: Option<&str>) -> Result<String> {
        tokio::fs::create_dir_all(&self.base_dir).await?;

        let result = Command::new(PYTHON)
            .arg("-c")
            .arg(DRIVER)
            .arg(target)
            .arg(code)
            .arg(variable.unwrap_or_default())
            .current_dir(&self.base_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LlmOsError::ToolNotFound(PYTHON.into()));
            }
            Err(e) => {
                return Err(LlmOsError::ToolFailed(format!("{PYTHON} execution failed: {e}")));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Python exited with {}", output.status);
            return Err(LlmOsError::ToolFailed(format!(
                "Error running python code: {}",
                last_lines(&stderr, 20)
            )));
        }

        Ok(extract_result(&stdout, variable))
    }

    /// Save `code` to `file_name` and run it.
    #[instrument(skip(self, code))]
    pub async fn save_to_file_and_run(
        &self,
        file_name: &str,
        code: &str,
        variable_to_return: Option<&str>,
        overwrite: bool,
    ) -> Result<String> {
        let path = resolve_in_dir(&self.base_dir, file_name)?;
        if path.exists() && !overwrite {
            return Ok(format!("File {} already exists", file_name));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, code).await?;
        info!("Saved python code to {}", path.display());

        self.execute(&path.to_string_lossy(), "", variable_to_return).await
    }

    #[instrument(skip(self))]
    pub async fn run_python_file_return_variable(
        &self,
        file_name: &str,
        variable_to_return: Option<&str>,
    ) -> Result<String> {
        let path = resolve_in_dir(&self.base_dir, file_name)?;
        if !path.exists() {
            return Err(LlmOsError::Tool(format!("File {} not found", file_name)));
        }
        self.execute(&path.to_string_lossy(), "", variable_to_return).await
    }

    pub async fn run_python_code(&self, code: &str, variable_to_return: Option<&str>) -> Result<String> {
        self.execute("-", code, variable_to_return).await
    }

    pub async fn read_file(&self, file_name: &str) -> Result<String> {
        let path = resolve_in_dir(&self.base_dir, file_name)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LlmOsError::Tool(format!("Error reading file {}: {}", file_name, e)))
    }

    pub fn list_files(&self) -> Result<String> {
        Ok(serde_json::to_string(&list_dir_files(&self.base_dir)?)?)
    }

    #[instrument(skip(self))]
    pub async fn pip_install_package(&self, package_name: &str) -> Result<String> {
        let package_name = package_name.trim();
        if !PACKAGE_RE.is_match(package_name) {
            return Err(LlmOsError::Tool(format!("Invalid package name: {}", package_name)));
        }

        let result = Command::new(PYTHON)
            .args(["-m", "pip", "install", package_name])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LlmOsError::ToolNotFound(PYTHON.into()));
            }
            Err(e) => return Err(LlmOsError::ToolFailed(format!("pip execution failed: {e}"))),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LlmOsError::ToolFailed(format!(
                "Error installing package {}: {}",
                package_name,
                last_lines(&stderr, 10)
            )));
        }

        Ok(format!("successfully installed package {}", package_name))
    }
}

/// Output after the result marker, or the whole output when no variable was requested.
fn extract_result(stdout: &str, variable: Option<&str>) -> String {
    match variable.filter(|v| !v.is_empty()) {
        Some(_) => stdout
            .split_once(RESULT_MARKER)
            .map(|(_, rest)| rest.trim().to_string())
            .unwrap_or_default(),
        None => {
            let printed = stdout.trim();
            if printed.is_empty() {
                "successfully ran python code".to_string()
            } else {
                printed.to_string()
            }
        }
    }
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

fn file_spec() -> Value {
    json!({
        "type": "object",
        "properties": {
            "file_name": {"type": "string", "description": "The name of the file."}
        },
        "required": ["file_name"]
    })
}

#[async_trait]
impl Toolkit for PythonTools {
    fn name(&self) -> &str {
        "python_tools"
    }

    fn functions(&self) -> Vec<FunctionSpec> {
        let mut functions = vec![
            FunctionSpec::new(
                "save_to_file_and_run",
                "Saves python code to a file called `file_name` and then runs it. If successful, returns the value of `variable_to_return` if provided, otherwise the printed output.",
                json!({
                    "type": "object",
                    "properties": {
                        "file_name": {"type": "string", "description": "The name of the file the code will be saved to."},
                        "code": {"type": "string", "description": "The code to save and run."},
                        "variable_to_return": {"type": "string", "description": "The variable to return."},
                        "overwrite": {"type": "boolean", "description": "Overwrite the file if it already exists.", "default": true}
                    },
                    "required": ["file_name", "code"]
                }),
            ),
            FunctionSpec::new(
                "run_python_file_return_variable",
                "Runs code in a python file. If successful, returns the value of `variable_to_return` if provided, otherwise the printed output.",
                json!({
                    "type": "object",
                    "properties": {
                        "file_name": {"type": "string", "description": "The name of the file to run."},
                        "variable_to_return": {"type": "string", "description": "The variable to return."}
                    },
                    "required": ["file_name"]
                }),
            ),
            FunctionSpec::new(
                "read_file",
                "Reads the contents of the file `file_name` and returns the contents if successful.",
                file_spec(),
            ),
            FunctionSpec::new(
                "list_files",
                "Returns a list of files in the base directory.",
                json!({"type": "object", "properties": {}}),
            ),
        ];

        if self.run_code {
            functions.push(FunctionSpec::new(
                "run_python_code",
                "Runs python code directly. If successful, returns the value of `variable_to_return` if provided, otherwise the printed output.",
                json!({
                    "type": "object",
                    "properties": {
                        "code": {"type": "string", "description": "The code to run."},
                        "variable_to_return": {"type": "string", "description": "The variable to return."}
                    },
                    "required": ["code"]
                }),
            ));
        }

        if self.pip_install {
            functions.push(FunctionSpec::new(
                "pip_install_package",
                "Installs a package using pip in the current environment.",
                json!({
                    "type": "object",
                    "properties": {
                        "package_name": {"type": "string", "description": "The name of the package to install."}
                    },
                    "required": ["package_name"]
                }),
            ));
        }

        functions
    }

    async fn call(&self, function: &str, args: &Value) -> Result<String> {
        let variable = opt_str_arg(args, "variable_to_return");
        match function {
            "save_to_file_and_run" => {
                let overwrite = opt_bool_arg(args, "overwrite").unwrap_or(true);
                self.save_to_file_and_run(str_arg(args, "file_name")?, str_arg(args, "code")?, variable, overwrite)
                    .await
            }
            "run_python_file_return_variable" => {
                self.run_python_file_return_variable(str_arg(args, "file_name")?, variable)
                    .await
            }
            "read_file" => self.read_file(str_arg(args, "file_name")?).await,
            "list_files" => self.list_files(),
            "run_python_code" if self.run_code => {
                self.run_python_code(str_arg(args, "code")?, variable).await
            }
            "pip_install_package" if self.pip_install => {
                self.pip_install_package(str_arg(args, "package_name")?).await
            }
            other => Err(LlmOsError::Tool(format!("Unknown python function: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_extract_result() {
        let stdout = "hello\n__LLMOS_RESULT__\n42\n";
        assert_eq!(extract_result(stdout, Some("answer")), "42");
        assert_eq!(extract_result("hello\n", None), "hello");
        assert_eq!(extract_result("", None), "successfully ran python code");
        assert_eq!(extract_result("", Some("x")), "");
    }

    #[test]
    fn test_package_name_validation() {
        for ok in ["pandas", "scikit-learn", "requests==2.31.0", "uvicorn[standard]", "numpy>=1.26"] {
            assert!(PACKAGE_RE.is_match(ok), "{ok}");
        }
        for bad in ["pandas; rm -rf /", "-r requirements.txt", "", "a b"] {
            assert!(!PACKAGE_RE.is_match(bad), "{bad}");
        }
    }

    #[test]
    fn test_functions_follow_switches() {
        let tools = PythonTools::new("/tmp");
        assert_eq!(tools.functions().len(), 4);

        let tools = PythonTools::new("/tmp").with_pip_install(true).with_run_code(true);
        let names: Vec<String> = tools.functions().into_iter().map(|f| f.name).collect();
        assert!(names.contains(&"pip_install_package".to_string()));
        assert!(names.contains(&"run_python_code".to_string()));
    }

    #[tokio::test]
    async fn test_rejects_paths_outside_base_dir() {
        let dir = tempdir().unwrap();
        let tools = PythonTools::new(dir.path());
        let result = tools
            .save_to_file_and_run("../evil.py", "print(1)", None, true)
            .await;
        assert!(matches!(result, Err(LlmOsError::Tool(_))));

        let result = tools.run_python_file_return_variable("missing.py", None).await;
        assert!(matches!(result, Err(LlmOsError::Tool(_))));
        assert!(tools.pip_install_package("x; ls").await.is_err());
    }
}
