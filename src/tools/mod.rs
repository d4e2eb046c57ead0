//! Toolkits the assistant can call.
//!
//! A [`Toolkit`] groups related functions (a calculator, a web search...).
//! Each function is described to the model by a [`FunctionSpec`] and invoked
//! with the JSON arguments the model produced.

mod calculator;
mod duckduckgo;
mod exa;
mod file;
mod finance;
mod python;

pub use calculator::{Calculator, CalculatorBuilder};
pub use duckduckgo::DuckDuckGo;
pub use exa::{ExaTools, EXA_API_KEY_ENV};
pub use file::FileTools;
pub use finance::{YFinanceTools, YFinanceToolsBuilder};
pub use python::PythonTools;

use crate::error::{LlmOsError, Result};
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Description of one callable function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

impl FunctionSpec {
    pub fn new(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    /// Chat-completion tool definition for this function.
    pub fn to_openai(&self) -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: self.name.clone(),
                description: Some(self.description.clone()),
                parameters: Some(self.parameters.clone()),
                strict: None,
            },
        }
    }
}

/// A group of functions exposed to the model.
#[async_trait]
pub trait Toolkit: Send + Sync {
    /// Toolkit name, shown in team rosters.
    fn name(&self) -> &str;

    /// Functions this toolkit provides.
    fn functions(&self) -> Vec<FunctionSpec>;

    /// Invoke `function` with the model-supplied arguments.
    async fn call(&self, function: &str, args: &Value) -> Result<String>;
}

/// Resolves function names to the toolkit that owns them.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    toolkits: Vec<Arc<dyn Toolkit>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a toolkit. A function name already registered keeps its
    /// first owner.
    pub fn register(&mut self, toolkit: Arc<dyn Toolkit>) {
        let position = self.toolkits.len();
        for function in toolkit.functions() {
            self.index.entry(function.name).or_insert(position);
        }
        self.toolkits.push(toolkit);
    }

    pub fn get(&self, function: &str) -> Option<Arc<dyn Toolkit>> {
        self.index
            .get(function)
            .and_then(|&i| self.toolkits.get(i))
            .cloned()
    }

    pub fn toolkits(&self) -> &[Arc<dyn Toolkit>] {
        &self.toolkits
    }

    /// Every registered function, in registration order.
    pub fn functions(&self) -> Vec<FunctionSpec> {
        self.toolkits.iter().flat_map(|t| t.functions()).collect()
    }

    pub fn function_names(&self) -> Vec<String> {
        self.functions().into_iter().map(|f| f.name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.toolkits.is_empty()
    }

    /// Call a function by name.
    pub async fn call(&self, function: &str, args: &Value) -> Result<String> {
        let toolkit = self
            .get(function)
            .ok_or_else(|| LlmOsError::Tool(format!("Unknown function: {}", function)))?;
        toolkit.call(function, args).await
    }
}

/// Required string argument.
pub(crate) fn str_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| LlmOsError::Tool(format!("Missing '{}' argument", key)))
}

/// Optional string argument.
pub(crate) fn opt_str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

/// Required numeric argument. Numbers sent as strings are accepted.
pub(crate) fn f64_arg(args: &Value, key: &str) -> Result<f64> {
    match args.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| LlmOsError::Tool(format!("Missing or invalid '{}' argument", key)))
}

/// Optional integer argument. Numbers sent as strings are accepted.
pub(crate) fn opt_u64_arg(args: &Value, key: &str) -> Option<u64> {
    match args.get(key) {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Optional boolean argument.
pub(crate) fn opt_bool_arg(args: &Value, key: &str) -> Option<bool> {
    match args.get(key) {
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Resolve a model-supplied relative path inside `base_dir`.
///
/// Absolute paths and parent-directory components are rejected.
pub(crate) fn resolve_in_dir(base_dir: &Path, file_name: &str) -> Result<PathBuf> {
    let relative = Path::new(file_name.trim());
    if file_name.trim().is_empty() {
        return Err(LlmOsError::Tool("File name is empty".to_string()));
    }

    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(LlmOsError::Tool(format!(
                    "Path '{}' is outside the working directory",
                    file_name
                )))
            }
        }
    }

    Ok(base_dir.join(relative))
}

/// Names of the regular files in `dir`, sorted.
pub(crate) fn list_dir_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{FunctionSpec, Toolkit};
    use crate::error::Result;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    /// Toolkit that echoes its arguments back.
    pub struct EchoToolkit;

    #[async_trait]
    impl Toolkit for EchoToolkit {
        fn name(&self) -> &str {
            "echo"
        }

        fn functions(&self) -> Vec<FunctionSpec> {
            vec![FunctionSpec::new(
                "echo",
                "Echo the text back",
                json!({"type": "object", "properties": {"text": {"type": "string"}}}),
            )]
        }

        async fn call(&self, _function: &str, args: &Value) -> Result<String> {
            Ok(args["text"].as_str().unwrap_or_default().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::EchoToolkit;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_registry_routes_calls() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());
        registry.register(Arc::new(EchoToolkit));
        registry.register(Arc::new(CalculatorBuilder::new().add().build()));

        assert_eq!(registry.function_names(), vec!["echo", "add"]);
        assert_eq!(
            registry.call("echo", &json!({"text": "hi"})).await.unwrap(),
            "hi"
        );
        assert!(registry.call("add", &json!({"a": 1, "b": 2})).await.unwrap().contains("3"));
        assert!(matches!(
            registry.call("nope", &json!({})).await,
            Err(LlmOsError::Tool(_))
        ));
    }

    #[test]
    fn test_function_spec_to_openai() {
        let spec = FunctionSpec::new("echo", "Echo", json!({"type": "object"}));
        let tool = spec.to_openai();
        assert_eq!(tool.function.name, "echo");
        assert_eq!(tool.function.description.as_deref(), Some("Echo"));
    }

    #[test]
    fn test_argument_helpers() {
        let args = json!({"a": "2.5", "n": 3, "flag": "true", "s": "x"});
        assert_eq!(f64_arg(&args, "a").unwrap(), 2.5);
        assert_eq!(opt_u64_arg(&args, "n"), Some(3));
        assert_eq!(opt_bool_arg(&args, "flag"), Some(true));
        assert_eq!(str_arg(&args, "s").unwrap(), "x");
        assert!(str_arg(&args, "missing").is_err());
    }

    #[test]
    fn test_resolve_in_dir_rejects_escapes() {
        let base = Path::new("/work");
        assert_eq!(
            resolve_in_dir(base, "notes/a.txt").unwrap(),
            PathBuf::from("/work/notes/a.txt")
        );
        assert!(resolve_in_dir(base, "../etc/passwd").is_err());
        assert!(resolve_in_dir(base, "/etc/passwd").is_err());
        assert!(resolve_in_dir(base, " ").is_err());
    }
}
