//! File tools scoped to a working directory.

use super::{list_dir_files, opt_bool_arg, resolve_in_dir, str_arg, FunctionSpec, Toolkit};
use crate::error::{LlmOsError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Read, write and list files under `base_dir`.
pub struct FileTools {
    base_dir: PathBuf,
}

impl FileTools {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Save `contents` to `file_name`; returns the file name.
    #[instrument(skip(self, contents))]
    pub async fn save_file(&self, contents: &str, file_name: &str, overwrite: bool) -> Result<String> {
        let path = resolve_in_dir(&self.base_dir, file_name)?;
        if path.exists() && !overwrite {
            return Ok(format!("File {} already exists", file_name));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, contents).await?;
        info!("Saved {}", path.display());
        Ok(file_name.to_string())
    }

    pub async fn read_file(&self, file_name: &str) -> Result<String> {
        let path = resolve_in_dir(&self.base_dir, file_name)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LlmOsError::Tool(format!("Error reading file {}: {}", file_name, e)))
    }

    /// JSON list of file names in the working directory.
    pub fn list_files(&self) -> Result<String> {
        Ok(serde_json::to_string(&list_dir_files(&self.base_dir)?)?)
    }
}

#[async_trait]
impl Toolkit for FileTools {
    fn name(&self) -> &str {
        "file_tools"
    }

    fn functions(&self) -> Vec<FunctionSpec> {
        vec![
            FunctionSpec::new(
                "save_file",
                "Saves the contents to a file called `file_name` and returns the file name if successful.",
                json!({
                    "type": "object",
                    "properties": {
                        "contents": {"type": "string", "description": "The contents to save."},
                        "file_name": {"type": "string", "description": "The name of the file to save to."},
                        "overwrite": {"type": "boolean", "description": "Overwrite the file if it already exists.", "default": true}
                    },
                    "required": ["contents", "file_name"]
                }),
            ),
            FunctionSpec::new(
                "read_file",
                "Reads the contents of the file `file_name` and returns the contents if successful.",
                json!({
                    "type": "object",
                    "properties": {
                        "file_name": {"type": "string", "description": "The name of the file to read."}
                    },
                    "required": ["file_name"]
                }),
            ),
            FunctionSpec::new(
                "list_files",
                "Returns a list of files in the base directory.",
                json!({"type": "object", "properties": {}}),
            ),
        ]
    }

    async fn call(&self, function: &str, args: &Value) -> Result<String> {
        match function {
            "save_file" => {
                let overwrite = opt_bool_arg(args, "overwrite").unwrap_or(true);
                self.save_file(str_arg(args, "contents")?, str_arg(args, "file_name")?, overwrite)
                    .await
            }
            "read_file" => self.read_file(str_arg(args, "file_name")?).await,
            "list_files" => self.list_files(),
            other => Err(LlmOsError::Tool(format!("Unknown file function: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_read_list() {
        let dir = tempdir().unwrap();
        let tools = FileTools::new(dir.path());

        let saved = tools
            .call("save_file", &json!({"contents": "hello", "file_name": "notes.txt"}))
            .await
            .unwrap();
        assert_eq!(saved, "notes.txt");

        let read = tools.call("read_file", &json!({"file_name": "notes.txt"})).await.unwrap();
        assert_eq!(read, "hello");

        let listed = tools.call("list_files", &json!({})).await.unwrap();
        assert_eq!(listed, r#"["notes.txt"]"#);
    }

    #[tokio::test]
    async fn test_overwrite_flag() {
        let dir = tempdir().unwrap();
        let tools = FileTools::new(dir.path());

        tools.save_file("one", "a.txt", true).await.unwrap();
        let result = tools.save_file("two", "a.txt", false).await.unwrap();
        assert!(result.contains("already exists"));
        assert_eq!(tools.read_file("a.txt").await.unwrap(), "one");
    }

    #[tokio::test]
    async fn test_rejects_paths_outside_base_dir() {
        let dir = tempdir().unwrap();
        let tools = FileTools::new(dir.path().join("inner"));

        assert!(tools.save_file("x", "../escape.txt", true).await.is_err());
        assert!(tools.read_file("/etc/hostname").await.is_err());
        assert_eq!(tools.list_files().unwrap(), "[]");
    }
}
