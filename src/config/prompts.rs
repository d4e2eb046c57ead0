//! Prompt templates for llmos.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    /// The front-line assistant.
    pub assistant: AssistantPrompts,
    /// The research report team member.
    pub research: ResearchPrompts,
    /// The code execution team member.
    pub python: PythonPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for the front-line assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantPrompts {
    pub name: String,
    pub description: String,
    pub instructions: Vec<String>,
    pub introduction: String,
    /// Shown when a run has no chat history yet.
    pub greeting: String,
    pub file_tools_instruction: String,
    pub python_delegation_instruction: String,
    pub research_delegation_instruction: String,
}

impl Default for AssistantPrompts {
    fn default() -> Self {
        Self {
            name: "LLM OS".to_string(),
            description: r#"You are the most advanced AI system in the world called `LLM OS`.
You have access to a set of tools and a team of AI Assistants at your disposal.
Your goal is to assist the user in the best way possible."#
                .to_string(),
            instructions: vec![
                "When the user sends a message, first **think** and determine if:\n \
                 - You can answer by using a tool available to you\n \
                 - You need to search the knowledge base\n \
                 - You need to search the internet\n \
                 - You need to delegate the task to a team member\n \
                 - You need to ask a clarifying question"
                    .to_string(),
                "If the user asks about a topic, first ALWAYS search your knowledge base using the `search_knowledge_base` tool.".to_string(),
                "If you dont find relevant information in your knowledge base, use the `duckduckgo_search` tool to search the internet.".to_string(),
                "If the user asks to summarize the conversation, use the `get_chat_history` tool with None as the argument.".to_string(),
                "If the users message is unclear, ask clarifying questions to get more information.".to_string(),
                "Carefully read the information you have gathered and provide a clear and concise answer to the user.".to_string(),
                "Do not use phrases like 'based on my knowledge' or 'depending on the information'.".to_string(),
                "You can delegate tasks to an AI Assistant in your team depending of their role and the tools available to them.".to_string(),
            ],
            introduction: r#"Hi, I'm your LLM OS.
I have access to a set of tools and AI Assistants to assist you.
Lets get started!"#
                .to_string(),
            greeting: "Ask me anything...".to_string(),
            file_tools_instruction: "You can use the `read_file` tool to read a file, `save_file` to save a file, and `list_files` to list files in the working directory.".to_string(),
            python_delegation_instruction: "To write and run python code, delegate the task to the `Python Assistant`.".to_string(),
            research_delegation_instruction: "To write a research report, delegate the task to the `Research Assistant`. \
                Return the report in the <report_format> to the user as is, without any additional text like 'here is the report'."
                .to_string(),
        }
    }
}

/// Prompts for the research report team member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchPrompts {
    pub name: String,
    pub role: String,
    pub description: String,
    pub instructions: Vec<String>,
    pub expected_output: String,
}

impl Default for ResearchPrompts {
    fn default() -> Self {
        Self {
            name: "Research Assistant".to_string(),
            role: "Write a research report on a given topic".to_string(),
            description: "You are a Senior New York Times researcher tasked with writing a cover story research report.".to_string(),
            instructions: vec![
                "For a given topic, use the `search_exa` to get the top 10 search results.".to_string(),
                "Carefully read the results and generate a final - NYT cover story worthy report in the format provided below.".to_string(),
                "Make your report engaging, informative, and well-structured.".to_string(),
                "Remember: you are writing for the New York Times, so the quality of the report is important.".to_string(),
            ],
            expected_output: r#"An engaging, informative, and well-structured report in the following format:

## Title

- **Overview** Brief introduction of the topic.
- **Importance** Why is this topic significant now?

### Section 1
- **Detail 1**
- **Detail 2**

### Section 2
- **Detail 1**
- **Detail 2**

## Conclusion
- **Summary of report:** Recap of the key findings from the report.
- **Implications:** What these findings mean for the future.

## References
- [Reference 1](Link to Source)
- [Reference 2](Link to Source)
"#
            .to_string(),
        }
    }
}

/// Prompts for the code execution team member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonPrompts {
    pub name: String,
    pub role: String,
    pub description: String,
    pub instructions: Vec<String>,
}

impl Default for PythonPrompts {
    fn default() -> Self {
        Self {
            name: "Python Assistant".to_string(),
            role: "Write and run python code".to_string(),
            description: "You are an expert in Python and can accomplish any task that is asked of you.".to_string(),
            instructions: vec![
                "Write python code to accomplish the task, save it to a file and run it using the `save_to_file_and_run` function.".to_string(),
                "If you need to return the answer to the user, set `variable_to_return` to the name of the variable that holds it.".to_string(),
                "Use `list_files` and `read_file` to inspect files in the working directory.".to_string(),
                "If a package is missing, install it with `pip_install_package` and run the code again.".to_string(),
                "If the code fails, read the error, fix the code and try again.".to_string(),
                "Only respond with the result of the task, and explain it briefly.".to_string(),
            ],
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let assistant_path = custom_path.join("assistant.toml");
            if assistant_path.exists() {
                let content = std::fs::read_to_string(&assistant_path)?;
                prompts.assistant = toml::from_str(&content)?;
            }

            let research_path = custom_path.join("research.toml");
            if research_path.exists() {
                let content = std::fs::read_to_string(&research_path)?;
                prompts.research = toml::from_str(&content)?;
            }

            let python_path = custom_path.join("python.toml");
            if python_path.exists() {
                let content = std::fs::read_to_string(&python_path)?;
                prompts.python = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a template with the custom config variables.
    pub fn render_custom(&self, template: &str) -> String {
        Self::render(template, &self.variables)
    }

    /// Render every entry of a list with the custom config variables.
    pub fn render_all(&self, templates: &[String]) -> Vec<String> {
        templates.iter().map(|t| self.render_custom(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert_eq!(prompts.assistant.name, "LLM OS");
        assert_eq!(prompts.assistant.instructions.len(), 8);
        assert!(prompts.research.expected_output.contains("## References"));
        assert_eq!(prompts.python.name, "Python Assistant");
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_custom_dir_overrides_research_prompts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("research.toml"),
            r#"
            description = "You are a {{outlet}} analyst."
            "#,
        )
        .unwrap();

        let mut vars = HashMap::new();
        vars.insert("outlet".to_string(), "Financial Times".to_string());

        let prompts = Prompts::load(Some(&dir.path().to_string_lossy()), Some(&vars)).unwrap();
        assert_eq!(
            prompts.render_custom(&prompts.research.description),
            "You are a Financial Times analyst."
        );
        // Fields missing from the override keep their defaults
        assert_eq!(prompts.research.name, "Research Assistant");
        assert_eq!(prompts.assistant.name, "LLM OS");
    }
}
