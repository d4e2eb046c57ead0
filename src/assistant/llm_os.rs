//! Assembly of the LLM OS assistant and its team.

use super::builder::AssistantBuilder;
use super::model::ChatModel;
use super::runner::Assistant;
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::knowledge::AssistantKnowledge;
use crate::storage::AssistantStorage;
use crate::tools::{
    CalculatorBuilder, DuckDuckGo, ExaTools, FileTools, PythonTools, Toolkit, YFinanceTools,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Which toolkits and team members the LLM OS gets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantOptions {
    pub calculator: bool,
    pub ddg_search: bool,
    pub file_tools: bool,
    pub finance_tools: bool,
    pub python_assistant: bool,
    pub research_assistant: bool,
    pub run_id: Option<String>,
    pub user_id: Option<String>,
    pub debug_mode: bool,
}

/// External services the assistant talks to.
#[derive(Clone)]
pub struct AssistantDeps {
    pub llm: Arc<dyn ChatModel>,
    pub storage: Option<Arc<dyn AssistantStorage>>,
    pub knowledge: Option<Arc<AssistantKnowledge>>,
}

/// Build the LLM OS assistant for the given flags.
pub fn build_llm_os(
    options: &AssistantOptions,
    settings: &Settings,
    prompts: &Prompts,
    deps: &AssistantDeps,
) -> Result<Assistant> {
    let mut tools: Vec<Arc<dyn Toolkit>> = Vec::new();
    let mut extra_instructions: Vec<String> = Vec::new();

    if options.calculator {
        tools.push(Arc::new(CalculatorBuilder::new().all().build()));
    }
    if options.ddg_search {
        tools.push(Arc::new(
            DuckDuckGo::new().with_fixed_max_results(settings.tools.ddg_max_results),
        ));
    }
    if options.finance_tools {
        tools.push(Arc::new(YFinanceTools::builder().all().build()));
    }
    if options.file_tools {
        tools.push(Arc::new(FileTools::new(settings.workspace_dir())));
        extra_instructions.push(prompts.render_custom(&prompts.assistant.file_tools_instruction));
    }

    let mut team: Vec<Assistant> = Vec::new();
    if options.python_assistant {
        team.push(python_assistant(options, settings, prompts, deps)?);
        extra_instructions
            .push(prompts.render_custom(&prompts.assistant.python_delegation_instruction));
    }
    if options.research_assistant {
        team.push(research_assistant(options, settings, prompts, deps));
        extra_instructions
            .push(prompts.render_custom(&prompts.assistant.research_delegation_instruction));
    }

    debug!(
        "Building LLM OS with {} toolkits and {} team members",
        tools.len(),
        team.len()
    );

    let mut builder = AssistantBuilder::new(deps.llm.clone())
        .name(prompts.render_custom(&prompts.assistant.name))
        .maybe_run_id(options.run_id.clone())
        .maybe_user_id(options.user_id.clone())
        .description(prompts.render_custom(&prompts.assistant.description))
        .instructions(prompts.render_all(&prompts.assistant.instructions))
        .extra_instructions(extra_instructions)
        .tools(tools)
        .team(team)
        .show_tool_calls(true)
        .search_knowledge(true)
        .read_chat_history(true)
        .add_chat_history_to_messages(true)
        .num_history_messages(6)
        .markdown(true)
        .add_datetime_to_instructions(true)
        .introduction(prompts.render_custom(&prompts.assistant.introduction))
        .output_dir(settings.workspace_dir())
        .debug_mode(options.debug_mode);

    if let Some(storage) = &deps.storage {
        builder = builder.storage(storage.clone());
    }
    if let Some(knowledge) = &deps.knowledge {
        builder = builder.knowledge(knowledge.clone());
    }

    Ok(builder.build())
}

fn python_assistant(
    options: &AssistantOptions,
    settings: &Settings,
    prompts: &Prompts,
    deps: &AssistantDeps,
) -> Result<Assistant> {
    let python = &prompts.python;
    let tools = PythonTools::new(settings.scratch_dir()?).with_pip_install(true);

    Ok(AssistantBuilder::new(deps.llm.clone())
        .name(prompts.render_custom(&python.name))
        .role(prompts.render_custom(&python.role))
        .description(prompts.render_custom(&python.description))
        .instructions(prompts.render_all(&python.instructions))
        .tool(Arc::new(tools))
        .markdown(true)
        .debug_mode(options.debug_mode)
        .build())
}

fn research_assistant(
    options: &AssistantOptions,
    settings: &Settings,
    prompts: &Prompts,
    deps: &AssistantDeps,
) -> Assistant {
    let research = &prompts.research;
    let exa = ExaTools::new(settings.exa.num_results, settings.exa.text_length_limit);

    AssistantBuilder::new(deps.llm.clone())
        .name(prompts.render_custom(&research.name))
        .role(prompts.render_custom(&research.role))
        .description(prompts.render_custom(&research.description))
        .instructions(prompts.render_all(&research.instructions))
        .expected_output(prompts.render_custom(&research.expected_output))
        .tool(Arc::new(exa))
        .markdown(true)
        .add_datetime_to_instructions(true)
        .save_output_to_file("scratch/{run_id}.md")
        .output_dir(settings.workspace_dir())
        .debug_mode(options.debug_mode)
        .build()
}

#[cfg(test)]
mod tests {
    use super::super::testing::ScriptedModel;
    use super::*;
    use tempfile::tempdir;

    fn settings_in(dir: &std::path::Path) -> Settings {
        let mut settings = Settings::default();
        settings.general.workspace_dir = dir.to_string_lossy().to_string();
        settings
    }

    fn deps() -> AssistantDeps {
        AssistantDeps {
            llm: Arc::new(ScriptedModel::new(vec![])),
            storage: None,
            knowledge: None,
        }
    }

    #[test]
    fn test_calculator_flag_adds_calculator() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());
        let prompts = Prompts::default();

        let without = build_llm_os(&AssistantOptions::default(), &settings, &prompts, &deps()).unwrap();
        assert!(!without.function_names().contains(&"add".to_string()));

        let options = AssistantOptions {
            calculator: true,
            ..AssistantOptions::default()
        };
        let with = build_llm_os(&options, &settings, &prompts, &deps()).unwrap();
        let names = with.function_names();
        for f in ["add", "subtract", "multiply", "divide", "exponentiate", "factorial", "is_prime", "square_root"] {
            assert!(names.contains(&f.to_string()), "missing {f}");
        }
        assert_eq!(with.tools().toolkits().len(), 1);
    }

    #[test]
    fn test_flags_select_tools_and_team() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());
        let prompts = Prompts::default();

        let options = AssistantOptions {
            ddg_search: true,
            file_tools: true,
            finance_tools: true,
            python_assistant: true,
            research_assistant: true,
            user_id: Some("ada".to_string()),
            ..AssistantOptions::default()
        };
        let assistant = build_llm_os(&options, &settings, &prompts, &deps()).unwrap();

        let names = assistant.function_names();
        assert!(names.contains(&"duckduckgo_search".to_string()));
        assert!(names.contains(&"get_company_news".to_string()));
        assert!(names.contains(&"save_file".to_string()));
        assert!(names.contains(&"get_chat_history".to_string()));
        assert!(names.contains(&"delegate_task_0".to_string()));
        assert!(names.contains(&"delegate_task_1".to_string()));
        // No knowledge base configured
        assert!(!names.contains(&"search_knowledge_base".to_string()));

        assert_eq!(assistant.name(), Some("LLM OS"));
        assert_eq!(assistant.user_id(), Some("ada"));
        assert_eq!(assistant.team()[0].name(), Some("Python Assistant"));
        assert_eq!(assistant.team()[1].name(), Some("Research Assistant"));
        assert!(assistant.team()[0]
            .function_names()
            .contains(&"pip_install_package".to_string()));
        assert!(dir.path().join("scratch").is_dir());

        let prompt = assistant.system_prompt();
        assert!(prompt.contains("`read_file` tool"));
        assert!(prompt.contains("delegate the task to the `Python Assistant`"));
        assert!(prompt.contains("Role: Write and run python code"));
        assert!(prompt.contains("Available tools: search_exa"));
    }
}
