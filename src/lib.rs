//! llmos - an LLM assistant that uses tools, delegates and remembers
//!
//! One front-line assistant answers in a tool-calling loop. It can use a
//! calculator, DuckDuckGo search, file tools and Yahoo Finance, hand tasks to
//! a Python assistant or an Exa-backed research assistant, search a knowledge
//! base built from websites and PDFs, and keep every run in SQLite so a
//! conversation can be resumed.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `openai` - OpenAI client construction
//! - `embedding` - Embedding generation
//! - `document` - Website and PDF readers, chunking
//! - `vector_store` - Vector storage and similarity search
//! - `knowledge` - Knowledge base over a vector store
//! - `storage` - Persistence of assistant runs
//! - `tools` - Toolkits the assistant can call
//! - `assistant` - The assistant loop, memory and team
//! - `orchestrator` - Service wiring
//! - `session` - Interactive chat state
//! - `api` - HTTP routes
//!
//! # Example
//!
//! ```rust,no_run
//! use llmos::config::Settings;
//! use llmos::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let mut options = orchestrator.settings().assistant_options();
//!     options.user_id = Some("ada".to_string());
//!
//!     let mut assistant = orchestrator.build_llm_os(&options)?;
//!     let response = assistant.run("What is 10!").await?;
//!     println!("{}", response.content);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod assistant;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod knowledge;
pub mod openai;
pub mod orchestrator;
pub mod session;
pub mod storage;
pub mod tools;
pub mod vector_store;

pub use error::{LlmOsError, Result};
