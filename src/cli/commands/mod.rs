//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod doctor;
mod init;
mod knowledge;
mod runs;
mod serve;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use init::run_init;
pub use knowledge::run_knowledge;
pub use runs::run_runs;
pub use serve::run_serve;
