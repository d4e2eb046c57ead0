//! HTTP API server command.

use crate::api::{self, Endpoints};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use std::sync::Arc;

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let orchestrator = Arc::new(Orchestrator::new(settings)?);

    let addr = format!("{}:{}", host, port);

    Output::header("llmos API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Ping", &format!("GET  {}", Endpoints::PING));
    Output::kv("Health", &format!("GET  {}", Endpoints::HEALTH));
    Output::kv("Chat", &format!("POST {}", Endpoints::ASSISTANT_CHAT));
    Output::kv("Runs", &format!("GET  {}?user_id=", Endpoints::ASSISTANT_RUNS));
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    api::serve(orchestrator, &addr).await?;
    Ok(())
}
