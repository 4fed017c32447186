mod analysis;
mod api;
mod cli;
mod config;
mod errors;
mod guard;
mod models;
mod profile;
mod state;
mod tasks;
#[cfg(test)]
mod testing;
mod workflow;

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::HttpMatchApi;
use crate::cli::{render, ConsoleLauncher};
use crate::config::Config;
use crate::state::WorkflowSettings;
use crate::workflow::ClosureWorkflow;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Structured logging on stderr, so it never interleaves with command output
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting skill-gap client v{}", env!("CARGO_PKG_VERSION"));

    let api = HttpMatchApi::new(
        config.api_base_url.clone(),
        config.api_token.clone(),
        config.http_timeout,
    )?;
    info!("Backend: {}", config.api_base_url);

    let workflow = match ClosureWorkflow::connect(
        Arc::new(api),
        WorkflowSettings::from_config(&config),
        Arc::new(ConsoleLauncher),
    )
    .await
    {
        Ok(workflow) => workflow,
        Err(e) => {
            println!("{}", render::notice(&e.to_notice()));
            return Ok(());
        }
    };
    println!("Signed in as {}.", workflow.user().username);

    match workflow.bootstrap().await {
        Ok(boot) => {
            if let Some(profile) = &boot.profile {
                println!(
                    "Using stored résumé #{} ({} skills). {} learning tasks.",
                    profile.id,
                    profile.skills.len(),
                    boot.task_count
                );
            } else {
                println!("No stored résumé yet. {} learning tasks.", boot.task_count);
            }
        }
        Err(e) => {
            error!("Bootstrap failed: {e}");
            let notice = e.to_notice();
            println!("{}", render::notice(&notice));
            if notice.requires_login {
                return Ok(());
            }
        }
    }

    cli::run(workflow).await
}
