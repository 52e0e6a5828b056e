//! Delete / worker commands
//!
//! Both go through the deletion pipeline instead of calling storage
//! directly, so batching and flush behavior are the same as in a service.

use colored::Colorize;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::config::ShutdownPolicy;
use crate::interfaces::cli::CliError;
use crate::system::lifetime::{StartupContext, listen_for_shutdown, shutdown_gracefully};

/// One line of worker input
#[derive(Debug, Deserialize)]
pub struct WorkerRequest {
    pub owner_id: String,
    pub short_codes: Vec<String>,
}

pub async fn delete_links(
    ctx: &StartupContext,
    user: &str,
    short_codes: Vec<String>,
) -> Result<(), CliError> {
    // Drain：退出前确保请求已经刷到存储
    let pipeline = ctx.start_pipeline(Some(ShutdownPolicy::Drain))?;

    let count = short_codes.len();
    let enqueued = pipeline.enqueue(user, short_codes);
    shutdown_gracefully(Some(pipeline.as_ref()), &ctx.service).await;
    enqueued?;

    println!(
        "{} Deletion of {} codes for {} submitted",
        "✓".bold().green(),
        count.to_string().cyan(),
        user.magenta()
    );
    Ok(())
}

pub async fn run_worker(ctx: &StartupContext) -> Result<(), CliError> {
    let pipeline = ctx.start_pipeline(None)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut accepted = 0usize;

    let result = loop {
        let line = tokio::select! {
            _ = listen_for_shutdown() => break Ok(()),
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(CliError::CommandError(format!("Failed to read stdin: {}", e))),
        };
        if line.trim().is_empty() {
            continue;
        }

        let request: WorkerRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Skipping malformed worker line: {}", e);
                continue;
            }
        };

        if let Err(e) = pipeline.enqueue(&request.owner_id, request.short_codes) {
            break Err(e.into());
        }
        accepted += 1;
    };

    shutdown_gracefully(Some(pipeline.as_ref()), &ctx.service).await;
    println!(
        "{} Worker stopped after {} requests",
        "ℹ".bold().blue(),
        accepted.to_string().cyan()
    );
    result
}
