//! CLI interface module
//!
//! Dispatches parsed [`Commands`] onto the core: every storage call is
//! bounded by `storage.timeout`, and storage is closed before returning.

pub mod commands;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::cli::Commands;
use crate::config::get_config;
use crate::errors::ShortenerError;
use crate::system::lifetime::{StartupContext, prepare_startup, shutdown_gracefully};
use commands::{
    batch_shorten, delete_links, generate_config, get_link, list_links, ping_storage,
    run_worker, shorten_link,
};

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<ShortenerError> for CliError {
    fn from(err: ShortenerError) -> Self {
        match err {
            ShortenerError::Validation(msg) => CliError::ParseError(msg),
            other => CliError::StorageError(other.to_string()),
        }
    }
}

/// 给一次存储调用加上超时
pub(crate) async fn bounded<T, F>(limit: Duration, fut: F) -> crate::errors::Result<T>
where
    F: Future<Output = crate::errors::Result<T>>,
{
    tokio::time::timeout(limit, fut).await?
}

async fn close_and_return(ctx: &StartupContext, result: Result<(), CliError>) -> Result<(), CliError> {
    shutdown_gracefully(None, &ctx.service).await;
    result
}

/// Run a CLI command from clap-parsed input
///
/// Reads the global configuration, so `init_config()` must have run first.
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    let config = get_config();
    let limit = config.storage.timeout();

    match cmd {
        // config-gen 不需要存储
        Commands::ConfigGen { output_path, force } => generate_config(output_path, force).await,
        Commands::Shorten { user, url } => {
            let ctx = prepare_startup(config).await?;
            let result = shorten_link(&ctx.service, limit, &user, &url).await;
            close_and_return(&ctx, result).await
        }
        Commands::Batch { user, urls } => {
            let ctx = prepare_startup(config).await?;
            let result = batch_shorten(&ctx.service, limit, &user, &urls).await;
            close_and_return(&ctx, result).await
        }
        Commands::Get { short_code } => {
            let ctx = prepare_startup(config).await?;
            let result = get_link(&ctx.service, limit, &short_code).await;
            close_and_return(&ctx, result).await
        }
        Commands::List { user, json } => {
            let ctx = prepare_startup(config).await?;
            let result = list_links(&ctx.service, limit, &user, json).await;
            close_and_return(&ctx, result).await
        }
        Commands::Ping => {
            let ctx = prepare_startup(config).await?;
            let result = ping_storage(&ctx.service, limit, ctx.storage.backend_name()).await;
            close_and_return(&ctx, result).await
        }
        // 管道命令自己负责关闭
        Commands::Delete { user, short_codes } => {
            let ctx = prepare_startup(config).await?;
            delete_links(&ctx, &user, short_codes).await
        }
        Commands::Worker => {
            let ctx = prepare_startup(config).await?;
            run_worker(&ctx).await
        }
    }
}
