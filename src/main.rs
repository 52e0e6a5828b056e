use clap::Parser;
use tracing::debug;

use shortener::cli::Cli;
use shortener::config::init_config;
use shortener::interfaces::cli::run_cli_command;
use shortener::system::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    // 后续通过 get_config() 读取
    let config = init_config(cli.config.as_deref());

    // 保持 guard 存活直到退出，确保日志写完
    let guard = init_logging(&config.logging)?;
    debug!("Configuration loaded: backend = {}", config.storage.backend);

    if let Err(e) = run_cli_command(cli.command).await {
        eprintln!("{}", e.format_colored());
        drop(guard);
        std::process::exit(1);
    }

    drop(guard);
    Ok(())
}
