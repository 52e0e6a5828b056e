//! Get / list / ping commands

use std::time::Duration;

use colored::Colorize;

use crate::interfaces::cli::{CliError, bounded};
use crate::services::ShortenerService;

pub async fn get_link(
    service: &ShortenerService,
    limit: Duration,
    short_code: &str,
) -> Result<(), CliError> {
    match bounded(limit, service.get_orig_url_by_short(short_code)).await {
        Ok(url) => {
            println!("{}", url);
            Ok(())
        }
        Err(e) if e.is_deleted() => {
            println!("{} {} has been deleted", "✗".bold().red(), short_code.cyan());
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn list_links(
    service: &ShortenerService,
    limit: Duration,
    user: &str,
    json: bool,
) -> Result<(), CliError> {
    let pairs = match bounded(limit, service.get_user_urls(user)).await {
        Ok(pairs) => pairs,
        // 没有链接不算错误
        Err(e) if e.is_not_exist() => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    if json {
        let out = serde_json::to_string_pretty(&pairs)
            .map_err(|e| CliError::CommandError(format!("Failed to encode JSON: {}", e)))?;
        println!("{}", out);
        return Ok(());
    }

    if pairs.is_empty() {
        println!("{} No links for {}", "ℹ".bold().blue(), user.magenta());
        return Ok(());
    }

    println!("{}", format!("Links for {}:", user).bold().green());
    for pair in &pairs {
        println!(
            "  {} -> {}",
            pair.short_code.cyan(),
            pair.original_url.blue().underline()
        );
    }
    println!("{} {} links", "ℹ".bold().blue(), pairs.len());
    Ok(())
}

pub async fn ping_storage(
    service: &ShortenerService,
    limit: Duration,
    backend: &str,
) -> Result<(), CliError> {
    bounded(limit, service.ping()).await?;
    println!(
        "{} Storage backend {} is reachable",
        "✓".bold().green(),
        backend.cyan()
    );
    Ok(())
}
