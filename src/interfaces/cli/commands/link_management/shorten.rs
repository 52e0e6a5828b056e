//! Shorten / batch commands

use std::time::Duration;

use colored::Colorize;

use crate::errors::ShortenerError;
use crate::interfaces::cli::{CliError, bounded};
use crate::services::ShortenerService;
use crate::storage::UrlPair;

fn print_created(pair: &UrlPair) {
    println!(
        "{} Shortened: {} -> {}",
        "✓".bold().green(),
        pair.short_code.cyan(),
        pair.original_url.blue().underline()
    );
}

/// 已有映射属于同一用户且正是本次请求的唯一 URL 时视为成功（幂等）；
/// 其他冲突（哈希碰撞、批量中只有部分重复）照常报错
fn report_conflict(err: ShortenerError, user: &str, urls: &[&str]) -> Result<(), CliError> {
    let already_shortened = err.existing_pair().filter(|existing| {
        existing.owner_id == user
            && !urls.is_empty()
            && urls.iter().all(|url| url.trim() == existing.original_url)
    });

    match already_shortened {
        Some(existing) => {
            println!(
                "{} Already shortened: {} -> {} (owner: {})",
                "ℹ".bold().blue(),
                existing.short_code.cyan(),
                existing.original_url.blue().underline(),
                existing.owner_id.magenta()
            );
            Ok(())
        }
        None => Err(err.into()),
    }
}

pub async fn shorten_link(
    service: &ShortenerService,
    limit: Duration,
    user: &str,
    url: &str,
) -> Result<(), CliError> {
    match bounded(limit, service.shorten_url(user, url)).await {
        Ok(pair) => {
            print_created(&pair);
            Ok(())
        }
        Err(e) if e.is_conflict() => report_conflict(e, user, &[url]),
        Err(e) => Err(e.into()),
    }
}

pub async fn batch_shorten(
    service: &ShortenerService,
    limit: Duration,
    user: &str,
    urls: &[String],
) -> Result<(), CliError> {
    match bounded(limit, service.batch_shorten_url(user, urls)).await {
        Ok(pairs) => {
            for pair in &pairs {
                print_created(pair);
            }
            println!(
                "{} {} links created for {}",
                "✓".bold().green(),
                pairs.len().to_string().cyan(),
                user.magenta()
            );
            Ok(())
        }
        Err(e) if e.is_conflict() => {
            let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
            report_conflict(e, user, &urls)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict_with(owner: &str, url: &str) -> ShortenerError {
        ShortenerError::Conflict {
            short_code: "abc12345".to_string(),
            existing: Some(Box::new(UrlPair::new(owner, "abc12345", url))),
        }
    }

    #[test]
    fn test_same_owner_and_url_is_idempotent() {
        let err = conflict_with("alice", "https://example.com");
        assert!(report_conflict(err, "alice", &[" https://example.com "]).is_ok());
    }

    #[test]
    fn test_hash_collision_with_other_owner_is_an_error() {
        let err = conflict_with("bob", "https://example.com");
        assert!(report_conflict(err, "alice", &["https://example.com"]).is_err());
    }

    #[test]
    fn test_hash_collision_with_other_url_is_an_error() {
        let err = conflict_with("alice", "https://a.example.com");
        assert!(report_conflict(err, "alice", &["https://b.example.com"]).is_err());
    }

    #[test]
    fn test_partial_batch_conflict_is_an_error() {
        let err = conflict_with("alice", "https://a.example.com");
        let urls = ["https://a.example.com", "https://new.example.com"];
        assert!(report_conflict(err, "alice", &urls).is_err());
    }

    #[test]
    fn test_conflict_without_existing_pair_is_an_error() {
        let err = ShortenerError::conflict("abc12345");
        assert!(report_conflict(err, "alice", &["https://example.com"]).is_err());
    }
}
