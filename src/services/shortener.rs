//! Shortening / retrieval service
//!
//! Thin orchestration over the configured [`Storage`]: validates input,
//! derives codes through the injected [`UrlHasher`] and turns a conflict
//! into a recoverable outcome carrying the pair that already owns the code.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::hasher::UrlHasher;
use crate::deletion::DeletionSink;
use crate::errors::{Result, ShortenerError};
use crate::storage::{DeletionRequest, Storage, UrlPair};
use crate::utils::{is_valid_short_code, validate_original_url};

pub struct ShortenerService {
    storage: Arc<dyn Storage>,
    hasher: Arc<dyn UrlHasher>,
}

impl ShortenerService {
    pub fn new(storage: Arc<dyn Storage>, hasher: Arc<dyn UrlHasher>) -> Self {
        Self { storage, hasher }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// 给冲突错误补上已存在的映射；查不到时保持原样
    async fn attach_existing(&self, err: ShortenerError) -> ShortenerError {
        match err {
            ShortenerError::Conflict {
                short_code,
                existing: None,
            } => {
                let existing = match self.storage.get_url_pair_by_short(&short_code).await {
                    Ok(pair) => Some(Box::new(pair)),
                    Err(e) => {
                        debug!("Conflicting code '{}' not readable: {}", short_code, e);
                        None
                    }
                };
                ShortenerError::Conflict {
                    short_code,
                    existing,
                }
            }
            other => other,
        }
    }

    /// 生成短链接
    ///
    /// On conflict the error carries the existing pair
    /// (see [`ShortenerError::existing_pair`]) so callers can answer
    /// idempotently.
    pub async fn shorten_url(&self, owner_id: &str, original_url: &str) -> Result<UrlPair> {
        let original_url = original_url.trim();
        validate_original_url(original_url)?;

        let pair = UrlPair::new(
            owner_id,
            self.hasher.hash(owner_id, original_url),
            original_url,
        );

        match self.storage.add_url_pair(pair.clone()).await {
            Ok(()) => {
                info!(
                    "ShortenerService: created '{}' -> '{}'",
                    pair.short_code, pair.original_url
                );
                Ok(pair)
            }
            Err(e) if e.is_conflict() => Err(self.attach_existing(e).await),
            Err(e) => Err(e),
        }
    }

    /// 批量生成短链接
    ///
    /// Duplicate URLs in one request collapse to a single pair; the result
    /// keeps the order of first appearance.
    pub async fn batch_shorten_url(
        &self,
        owner_id: &str,
        original_urls: &[String],
    ) -> Result<Vec<UrlPair>> {
        let mut seen = HashSet::with_capacity(original_urls.len());
        let mut pairs = Vec::with_capacity(original_urls.len());

        for raw in original_urls {
            let url = raw.trim();
            validate_original_url(url)?;
            if seen.insert(url) {
                pairs.push(UrlPair::new(owner_id, self.hasher.hash(owner_id, url), url));
            }
        }

        if pairs.is_empty() {
            return Ok(pairs);
        }

        match self.storage.add_batch_url_pairs(pairs.clone()).await {
            Ok(()) => {
                info!(
                    "ShortenerService: batch created {} links for user {}",
                    pairs.len(),
                    owner_id
                );
                Ok(pairs)
            }
            Err(e) if e.is_conflict() => Err(self.attach_existing(e).await),
            Err(e) => Err(e),
        }
    }

    pub async fn get_orig_url_by_short(&self, short_code: &str) -> Result<String> {
        if !is_valid_short_code(short_code) {
            return Err(ShortenerError::not_exist(format!(
                "short code '{}' not found",
                short_code
            )));
        }

        self.storage
            .get_url_pair_by_short(short_code)
            .await
            .map(|pair| pair.original_url)
    }

    pub async fn get_user_urls(&self, owner_id: &str) -> Result<Vec<UrlPair>> {
        self.storage.get_url_pair_batch_by_user_id(owner_id).await
    }

    pub async fn ping(&self) -> Result<()> {
        self.storage.ping().await
    }

    pub async fn close(&self) -> Result<()> {
        self.storage.close().await
    }
}

#[async_trait]
impl DeletionSink for ShortenerService {
    async fn delete_urls(&self, batch: Vec<DeletionRequest>) -> Result<()> {
        let total = batch.len();
        let batch: Vec<DeletionRequest> = batch
            .into_iter()
            .filter(|r| is_valid_short_code(&r.short_code))
            .collect();

        if batch.len() < total {
            warn!(
                "ShortenerService: dropped {} malformed short codes from deletion batch",
                total - batch.len()
            );
        }
        if batch.is_empty() {
            return Ok(());
        }

        self.storage.delete_requested_urls(batch).await
    }
}
