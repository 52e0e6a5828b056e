//! In-memory storage backend
//!
//! All state lives behind one `RwLock`: an arena of owner → code → record
//! plus a global code → owner index, so uniqueness checks are O(1) instead
//! of a scan over every owner.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{Span, debug, info};

use super::{DeletionRequest, Storage, UrlPair};
use crate::errors::{Result, ShortenerError};

#[derive(Debug, Clone)]
struct Record {
    original_url: String,
    deleted: bool,
}

#[derive(Debug, Default)]
struct Arena {
    owners: HashMap<String, HashMap<String, Record>>,
    /// short_code -> owner_id，包含已删除的记录
    index: HashMap<String, String>,
}

impl Arena {
    fn insert(&mut self, pair: UrlPair) {
        self.index
            .insert(pair.short_code.clone(), pair.owner_id.clone());
        self.owners.entry(pair.owner_id).or_default().insert(
            pair.short_code,
            Record {
                original_url: pair.original_url,
                deleted: false,
            },
        );
    }
}

pub struct MemoryStorage {
    arena: RwLock<Arena>,
    closed: AtomicBool,
    span: Span,
}

impl MemoryStorage {
    pub fn new(span: Span) -> Self {
        info!(parent: &span, "Memory storage initialized");
        Self {
            arena: RwLock::new(Arena::default()),
            closed: AtomicBool::new(false),
            span,
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(Span::none())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn add_url_pair(&self, pair: UrlPair) -> Result<()> {
        let mut arena = self.arena.write();
        if arena.index.contains_key(&pair.short_code) {
            return Err(ShortenerError::conflict(pair.short_code));
        }

        debug!(parent: &self.span, "Short link created: {}", pair.short_code);
        arena.insert(pair);
        Ok(())
    }

    async fn get_url_pair_by_short(&self, short_code: &str) -> Result<UrlPair> {
        let arena = self.arena.read();

        let record = arena
            .index
            .get(short_code)
            .and_then(|owner| arena.owners.get(owner).map(|codes| (owner, codes)))
            .and_then(|(owner, codes)| codes.get(short_code).map(|r| (owner, r)));

        match record {
            Some((_, record)) if record.deleted => Err(ShortenerError::deleted(format!(
                "short code '{}' has been deleted",
                short_code
            ))),
            Some((owner, record)) => Ok(UrlPair::new(
                owner.clone(),
                short_code,
                record.original_url.clone(),
            )),
            None => Err(ShortenerError::not_exist(format!(
                "short code '{}' not found",
                short_code
            ))),
        }
    }

    async fn add_batch_url_pairs(&self, pairs: Vec<UrlPair>) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }

        let mut arena = self.arena.write();

        // 先整体校验，再一次性写入
        let mut seen = HashSet::with_capacity(pairs.len());
        for pair in &pairs {
            if arena.index.contains_key(&pair.short_code) || !seen.insert(&pair.short_code) {
                return Err(ShortenerError::conflict(pair.short_code.clone()));
            }
        }

        let count = pairs.len();
        for pair in pairs {
            arena.insert(pair);
        }

        debug!(parent: &self.span, "Batch inserted {} links", count);
        Ok(())
    }

    async fn get_url_pair_batch_by_user_id(&self, owner_id: &str) -> Result<Vec<UrlPair>> {
        let arena = self.arena.read();

        let mut pairs: Vec<UrlPair> = arena
            .owners
            .get(owner_id)
            .map(|codes| {
                codes
                    .iter()
                    .filter(|(_, record)| !record.deleted)
                    .map(|(code, record)| {
                        UrlPair::new(owner_id, code.clone(), record.original_url.clone())
                    })
                    .collect()
            })
            .unwrap_or_default();

        if pairs.is_empty() {
            return Err(ShortenerError::not_exist(format!(
                "user '{}' has no links",
                owner_id
            )));
        }

        pairs.sort_by(|a, b| a.short_code.cmp(&b.short_code));
        Ok(pairs)
    }

    async fn delete_requested_urls(&self, requests: Vec<DeletionRequest>) -> Result<()> {
        let mut arena = self.arena.write();

        let mut applied = 0usize;
        for request in &requests {
            if let Some(record) = arena
                .owners
                .get_mut(&request.owner_id)
                .and_then(|codes| codes.get_mut(&request.short_code))
                && !record.deleted
            {
                record.deleted = true;
                applied += 1;
            }
        }

        debug!(
            parent: &self.span,
            "Soft-deleted {} of {} requested links",
            applied,
            requests.len()
        );
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ShortenerError::unavailable("memory storage is closed"));
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(parent: &self.span, "Memory storage closed");
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
