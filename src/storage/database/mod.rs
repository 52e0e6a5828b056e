//! SeaORM storage backend
//!
//! Supports SQLite, MySQL/MariaDB and PostgreSQL; the dialect is inferred
//! from the connection URL. The `url_pairs` table is provisioned by the
//! `migration` crate with `short_code` as primary key.

mod connection;
mod converters;
mod mutations;
mod query;

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tracing::{Span, info};

use super::{DeletionRequest, Storage, UrlPair};
use crate::errors::Result;

pub use connection::{connect_generic, connect_sqlite, infer_backend_from_url, run_migrations};
pub use converters::{model_to_pair, pair_to_active_model};

pub struct DatabaseStorage {
    db: DatabaseConnection,
    dialect: &'static str,
    closed: AtomicBool,
    span: Span,
}

impl DatabaseStorage {
    /// 连接数据库并执行迁移
    pub async fn connect(database_url: &str, pool_size: u32, span: Span) -> Result<Self> {
        if database_url.is_empty() {
            return Err(crate::errors::ShortenerError::database_config(
                "database_url 未设置",
            ));
        }

        let dialect = infer_backend_from_url(database_url)?;
        let db = if dialect == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(database_url, dialect, pool_size).await?
        };

        run_migrations(&db, &span).await?;

        info!(parent: &span, "{} storage initialized", dialect.to_uppercase());
        Ok(Self {
            db,
            dialect,
            closed: AtomicBool::new(false),
            span,
        })
    }

    /// sqlite / mysql / postgres
    pub fn dialect(&self) -> &'static str {
        self.dialect
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn add_url_pair(&self, pair: UrlPair) -> Result<()> {
        self.insert_pair(pair).await
    }

    async fn get_url_pair_by_short(&self, short_code: &str) -> Result<UrlPair> {
        self.find_pair(short_code).await
    }

    async fn add_batch_url_pairs(&self, pairs: Vec<UrlPair>) -> Result<()> {
        self.insert_pairs(pairs).await
    }

    async fn get_url_pair_batch_by_user_id(&self, owner_id: &str) -> Result<Vec<UrlPair>> {
        self.find_pairs_by_owner(owner_id).await
    }

    async fn delete_requested_urls(&self, requests: Vec<DeletionRequest>) -> Result<()> {
        self.mark_deleted(requests).await
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.db.clone().close().await?;
        info!(parent: &self.span, "{} storage closed", self.dialect.to_uppercase());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "database"
    }
}
