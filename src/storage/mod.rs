//! Storage backends
//!
//! Every backend implements [`Storage`]; callers hold an `Arc<dyn Storage>`
//! and never know which one is configured.
//!
//! Contract shared by all implementations:
//! - short codes are unique across all owners, deleted records included,
//!   so a soft-deleted code can never be handed out again;
//! - lookups distinguish `NotExist` from `Deleted`;
//! - deletes are owner-scoped, idempotent, and ignore unknown codes;
//! - backends never retry; timeouts are imposed by the caller.

pub mod database;
pub mod file;
pub mod memory;
pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{Span, info};

use crate::config::{StorageBackendType, StorageConfig};
use crate::errors::Result;

pub use database::DatabaseStorage;
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use models::{DeletionRequest, UrlPair};

#[async_trait]
pub trait Storage: Send + Sync {
    /// 插入新映射；短码已存在（包括已删除的）时返回 `Conflict`，不修改任何状态
    async fn add_url_pair(&self, pair: UrlPair) -> Result<()>;

    /// `NotExist` 表示从未创建，`Deleted` 表示已被软删除
    async fn get_url_pair_by_short(&self, short_code: &str) -> Result<UrlPair>;

    /// Atomicity is backend specific: the database backend uses a single
    /// transaction, the file backend appends sequentially and stops at the
    /// first failure, leaving earlier items in place.
    async fn add_batch_url_pairs(&self, pairs: Vec<UrlPair>) -> Result<()>;

    /// 用户名下所有未删除的映射；一个都没有时返回 `NotExist`
    async fn get_url_pair_batch_by_user_id(&self, owner_id: &str) -> Result<Vec<UrlPair>>;

    /// 为请求中属于该用户的短码设置删除标记，未知短码直接忽略
    async fn delete_requested_urls(&self, requests: Vec<DeletionRequest>) -> Result<()>;

    async fn ping(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

pub struct StorageFactory;

impl StorageFactory {
    /// Builds the backend selected by `config.backend`.
    ///
    /// `span` becomes the parent of every event the backend logs.
    pub async fn create(config: &StorageConfig, span: Span) -> Result<Arc<dyn Storage>> {
        let storage: Arc<dyn Storage> = match config.backend {
            StorageBackendType::Memory => Arc::new(MemoryStorage::new(span.clone())),
            StorageBackendType::File => {
                Arc::new(FileStorage::open(&config.file_path, span.clone()).await?)
            }
            StorageBackendType::Database => Arc::new(
                DatabaseStorage::connect(&config.database_url, config.pool_size, span.clone())
                    .await?,
            ),
        };

        info!(parent: &span, "Using storage backend: {}", storage.backend_name());
        Ok(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;
    use tracing_subscriber::Layer;

    /// 记录每条事件所属的 span 名称
    #[derive(Clone, Default)]
    struct ParentRecorder(Arc<Mutex<Vec<Option<String>>>>);

    impl<S> Layer<S> for ParentRecorder
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
            let parent = ctx.event_span(event).map(|span| span.name().to_string());
            self.0.lock().push(parent);
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_factory_logs_under_injected_span() {
        let recorder = ParentRecorder::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let span = tracing::info_span!("storage_factory");
        let config = StorageConfig {
            backend: StorageBackendType::Memory,
            ..Default::default()
        };
        StorageFactory::create(&config, span).await.unwrap();

        let parents = recorder.0.lock().clone();
        assert!(!parents.is_empty());
        assert!(
            parents
                .iter()
                .all(|p| p.as_deref() == Some("storage_factory")),
            "{:?}",
            parents
        );
    }
}
