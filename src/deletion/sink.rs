use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::Result;
use crate::storage::{DeletionRequest, Storage};

/// Where the deletion pipeline flushes its batches.
#[async_trait]
pub trait DeletionSink: Send + Sync {
    async fn delete_urls(&self, batch: Vec<DeletionRequest>) -> Result<()>;
}

/// 直接把批次交给存储后端
#[async_trait]
impl DeletionSink for Arc<dyn Storage> {
    async fn delete_urls(&self, batch: Vec<DeletionRequest>) -> Result<()> {
        self.delete_requested_urls(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, UrlPair};

    #[test]
    fn test_storage_as_sink() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());

        tokio_test::block_on(async {
            storage
                .add_url_pair(UrlPair::new("u1", "abc", "https://example.com"))
                .await
                .unwrap();
            storage
                .delete_urls(vec![DeletionRequest::new("u1", "abc")])
                .await
                .unwrap();

            let err = storage.get_url_pair_by_short("abc").await.unwrap_err();
            assert!(err.is_deleted());
        });
    }
}
