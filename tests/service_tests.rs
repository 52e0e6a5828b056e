//! ShortenerService tests
//!
//! The service runs on top of the memory backend unless a test needs a
//! persistent one.

use std::sync::Arc;
use std::time::Duration;

use shortener::config::ShutdownPolicy;
use shortener::deletion::{DeletionPipeline, DeletionSink, PipelineOptions};
use shortener::errors::{ErrorKind, ShortenerError};
use shortener::services::{ShortenerService, UrlHasher, XxHasher};
use shortener::storage::{DeletionRequest, FileStorage, MemoryStorage, Storage};
use tempfile::TempDir;
use tracing::Span;

/// 始终返回同一个短码，用于制造跨用户冲突
struct FixedHasher(&'static str);

impl UrlHasher for FixedHasher {
    fn hash(&self, _owner_id: &str, _original_url: &str) -> String {
        self.0.to_string()
    }
}

fn memory_service() -> ShortenerService {
    ShortenerService::new(
        Arc::new(MemoryStorage::default()),
        Arc::new(XxHasher::default()),
    )
}

// =============================================================================
// 生成短链接
// =============================================================================

#[cfg(test)]
mod shorten_tests {
    use super::*;

    #[tokio::test]
    async fn test_shorten_then_resolve() {
        let service = memory_service();
        let pair = service
            .shorten_url("alice", "https://example.com/page")
            .await
            .unwrap();

        assert_eq!(pair.owner_id, "alice");
        assert_eq!(pair.short_code.len(), 8);
        assert_eq!(
            service.get_orig_url_by_short(&pair.short_code).await.unwrap(),
            "https://example.com/page"
        );
    }

    #[tokio::test]
    async fn test_reshorten_same_url_surfaces_existing_pair() {
        let service = memory_service();
        let first = service
            .shorten_url("alice", "https://example.com")
            .await
            .unwrap();

        let err = service
            .shorten_url("alice", "https://example.com")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.existing_pair(), Some(&first));
    }

    #[tokio::test]
    async fn test_same_url_for_different_users_gets_different_codes() {
        let service = memory_service();
        let a = service.shorten_url("alice", "https://example.com").await.unwrap();
        let b = service.shorten_url("bob", "https://example.com").await.unwrap();
        assert_ne!(a.short_code, b.short_code);
    }

    #[tokio::test]
    async fn test_cross_user_collision_reports_foreign_owner() {
        let service = ShortenerService::new(
            Arc::new(MemoryStorage::default()),
            Arc::new(FixedHasher("fixed01")),
        );
        service.shorten_url("alice", "https://a.example.com").await.unwrap();

        let err = service
            .shorten_url("bob", "https://b.example.com")
            .await
            .unwrap_err();
        let existing = err.existing_pair().expect("existing pair attached");
        assert_eq!(existing.owner_id, "alice");
        assert_eq!(existing.original_url, "https://a.example.com");
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_storage() {
        let service = memory_service();
        for bad in ["", "not a url", "ftp://example.com/file", "javascript:alert(1)"] {
            let err = service.shorten_url("alice", bad).await.unwrap_err();
            assert!(matches!(err, ShortenerError::Validation(_)), "{}", bad);
        }
        assert!(service.get_user_urls("alice").await.unwrap_err().is_not_exist());
    }

    #[tokio::test]
    async fn test_url_is_trimmed() {
        let service = memory_service();
        let pair = service
            .shorten_url("alice", "  https://example.com/x  ")
            .await
            .unwrap();
        assert_eq!(pair.original_url, "https://example.com/x");
    }
}

// =============================================================================
// 批量生成
// =============================================================================

#[cfg(test)]
mod batch_tests {
    use super::*;

    #[tokio::test]
    async fn test_batch_dedupes_and_keeps_order() {
        let service = memory_service();
        let urls = vec![
            "https://b.example.com".to_string(),
            "https://a.example.com".to_string(),
            "https://b.example.com".to_string(),
        ];

        let pairs = service.batch_shorten_url("alice", &urls).await.unwrap();
        let got: Vec<&str> = pairs.iter().map(|p| p.original_url.as_str()).collect();
        assert_eq!(got, vec!["https://b.example.com", "https://a.example.com"]);
        assert_eq!(service.get_user_urls("alice").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_with_invalid_url_writes_nothing() {
        let service = memory_service();
        let urls = vec![
            "https://ok.example.com".to_string(),
            "mailto:someone@example.com".to_string(),
        ];

        assert!(service.batch_shorten_url("alice", &urls).await.is_err());
        assert!(service.get_user_urls("alice").await.unwrap_err().is_not_exist());
    }

    #[tokio::test]
    async fn test_batch_conflict_carries_existing_pair() {
        let service = memory_service();
        let first = service
            .shorten_url("alice", "https://dup.example.com")
            .await
            .unwrap();

        let urls = vec![
            "https://new.example.com".to_string(),
            "https://dup.example.com".to_string(),
        ];
        let err = service.batch_shorten_url("alice", &urls).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(err.existing_pair(), Some(&first));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let service = memory_service();
        assert!(service.batch_shorten_url("alice", &[]).await.unwrap().is_empty());
    }
}

// =============================================================================
// 查询与删除
// =============================================================================

#[cfg(test)]
mod retrieval_tests {
    use super::*;

    #[tokio::test]
    async fn test_malformed_code_is_not_exist() {
        let service = memory_service();
        let err = service
            .get_orig_url_by_short("../etc/passwd")
            .await
            .unwrap_err();
        assert!(err.is_not_exist());
    }

    #[tokio::test]
    async fn test_service_as_sink_skips_malformed_codes() {
        let service = memory_service();
        let pair = service
            .shorten_url("alice", "https://example.com")
            .await
            .unwrap();

        service
            .delete_urls(vec![
                DeletionRequest::new("alice", "bad/code"),
                DeletionRequest::new("alice", pair.short_code.clone()),
            ])
            .await
            .unwrap();

        let err = service
            .get_orig_url_by_short(&pair.short_code)
            .await
            .unwrap_err();
        assert!(err.is_deleted());
    }

    #[tokio::test]
    async fn test_end_to_end_deletion_on_file_backend() {
        let dir = TempDir::new().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(
            FileStorage::open(dir.path().join("links.log"), Span::none())
                .await
                .unwrap(),
        );
        let service = Arc::new(ShortenerService::new(
            Arc::clone(&storage),
            Arc::new(XxHasher::default()),
        ));

        let keep = service.shorten_url("alice", "https://keep.example.com").await.unwrap();
        let gone = service.shorten_url("alice", "https://drop.example.com").await.unwrap();

        let pipeline = DeletionPipeline::new(
            service.clone(),
            PipelineOptions {
                shutdown_policy: ShutdownPolicy::Drain,
                ..Default::default()
            },
            Span::none(),
        );
        pipeline
            .run(Duration::from_millis(50), Duration::from_secs(2))
            .unwrap();
        pipeline.enqueue("alice", vec![gone.short_code.clone()]).unwrap();
        pipeline.shutdown().await;

        let live = service.get_user_urls("alice").await.unwrap();
        assert_eq!(live, vec![keep]);
        assert!(
            service
                .get_orig_url_by_short(&gone.short_code)
                .await
                .unwrap_err()
                .is_deleted()
        );

        // 已删除的 URL 不能被重新缩短成同一个短码
        let err = service
            .shorten_url("alice", "https://drop.example.com")
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        service.ping().await.unwrap();
        service.close().await.unwrap();
    }
}
