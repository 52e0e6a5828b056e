use tokio::signal;
use tracing::{error, warn};

use crate::deletion::DeletionPipeline;
use crate::services::ShortenerService;

/// 等待 Ctrl+C 信号
pub async fn listen_for_shutdown() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    warn!("Shutdown signal received");
}

/// 先停删除管道（最后一次刷盘），再关闭存储
pub async fn shutdown_gracefully(pipeline: Option<&DeletionPipeline>, service: &ShortenerService) {
    if let Some(pipeline) = pipeline {
        pipeline.shutdown().await;
    }

    if let Err(e) = service.close().await {
        error!("Failed to close storage: {}", e);
    }
}
