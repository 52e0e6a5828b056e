use std::sync::Arc;

use tracing::{debug, info_span};

use crate::config::{ShutdownPolicy, StaticConfig};
use crate::deletion::{DeletionPipeline, DeletionSink, PipelineOptions};
use crate::errors::Result;
use crate::services::{ShortenerService, XxHasher};
use crate::storage::{Storage, StorageFactory};

pub struct StartupContext {
    pub config: Arc<StaticConfig>,
    pub storage: Arc<dyn Storage>,
    pub service: Arc<ShortenerService>,
}

/// 准备运行所需的上下文：存储后端与服务
pub async fn prepare_startup(config: Arc<StaticConfig>) -> Result<StartupContext> {
    let span = info_span!("storage", backend = %config.storage.backend);
    let storage = StorageFactory::create(&config.storage, span).await?;

    let service = Arc::new(ShortenerService::new(
        Arc::clone(&storage),
        Arc::new(XxHasher::default()),
    ));

    debug!("Startup context ready");
    Ok(StartupContext {
        config,
        storage,
        service,
    })
}

impl StartupContext {
    /// 创建并启动删除管道，`policy` 为 `None` 时使用配置中的策略
    pub fn start_pipeline(&self, policy: Option<ShutdownPolicy>) -> Result<Arc<DeletionPipeline>> {
        let deletion = &self.config.deletion;

        let mut options = PipelineOptions::from(deletion);
        if let Some(policy) = policy {
            options.shutdown_policy = policy;
        }

        let pipeline = Arc::new(DeletionPipeline::new(
            Arc::clone(&self.service) as Arc<dyn DeletionSink>,
            options,
            info_span!("deletion"),
        ));
        pipeline.run(deletion.flush_interval(), deletion.flush_timeout())?;
        Ok(pipeline)
    }
}
