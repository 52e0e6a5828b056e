//! 异步删除管道
//!
//! ```text
//! enqueue ─▶ producer ─▶ stream ┐
//! enqueue ─▶ producer ─▶ stream ┼─▶ fan-in ─▶ aggregator ─▶ sink
//! enqueue ─▶ producer ─▶ stream ┘              (batch, ticker)
//! ```
//!
//! - 每次 `enqueue` 创建一个有界流和一个生产者，调用方立即返回
//! - fan-in 把所有流合并到一个有界通道
//! - aggregator 独占批次，按周期（或达到 `max_batch_size`）刷到 sink
//! - 每次刷盘都有超时；失败或超时的批次被丢弃，不重试
//!
//! Lifecycle: `Idle → Running → Draining → Stopped`. Requests enqueued
//! while idle are buffered until [`DeletionPipeline::run`] starts the
//! stages; after [`DeletionPipeline::shutdown`] begins, `enqueue` fails.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, timeout};
use tracing::{Instrument, Span, debug, error, info, warn};

use super::fanin::{RequestStream, cancelled, fan_in, produce};
use super::sink::DeletionSink;
use crate::config::{DeletionConfig, ShutdownPolicy};
use crate::errors::{Result, ShortenerError};
use crate::storage::DeletionRequest;

/// 管道状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Draining,
    Stopped,
}

/// 管道调优参数
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// 每个请求流与汇聚通道的容量（最小为 1）
    pub channel_capacity: usize,
    /// 批次达到该大小时提前刷盘，0 表示只按周期
    pub max_batch_size: usize,
    pub shutdown_policy: ShutdownPolicy,
    /// Drain 模式下等待生产者的上限，超时后退化为 Abandon
    pub drain_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&DeletionConfig::default())
    }
}

impl From<&DeletionConfig> for PipelineOptions {
    fn from(config: &DeletionConfig) -> Self {
        Self {
            channel_capacity: config.channel_capacity,
            max_batch_size: config.max_batch_size,
            shutdown_policy: config.shutdown_policy,
            drain_timeout: config.drain_timeout(),
        }
    }
}

pub struct DeletionPipeline {
    /// 刷盘目标
    sink: Arc<dyn DeletionSink>,
    options: PipelineOptions,
    state: Mutex<PipelineState>,
    /// 流注册通道；shutdown 时取走并丢弃，fan-in 随之结束
    streams_tx: Mutex<Option<mpsc::UnboundedSender<RequestStream>>>,
    /// run() 时交给 fan-in
    streams_rx: Mutex<Option<mpsc::UnboundedReceiver<RequestStream>>>,
    /// 取消信号，true 表示所有阶段应立即退出
    cancel: watch::Sender<bool>,
    /// 仍在运行的生产者
    producers: Mutex<JoinSet<()>>,
    /// fan-in 与 aggregator 任务
    workers: Mutex<JoinSet<()>>,
    span: Span,
}

impl DeletionPipeline {
    pub fn new(sink: Arc<dyn DeletionSink>, options: PipelineOptions, span: Span) -> Self {
        let (streams_tx, streams_rx) = mpsc::unbounded_channel();
        let (cancel, _) = watch::channel(false);

        Self {
            sink,
            options,
            state: Mutex::new(PipelineState::Idle),
            streams_tx: Mutex::new(Some(streams_tx)),
            streams_rx: Mutex::new(Some(streams_rx)),
            cancel,
            producers: Mutex::new(JoinSet::new()),
            workers: Mutex::new(JoinSet::new()),
            span,
        }
    }

    pub fn from_config(sink: Arc<dyn DeletionSink>, config: &DeletionConfig, span: Span) -> Self {
        Self::new(sink, PipelineOptions::from(config), span)
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock()
    }

    fn capacity(&self) -> usize {
        self.options.channel_capacity.max(1)
    }

    /// 提交一组待删除的短码，立即返回
    ///
    /// Must be called from within a Tokio runtime. Fails with
    /// `Unavailable` once shutdown has begun.
    pub fn enqueue(&self, owner_id: &str, short_codes: Vec<String>) -> Result<()> {
        let streams_tx = self.streams_tx.lock();
        let Some(streams_tx) = streams_tx.as_ref() else {
            return Err(ShortenerError::unavailable(
                "deletion pipeline is shutting down",
            ));
        };

        if short_codes.is_empty() {
            debug!(parent: &self.span, "Empty deletion request from {} ignored", owner_id);
            return Ok(());
        }

        let (tx, rx) = mpsc::channel(self.capacity());
        if streams_tx.send(rx).is_err() {
            return Err(ShortenerError::unavailable(
                "deletion pipeline is shutting down",
            ));
        }

        debug!(
            parent: &self.span,
            "Enqueued {} codes for deletion (user {})",
            short_codes.len(),
            owner_id
        );

        let mut producers = self.producers.lock();
        // 顺手回收已结束的生产者
        while producers.try_join_next().is_some() {}
        producers.spawn(
            produce(
                owner_id.to_string(),
                short_codes,
                tx,
                self.cancel.subscribe(),
            )
            .instrument(self.span.clone()),
        );

        Ok(())
    }

    /// 启动 fan-in 与 aggregator 并立即返回
    ///
    /// `period` is the flush interval, `flush_timeout` bounds every single
    /// call into the sink. Only one successful call per pipeline.
    pub fn run(&self, period: Duration, flush_timeout: Duration) -> Result<()> {
        if period.is_zero() {
            return Err(ShortenerError::validation(
                "flush period must be greater than zero",
            ));
        }

        {
            let mut state = self.state.lock();
            match *state {
                PipelineState::Idle => *state = PipelineState::Running,
                PipelineState::Running => {
                    return Err(ShortenerError::unavailable(
                        "deletion pipeline is already running",
                    ));
                }
                PipelineState::Draining | PipelineState::Stopped => {
                    return Err(ShortenerError::unavailable(
                        "deletion pipeline has been shut down",
                    ));
                }
            }
        }

        let streams_rx = self.streams_rx.lock().take().ok_or_else(|| {
            ShortenerError::unavailable("deletion pipeline has already been started")
        })?;

        let (items_tx, items_rx) = mpsc::channel(self.capacity());

        let aggregator = Aggregator {
            sink: Arc::clone(&self.sink),
            period,
            flush_timeout,
            max_batch_size: self.options.max_batch_size,
            batch: Vec::new(),
        };

        let mut workers = self.workers.lock();
        workers.spawn(
            fan_in(
                streams_rx,
                items_tx,
                self.cancel.subscribe(),
                self.span.clone(),
            )
            .instrument(self.span.clone()),
        );
        workers.spawn(
            aggregator
                .run(items_rx, self.cancel.subscribe())
                .instrument(self.span.clone()),
        );
        drop(workers);

        info!(
            parent: &self.span,
            "Deletion pipeline started (flush every {:?}, timeout {:?})", period, flush_timeout
        );
        Ok(())
    }

    /// 停止管道；重复调用直接返回
    ///
    /// `Abandon` cancels everything at once. `Drain` first waits, at most
    /// `drain_timeout`, for every accepted request to reach the aggregator,
    /// then falls back to cancelling. Either way the aggregator performs a
    /// last flush (bounded by the flush timeout) of what it already holds.
    pub async fn shutdown(&self) {
        let previous = {
            let mut state = self.state.lock();
            match *state {
                PipelineState::Draining | PipelineState::Stopped => return,
                current => {
                    *state = PipelineState::Draining;
                    current
                }
            }
        };

        let policy = self.options.shutdown_policy;
        info!(parent: &self.span, "Deletion pipeline shutting down ({} policy)", policy);

        // 不再接受新的流；丢弃发送端后 fan-in 会在处理完已注册的流后退出
        drop(self.streams_tx.lock().take());

        let mut producers = std::mem::take(&mut *self.producers.lock());
        let mut workers = std::mem::take(&mut *self.workers.lock());

        if previous == PipelineState::Running && policy == ShutdownPolicy::Drain {
            // 等生产者写完，再等 fan-in 与 aggregator 自然结束
            let drained = timeout(self.options.drain_timeout, async {
                while producers.join_next().await.is_some() {}
                while let Some(res) = workers.join_next().await {
                    self.log_worker_exit(res);
                }
            })
            .await;

            if drained.is_err() {
                warn!(
                    parent: &self.span,
                    "Drain timed out after {:?}, abandoning remaining requests",
                    self.options.drain_timeout
                );
            }
        }

        self.cancel.send_replace(true);
        producers.shutdown().await;

        while let Some(res) = workers.join_next().await {
            self.log_worker_exit(res);
        }

        *self.state.lock() = PipelineState::Stopped;
        info!(parent: &self.span, "Deletion pipeline stopped");
    }

    fn log_worker_exit(&self, res: std::result::Result<(), tokio::task::JoinError>) {
        if let Err(e) = res {
            error!(parent: &self.span, "Deletion pipeline task failed: {}", e);
        }
    }
}

impl Drop for DeletionPipeline {
    fn drop(&mut self) {
        // 未调用 shutdown 时也让后台任务退出
        self.cancel.send_replace(true);
    }
}

/// 批次聚合器，独占当前批次
struct Aggregator {
    sink: Arc<dyn DeletionSink>,
    period: Duration,
    flush_timeout: Duration,
    max_batch_size: usize,
    batch: Vec<DeletionRequest>,
}

impl Aggregator {
    async fn run(
        mut self,
        mut items: mpsc::Receiver<DeletionRequest>,
        mut cancel: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // ticker 排在 items 前面，持续的输入也不会饿死周期刷盘
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => break,
                _ = ticker.tick() => {
                    if !self.batch.is_empty() {
                        self.flush().await;
                    }
                }
                item = items.recv() => match item {
                    Some(request) => {
                        self.batch.push(request);
                        if self.max_batch_size > 0 && self.batch.len() >= self.max_batch_size {
                            self.flush().await;
                        }
                    }
                    None => break,
                },
            }
        }

        // 关闭前把已聚合的请求刷出去
        if !self.batch.is_empty() {
            self.flush().await;
        }
        debug!("Deletion aggregator stopped");
    }

    /// 刷盘；失败或超时时丢弃整个批次
    async fn flush(&mut self) {
        let batch = std::mem::take(&mut self.batch);
        let count = batch.len();

        match timeout(self.flush_timeout, self.sink.delete_urls(batch)).await {
            Ok(Ok(())) => {
                debug!("Deletion batch of {} requests flushed", count);
            }
            Ok(Err(e)) => {
                error!("Deletion batch of {} requests dropped: {}", count, e);
            }
            Err(_) => {
                error!(
                    "Deletion batch of {} requests dropped: sink timed out after {:?}",
                    count, self.flush_timeout
                );
            }
        }
    }
}
