//! 删除管道性能基准测试

use std::sync::Arc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use shortener::config::ShutdownPolicy;
use shortener::deletion::{DeletionPipeline, DeletionSink, PipelineOptions};
use shortener::errors::Result;
use shortener::storage::DeletionRequest;
use tracing::Span;

/// 空 sink，只测管道本身的开销
struct NoopSink;

#[async_trait::async_trait]
impl DeletionSink for NoopSink {
    async fn delete_urls(&self, _batch: Vec<DeletionRequest>) -> Result<()> {
        Ok(())
    }
}

fn codes(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("code{}", i)).collect()
}

/// enqueue 到 drain 完成的端到端吞吐量
fn bench_enqueue_and_drain(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("pipeline/enqueue_drain");
    for &n in &[100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.to_async(&rt).iter(|| async move {
                let pipeline = DeletionPipeline::new(
                    Arc::new(NoopSink),
                    PipelineOptions {
                        channel_capacity: 64,
                        max_batch_size: 512,
                        shutdown_policy: ShutdownPolicy::Drain,
                        drain_timeout: Duration::from_secs(60),
                    },
                    Span::none(),
                );
                pipeline
                    .run(Duration::from_secs(3600), Duration::from_secs(5))
                    .unwrap();
                pipeline.enqueue("bench", codes(n)).unwrap();
                pipeline.shutdown().await;
            });
        });
    }
    group.finish();
}

/// 多个用户并发 enqueue
fn bench_fan_in(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("pipeline/fan_in");
    for &owners in &[4usize, 32] {
        group.throughput(Throughput::Elements((owners * 100) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(owners), &owners, |b, &owners| {
            b.to_async(&rt).iter(|| async move {
                let pipeline = DeletionPipeline::new(
                    Arc::new(NoopSink),
                    PipelineOptions {
                        shutdown_policy: ShutdownPolicy::Drain,
                        drain_timeout: Duration::from_secs(60),
                        ..Default::default()
                    },
                    Span::none(),
                );
                pipeline
                    .run(Duration::from_millis(10), Duration::from_secs(5))
                    .unwrap();
                for o in 0..owners {
                    pipeline.enqueue(&format!("owner{}", o), codes(100)).unwrap();
                }
                pipeline.shutdown().await;
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_enqueue_and_drain, bench_fan_in);
criterion_main!(benches);
