//! Producer / fan-in stages of the deletion pipeline
//!
//! Every `enqueue` call gets its own bounded stream fed by one producer.
//! The fan-in task owns the channel of streams and spawns one forwarder per
//! stream, all of them copying into the single shared output channel.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{Instrument, Span, debug};

use crate::storage::DeletionRequest;

pub(crate) type RequestStream = mpsc::Receiver<DeletionRequest>;

/// Resolves once the pipeline is cancelled (or its handle is gone).
pub(crate) async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    // 发送端被丢弃也视为取消
    let _ = cancel.wait_for(|cancelled| *cancelled).await;
}

/// 单次使用的生产者：每个短码发一条请求，然后关闭流
pub(crate) async fn produce(
    owner_id: String,
    short_codes: Vec<String>,
    stream: mpsc::Sender<DeletionRequest>,
    mut cancel: watch::Receiver<bool>,
) {
    let total = short_codes.len();
    for (sent, short_code) in short_codes.into_iter().enumerate() {
        let request = DeletionRequest {
            owner_id: owner_id.clone(),
            short_code,
        };

        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                debug!("Producer for {} cancelled after {}/{} codes", owner_id, sent, total);
                return;
            }
            res = stream.send(request) => {
                if res.is_err() {
                    debug!("Producer for {} lost its forwarder after {}/{} codes", owner_id, sent, total);
                    return;
                }
            }
        }
    }
}

/// Copies one request stream into the shared output, preserving its order.
pub(crate) async fn forward(
    mut stream: RequestStream,
    output: mpsc::Sender<DeletionRequest>,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        let request = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => return,
            item = stream.recv() => match item {
                Some(request) => request,
                None => return,
            },
        };

        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => return,
            res = output.send(request) => {
                if res.is_err() {
                    return;
                }
            }
        }
    }
}

/// Fan-in loop.
///
/// Ends when cancelled or when the registration channel is closed and
/// drained; then waits for its forwarders, so `output` closes only after
/// every stream it accepted has been copied (or abandoned on cancel).
pub(crate) async fn fan_in(
    mut streams: mpsc::UnboundedReceiver<RequestStream>,
    output: mpsc::Sender<DeletionRequest>,
    mut cancel: watch::Receiver<bool>,
    span: Span,
) {
    let mut forwarders = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => break,
            stream = streams.recv() => match stream {
                Some(stream) => {
                    forwarders.spawn(
                        forward(stream, output.clone(), cancel.clone()).instrument(span.clone()),
                    );
                }
                None => break,
            },
            Some(_) = forwarders.join_next(), if !forwarders.is_empty() => {}
        }
    }

    drop(output);
    streams.close();
    while forwarders.join_next().await.is_some() {}
    debug!("Fan-in stage stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_producer_emits_in_order_then_closes() {
        let (tx, mut rx) = mpsc::channel(1);
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let codes = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        tokio::spawn(produce("u1".to_string(), codes, tx, cancel_rx));

        let mut got = Vec::new();
        while let Some(request) = rx.recv().await {
            assert_eq!(request.owner_id, "u1");
            got.push(request.short_code);
        }
        assert_eq!(got, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_producer_stops_when_cancelled() {
        let (tx, mut rx) = mpsc::channel(1);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let codes: Vec<String> = (0..100).map(|i| format!("c{}", i)).collect();
        let handle = tokio::spawn(produce("u1".to_string(), codes, tx, cancel_rx));

        // 只取一条，然后取消
        assert!(rx.recv().await.is_some());
        cancel_tx.send_replace(true);
        handle.await.unwrap();

        let mut rest = 0;
        while rx.recv().await.is_some() {
            rest += 1;
        }
        assert!(rest < 99);
    }

    #[tokio::test]
    async fn test_fan_in_merges_streams_and_closes_output() {
        let (streams_tx, streams_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let fan = tokio::spawn(fan_in(streams_rx, out_tx, cancel_rx.clone(), Span::none()));

        for owner in ["u1", "u2", "u3"] {
            let (tx, rx) = mpsc::channel(2);
            streams_tx.send(rx).unwrap();
            tokio::spawn(produce(
                owner.to_string(),
                vec!["x".to_string(), "y".to_string()],
                tx,
                cancel_rx.clone(),
            ));
        }
        drop(streams_tx);

        let mut received = Vec::new();
        while let Some(request) = out_rx.recv().await {
            received.push(request);
        }
        fan.await.unwrap();

        assert_eq!(received.len(), 6);
        for owner in ["u1", "u2", "u3"] {
            let codes: Vec<&str> = received
                .iter()
                .filter(|r| r.owner_id == owner)
                .map(|r| r.short_code.as_str())
                .collect();
            assert_eq!(codes, vec!["x", "y"]);
        }
    }
}
