//! InMemoryTransport - プロセス内のオーケストレーションエンジン
//!
//! # 学習ポイント
//! - (queue, 種類) ごとの mpsc チャネルを遅延生成（std Mutex はロック内で await しない）
//! - oneshot による結果の返却と tokio::time::timeout による試行ごとの上限
//! - watch チャネルで close を全 poller に伝える
//!
//! 外部エンジンと同じく、リトライは投入側（submit）がポリシーに従って行います。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::config::split_endpoint;
use crate::domain::{HandlerError, HandlerKind, TaskId, TaskQueue};
use crate::ports::{TaskLease, TaskRequest, TaskResult, Transport, TransportError};

struct QueueChannel {
    tx: mpsc::UnboundedSender<TaskLease>,
    // poller は queue ごとに 1 つの想定だが、複数でも順に受け取れるようにする
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<TaskLease>>,
}

impl QueueChannel {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }
}

/// InMemoryTransport は開発・テスト用のエンジン
///
/// # 使用例
/// ```ignore
/// let transport = InMemoryTransport::connect("localhost:7233")?;
/// let group = app.start(transport.clone()).await?;
/// let client = Client::new(transport, app.codec());
/// ```
pub struct InMemoryTransport {
    endpoint: String,
    queues: Mutex<HashMap<(TaskQueue, HandlerKind), Arc<QueueChannel>>>,
    closed: watch::Sender<bool>,
}

impl InMemoryTransport {
    /// `host:port` を検証して接続する
    pub fn connect(endpoint: &str) -> Result<Arc<Self>, TransportError> {
        split_endpoint(endpoint).map_err(|reason| TransportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        })?;

        let (closed, _) = watch::channel(false);
        info!(endpoint, "connected to in-memory engine");
        Ok(Arc::new(Self {
            endpoint: endpoint.trim().to_string(),
            queues: Mutex::new(HashMap::new()),
            closed,
        }))
    }

    /// 全 queue を閉じる
    ///
    /// 待機中の poller は None を受け取り、未配送のタスクは non-retryable で失敗します。
    pub fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }

        let drained: Vec<Arc<QueueChannel>> = {
            let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
            queues.drain().map(|(_, channel)| channel).collect()
        };
        for channel in drained {
            if let Ok(mut rx) = channel.rx.try_lock() {
                while let Ok(lease) = rx.try_recv() {
                    lease.fail(HandlerError::non_retryable("transport closed"));
                }
            }
        }
        info!(endpoint = %self.endpoint, "in-memory engine closed");
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn channel(&self, task_queue: &TaskQueue, kind: HandlerKind) -> Arc<QueueChannel> {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        let channel = queues
            .entry((task_queue.clone(), kind))
            .or_insert_with(|| Arc::new(QueueChannel::new()));
        Arc::clone(channel)
    }

    async fn attempt(&self, id: TaskId, request: &TaskRequest, attempt: u32) -> TaskResult {
        if self.is_closed() {
            return Err(HandlerError::non_retryable("transport closed"));
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let lease = TaskLease::new(
            id,
            request.kind,
            request.handler.clone(),
            request.input.clone(),
            attempt,
            reply_tx,
        );
        if self
            .channel(&request.task_queue, request.kind)
            .tx
            .send(lease)
            .is_err()
        {
            return Err(HandlerError::non_retryable(format!(
                "task queue '{}' is closed",
                request.task_queue
            )));
        }

        let reply = match request.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, reply_rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    return Err(HandlerError::timed_out(format!(
                        "{} '{}' did not finish within {timeout:?}",
                        request.kind, request.handler
                    )));
                }
            },
            None => reply_rx.await,
        };

        // 結果を返さずに lease が捨てられた（ワーカー停止など）
        reply.unwrap_or_else(|_| Err(HandlerError::retryable("task was dropped without a result")))
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn poll(&self, task_queue: &TaskQueue, kind: HandlerKind) -> Option<TaskLease> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return None;
        }

        let channel = self.channel(task_queue, kind);
        tokio::select! {
            // close は true への一方向の変化だけなので、変化 = 閉じた
            _ = closed.changed() => None,
            lease = async { channel.rx.lock().await.recv().await } => lease,
        }
    }

    async fn submit(&self, request: TaskRequest) -> TaskResult {
        let id = TaskId::generate();
        let mut attempt = 1;
        loop {
            let err = match self.attempt(id, &request, attempt).await {
                Ok(output) => return Ok(output),
                Err(err) => err,
            };

            if !err.is_retryable()
                || self.is_closed()
                || !request.retry_policy.allows_attempt(attempt + 1)
            {
                debug!(task_id = %id, attempt, error = %err, "task failed");
                return Err(err);
            }

            let delay = request.retry_policy.next_delay(attempt);
            debug!(
                task_id = %id,
                attempt,
                ?delay,
                error = %err,
                "retrying task"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{EncodingTag, Payload};
    use crate::domain::{ErrorKind, RetryPolicy};
    use rstest::rstest;
    use std::time::Duration;

    fn queue(name: &str) -> TaskQueue {
        TaskQueue::new(name).unwrap()
    }

    fn request(task_queue: &str) -> TaskRequest {
        TaskRequest::activity(
            queue(task_queue),
            "echo",
            Payload::new(EncodingTag::JSON_PLAIN, r#""hi""#),
        )
    }

    fn fast_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_initial_interval(Duration::from_millis(1))
            .with_maximum_attempts(attempts)
    }

    #[rstest]
    #[case("localhost:7233")]
    #[case("10.0.0.5:80")]
    fn connect_accepts_host_and_port(#[case] endpoint: &str) {
        let transport = InMemoryTransport::connect(endpoint).unwrap();
        assert_eq!(transport.endpoint(), endpoint);
    }

    #[rstest]
    #[case("")]
    #[case("localhost")]
    #[case(":7233")]
    #[case("localhost:http")]
    fn connect_rejects_malformed_endpoint(#[case] endpoint: &str) {
        assert!(matches!(
            InMemoryTransport::connect(endpoint),
            Err(TransportError::InvalidEndpoint { .. })
        ));
    }

    #[tokio::test]
    async fn submitted_task_reaches_poller_of_its_queue() {
        let transport = InMemoryTransport::connect("localhost:7233").unwrap();

        let worker = tokio::spawn({
            let transport = Arc::clone(&transport);
            async move {
                let lease = transport.poll(&queue("a"), HandlerKind::Activity).await.unwrap();
                assert_eq!(lease.handler(), "echo");
                assert_eq!(lease.attempt(), 1);
                let input = lease.input().clone();
                lease.ack(input);
            }
        });

        let output = transport.submit(request("a")).await.unwrap();
        assert_eq!(output.data().as_ref(), br#""hi""#);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn retryable_failure_is_retried_with_next_attempt_number() {
        let transport = InMemoryTransport::connect("localhost:7233").unwrap();

        let worker = tokio::spawn({
            let transport = Arc::clone(&transport);
            async move {
                let first = transport.poll(&queue("a"), HandlerKind::Activity).await.unwrap();
                let first_id = first.id();
                first.fail(HandlerError::retryable("flaky"));

                let second = transport.poll(&queue("a"), HandlerKind::Activity).await.unwrap();
                assert_eq!(second.attempt(), 2);
                assert_eq!(second.id(), first_id);
                second.ack(Payload::new(EncodingTag::JSON_PLAIN, "true"));
            }
        });

        let output = transport
            .submit(request("a").with_retry_policy(fast_retry(3)))
            .await
            .unwrap();
        assert_eq!(output.data().as_ref(), b"true");
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn non_retryable_failure_is_returned_immediately() {
        let transport = InMemoryTransport::connect("localhost:7233").unwrap();

        tokio::spawn({
            let transport = Arc::clone(&transport);
            async move {
                let lease = transport.poll(&queue("a"), HandlerKind::Activity).await.unwrap();
                lease.fail(HandlerError::non_retryable("card declined"));
            }
        });

        let err = transport
            .submit(request("a").with_retry_policy(fast_retry(5)))
            .await
            .unwrap_err();
        assert_eq!(err, HandlerError::non_retryable("card declined"));
    }

    #[tokio::test]
    async fn attempts_are_bounded_by_the_retry_policy() {
        let transport = InMemoryTransport::connect("localhost:7233").unwrap();

        let worker = tokio::spawn({
            let transport = Arc::clone(&transport);
            async move {
                let mut seen = 0;
                while let Some(lease) = transport.poll(&queue("a"), HandlerKind::Activity).await {
                    seen += 1;
                    lease.fail(HandlerError::retryable("down"));
                    if seen == 2 {
                        break;
                    }
                }
                seen
            }
        });

        let err = transport
            .submit(request("a").with_retry_policy(fast_retry(2)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Retryable);
        assert_eq!(worker.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn attempt_exceeding_timeout_is_timed_out() {
        let transport = InMemoryTransport::connect("localhost:7233").unwrap();

        let (held_tx, held_rx) = oneshot::channel();
        tokio::spawn({
            let transport = Arc::clone(&transport);
            async move {
                // 結果を返さずに保持する
                let lease = transport.poll(&queue("slow"), HandlerKind::Activity).await.unwrap();
                let _ = held_tx.send(lease);
            }
        });

        let err = transport
            .submit(
                request("slow")
                    .with_timeout(Duration::from_millis(20))
                    .with_retry_policy(RetryPolicy::no_retry()),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
        drop(held_rx);
    }

    #[tokio::test]
    async fn dropped_lease_counts_as_retryable() {
        let transport = InMemoryTransport::connect("localhost:7233").unwrap();

        tokio::spawn({
            let transport = Arc::clone(&transport);
            async move {
                let lease = transport.poll(&queue("a"), HandlerKind::Activity).await.unwrap();
                drop(lease);
            }
        });

        let err = transport
            .submit(request("a").with_retry_policy(RetryPolicy::no_retry()))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn workflows_and_activities_are_polled_separately() {
        let transport = InMemoryTransport::connect("localhost:7233").unwrap();

        let activities = tokio::spawn({
            let transport = Arc::clone(&transport);
            async move {
                let lease = transport.poll(&queue("a"), HandlerKind::Activity).await.unwrap();
                assert_eq!(lease.kind(), HandlerKind::Activity);
                let input = lease.input().clone();
                lease.ack(input);
            }
        });

        // workflow の poller がいなくても activity は届く
        transport.submit(request("a")).await.unwrap();
        activities.await.unwrap();

        let workflow = TaskRequest::workflow(
            queue("a"),
            "EchoWorkflow",
            Payload::new(EncodingTag::JSON_PLAIN, r#""hi""#),
        )
        .with_timeout(Duration::from_millis(20))
        .with_retry_policy(RetryPolicy::no_retry());
        let err = transport.submit(workflow).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn close_wakes_waiting_pollers() {
        let transport = InMemoryTransport::connect("localhost:7233").unwrap();

        let poller = tokio::spawn({
            let transport = Arc::clone(&transport);
            async move { transport.poll(&queue("idle"), HandlerKind::Activity).await.is_none() }
        });

        tokio::task::yield_now().await;
        transport.close();
        assert!(poller.await.unwrap());
        assert!(transport.poll(&queue("idle"), HandlerKind::Activity).await.is_none());
    }

    #[tokio::test]
    async fn submit_after_close_fails_without_retry() {
        let transport = InMemoryTransport::connect("localhost:7233").unwrap();
        transport.close();

        let err = transport
            .submit(request("a").with_retry_policy(fast_retry(0)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonRetryable);
    }
}
