//! Transport port - オーケストレーションエンジンとの境界
//!
//! ワーカーは Transport から queue とタスクの種類の組でタスクを受け取り（poll）、
//! 結果を TaskLease 経由で返します。投入側（Client / WorkflowContext）は
//! `submit` で結果を待ちます。リトライとタイムアウトはエンジン側の責務です。
//!
//! # 実装
//! - **InMemoryTransport**: プロセス内エンジン（開発・テスト用）

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::codec::Payload;
use crate::domain::{HandlerError, HandlerKind, RetryPolicy, TaskId, TaskQueue};

/// タスク 1 件の結果
pub type TaskResult = Result<Payload, HandlerError>;

/// エンジンに投入するタスク
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub kind: HandlerKind,
    pub task_queue: TaskQueue,
    pub handler: String,
    pub input: Payload,
    /// 1 回の試行の上限（start-to-close）。None なら無制限
    pub timeout: Option<Duration>,
    pub retry_policy: RetryPolicy,
}

impl TaskRequest {
    pub fn workflow(task_queue: TaskQueue, handler: impl Into<String>, input: Payload) -> Self {
        Self::new(HandlerKind::Workflow, task_queue, handler, input)
    }

    pub fn activity(task_queue: TaskQueue, handler: impl Into<String>, input: Payload) -> Self {
        Self::new(HandlerKind::Activity, task_queue, handler, input)
    }

    fn new(
        kind: HandlerKind,
        task_queue: TaskQueue,
        handler: impl Into<String>,
        input: Payload,
    ) -> Self {
        Self {
            kind,
            task_queue,
            handler: handler.into(),
            input,
            timeout: None,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }
}

/// TaskLease はワーカーが受け取った 1 回分の試行
///
/// `ack` / `fail` のどちらかで結果を返すまでエンジンは待ちます。
/// 結果を返さずに drop した場合、エンジンはその試行を retryable な失敗として扱います。
#[derive(Debug)]
pub struct TaskLease {
    id: TaskId,
    kind: HandlerKind,
    handler: String,
    input: Payload,
    attempt: u32,
    reply: oneshot::Sender<TaskResult>,
}

impl TaskLease {
    pub fn new(
        id: TaskId,
        kind: HandlerKind,
        handler: String,
        input: Payload,
        attempt: u32,
        reply: oneshot::Sender<TaskResult>,
    ) -> Self {
        Self {
            id,
            kind,
            handler,
            input,
            attempt,
            reply,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn input(&self) -> &Payload {
        &self.input
    }

    /// 1 始まりの試行回数
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn ack(self, output: Payload) -> bool {
        self.complete(Ok(output))
    }

    pub fn fail(self, error: HandlerError) -> bool {
        self.complete(Err(error))
    }

    /// 結果を返す。投入側がもう待っていなければ false
    pub fn complete(self, result: TaskResult) -> bool {
        self.reply.send(result).is_ok()
    }
}

/// Transport はエンジンとの接続
///
/// # Thread Safety
/// - `Send + Sync` を要求（queue ごとのワーカーと WorkflowContext が共有する）
#[async_trait]
pub trait Transport: Send + Sync {
    /// 接続先（ログ用）
    fn endpoint(&self) -> &str;

    /// queue から指定した種類の次のタスクを待つ。Transport が閉じられたら None
    ///
    /// Workflow と Activity は別々に poll する（Workflow が枠を埋めても Activity が届く）。
    async fn poll(&self, task_queue: &TaskQueue, kind: HandlerKind) -> Option<TaskLease>;

    /// タスクを投入し、リトライを含めた最終結果を待つ
    async fn submit(&self, request: TaskRequest) -> TaskResult;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("invalid engine endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EncodingTag;

    fn lease() -> (TaskLease, oneshot::Receiver<TaskResult>) {
        let (tx, rx) = oneshot::channel();
        let lease = TaskLease::new(
            TaskId::generate(),
            HandlerKind::Activity,
            "echo".to_string(),
            Payload::new(EncodingTag::BINARY_NULL, ""),
            1,
            tx,
        );
        (lease, rx)
    }

    #[tokio::test]
    async fn ack_delivers_output_to_submitter() {
        let (lease, rx) = lease();
        let output = Payload::new(EncodingTag::JSON_PLAIN, "1");
        assert!(lease.ack(output.clone()));
        assert_eq!(rx.await.unwrap(), Ok(output));
    }

    #[test]
    fn completing_after_submitter_left_reports_false() {
        let (lease, rx) = lease();
        drop(rx);
        assert!(!lease.fail(HandlerError::retryable("late")));
    }

    #[test]
    fn request_defaults_to_engine_retry_policy() {
        let queue = TaskQueue::new("q").unwrap();
        let request = TaskRequest::activity(queue, "echo", Payload::new(EncodingTag::BINARY_NULL, ""))
            .with_timeout(Duration::from_secs(5));
        assert_eq!(request.kind, HandlerKind::Activity);
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
        assert_eq!(request.retry_policy, RetryPolicy::default());
    }
}
