//! WorkflowContext - Workflow から Activity を呼び出す窓口

use std::sync::Arc;
use std::time::Duration;

use crate::codec::PayloadCodec;
use crate::domain::{HandlerError, RetryPolicy, TaskId, TaskQueue};
use crate::ports::{TaskRequest, Transport};

use super::activity::Activity;

/// Activity 呼び出しのオプション
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityOptions {
    /// 未指定なら Workflow 自身の queue に投入
    pub task_queue: Option<TaskQueue>,
    pub start_to_close_timeout: Option<Duration>,
    pub retry_policy: RetryPolicy,
}

impl ActivityOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            start_to_close_timeout: Some(timeout),
            ..Self::default()
        }
    }

    pub fn on_queue(mut self, task_queue: TaskQueue) -> Self {
        self.task_queue = Some(task_queue);
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }
}

/// WorkflowContext は実行中の Workflow 1 件分の文脈
pub struct WorkflowContext {
    workflow_id: TaskId,
    task_queue: TaskQueue,
    transport: Arc<dyn Transport>,
    codec: Arc<PayloadCodec>,
}

impl WorkflowContext {
    pub fn new(
        workflow_id: TaskId,
        task_queue: TaskQueue,
        transport: Arc<dyn Transport>,
        codec: Arc<PayloadCodec>,
    ) -> Self {
        Self {
            workflow_id,
            task_queue,
            transport,
            codec,
        }
    }

    pub fn workflow_id(&self) -> TaskId {
        self.workflow_id
    }

    pub fn task_queue(&self) -> &TaskQueue {
        &self.task_queue
    }

    /// Activity を投入して結果を待つ
    ///
    /// リトライはエンジンが行い、ここに返るのは最終結果だけです。
    pub async fn execute_activity<A: Activity>(
        &self,
        input: A::Input,
        options: ActivityOptions,
    ) -> Result<A::Output, HandlerError> {
        let task_queue = options
            .task_queue
            .unwrap_or_else(|| self.task_queue.clone());
        let payload = self.codec.encode_as(input)?;

        let mut request = TaskRequest::activity(task_queue, A::NAME, payload)
            .with_retry_policy(options.retry_policy);
        if let Some(timeout) = options.start_to_close_timeout {
            request = request.with_timeout(timeout);
        }

        let output = self.transport.submit(request).await?;
        Ok(self.codec.decode_as(&output)?)
    }
}
