//! Client - Workflow を投入して結果を待つ
//!
//! Workflow 自体の再実行はエンジンに任せず 1 回だけ試行します（失敗は呼び出し側へ返す）。

use std::sync::Arc;

use crate::codec::{CodecError, PayloadCodec};
use crate::domain::{HandlerError, RetryPolicy, TaskQueue};
use crate::ports::{TaskRequest, Transport};
use crate::typed::Workflow;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("payload conversion failed: {0}")]
    Codec(#[from] CodecError),

    #[error("workflow failed: {0}")]
    Failed(#[from] HandlerError),
}

pub struct Client {
    transport: Arc<dyn Transport>,
    codec: Arc<PayloadCodec>,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>, codec: Arc<PayloadCodec>) -> Self {
        Self { transport, codec }
    }

    pub async fn execute_workflow<W: Workflow>(
        &self,
        task_queue: &TaskQueue,
        input: W::Input,
    ) -> Result<W::Output, ClientError> {
        let payload = self.codec.encode_as(input)?;
        let request = TaskRequest::workflow(task_queue.clone(), W::NAME, payload)
            .with_retry_policy(RetryPolicy::no_retry());
        let output = self.transport.submit(request).await?;
        Ok(self.codec.decode_as(&output)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{AppBuilder, WorkerGroup};
    use crate::config::WorkerConfig;
    use crate::domains::hello::{self, GreetingWorkflow};
    use crate::impls::InMemoryTransport;

    async fn start_hello() -> (Client, WorkerGroup) {
        start_hello_with(WorkerConfig::default()).await
    }

    async fn start_hello_with(config: WorkerConfig) -> (Client, WorkerGroup) {
        let app = AppBuilder::new(config.with_enabled_domains(["hello"]))
            .build()
            .unwrap();
        let transport = InMemoryTransport::connect("localhost:7233").unwrap();
        let client = Client::new(transport.clone(), app.codec());
        (client, app.start(transport).await.unwrap())
    }

    #[tokio::test]
    async fn greeting_workflow_roundtrip() {
        let (client, group) = start_hello().await;
        let queue = TaskQueue::new(hello::TASK_QUEUE).unwrap();

        let greeting = client
            .execute_workflow::<GreetingWorkflow>(&queue, "Temporal".to_string())
            .await
            .unwrap();
        assert_eq!(greeting, "Hello, Temporal!");
        group.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn greeting_completes_with_a_single_task_slot() {
        let (client, group) =
            start_hello_with(WorkerConfig::default().with_max_concurrent_tasks(1)).await;
        let queue = TaskQueue::new(hello::TASK_QUEUE).unwrap();

        let greeting = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            client.execute_workflow::<GreetingWorkflow>(&queue, "Temporal".to_string()),
        )
        .await
        .expect("workflow completes with max_concurrent_tasks=1")
        .unwrap();
        assert_eq!(greeting, "Hello, Temporal!");
        group.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn input_of_the_wrong_shape_is_a_non_retryable_failure() {
        let (client, group) = start_hello().await;
        let queue = TaskQueue::new(hello::TASK_QUEUE).unwrap();

        // GreetingWorkflow は String を受け取る
        let err = client
            .execute_workflow::<WrongInput>(&queue, 42)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Failed(ref e) if !e.is_retryable()));
        group.shutdown_and_join().await;
    }

    struct WrongInput;

    #[async_trait::async_trait]
    impl Workflow for WrongInput {
        const NAME: &'static str = GreetingWorkflow::NAME;
        type Input = i64;
        type Output = String;

        async fn run(
            &self,
            _ctx: &crate::typed::WorkflowContext,
            _input: i64,
        ) -> Result<String, HandlerError> {
            unreachable!("only used to submit a mistyped request")
        }
    }
}
