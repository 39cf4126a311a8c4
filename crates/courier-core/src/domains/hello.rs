//! hello - 最小のデモドメイン
//!
//! Activity 1 つと、それを呼ぶ Workflow 1 つだけのドメインです。

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::config::WorkerConfig;
use crate::domain::{DomainDescriptor, DomainResolutionError, HandlerError};
use crate::typed::{Activity, ActivityOptions, Workflow, WorkflowContext};

pub const DOMAIN: &str = "hello";
pub const TASK_QUEUE: &str = "hello-task-queue";

/// 名前に挨拶を返す
pub struct SayHello;

#[async_trait]
impl Activity for SayHello {
    const NAME: &'static str = "say_hello";
    type Input = String;
    type Output = String;

    async fn execute(&self, name: String) -> Result<String, HandlerError> {
        info!(%name, "saying hello");
        Ok(format!("Hello, {name}!"))
    }
}

pub struct GreetingWorkflow;

#[async_trait]
impl Workflow for GreetingWorkflow {
    const NAME: &'static str = "GreetingWorkflow";
    type Input = String;
    type Output = String;

    async fn run(&self, ctx: &WorkflowContext, name: String) -> Result<String, HandlerError> {
        info!(workflow_id = %ctx.workflow_id(), %name, "greeting workflow started");
        ctx.execute_activity::<SayHello>(name, ActivityOptions::with_timeout(Duration::from_secs(5)))
            .await
    }
}

pub fn descriptor(_config: &WorkerConfig) -> Result<DomainDescriptor, DomainResolutionError> {
    Ok(DomainDescriptor::builder(DOMAIN)
        .task_queue(TASK_QUEUE)
        .activity(SayHello)
        .workflow(GreetingWorkflow)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn say_hello_formats_the_greeting() {
        assert_eq!(SayHello.execute("Ada".to_string()).await.unwrap(), "Hello, Ada!");
    }

    #[test]
    fn descriptor_declares_its_queue() {
        let descriptor = descriptor(&WorkerConfig::default()).unwrap();
        assert_eq!(descriptor.name(), DOMAIN);
        assert_eq!(descriptor.validate().unwrap().as_str(), TASK_QUEUE);
        assert_eq!(descriptor.activities()[0].name(), "say_hello");
        assert_eq!(descriptor.workflows()[0].name(), "GreetingWorkflow");
    }
}
