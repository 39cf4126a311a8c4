//! Workflow trait - Activity を組み合わせる決定的なオーケストレーション
//!
//! Workflow は外部とのやりとりを直接行わず、`WorkflowContext::execute_activity` を通して
//! Activity に委ねます。

use std::any::TypeId;

use async_trait::async_trait;

use super::context::WorkflowContext;
use crate::codec::{Payload, PayloadCodec, Transportable};
use crate::domain::HandlerError;

/// Workflow は入力から Activity を順に呼び出して結果を返す
///
/// # 使用例
/// ```ignore
/// #[async_trait]
/// impl Workflow for GreetingWorkflow {
///     const NAME: &'static str = "GreetingWorkflow";
///     type Input = String;
///     type Output = String;
///
///     async fn run(&self, ctx: &WorkflowContext, name: String) -> Result<String, HandlerError> {
///         ctx.execute_activity::<SayHello>(name, ActivityOptions::with_timeout(Duration::from_secs(5)))
///             .await
///     }
/// }
/// ```
#[async_trait]
pub trait Workflow: Send + Sync + 'static {
    const NAME: &'static str;

    type Input: Transportable;
    type Output: Transportable;

    async fn run(
        &self,
        ctx: &WorkflowContext,
        input: Self::Input,
    ) -> Result<Self::Output, HandlerError>;
}

/// DynWorkflow は object-safe な Workflow
#[async_trait]
pub trait DynWorkflow: Send + Sync {
    fn name(&self) -> &str;

    fn implementation(&self) -> TypeId;

    async fn run_dyn(
        &self,
        ctx: &WorkflowContext,
        codec: &PayloadCodec,
        input: Payload,
    ) -> Result<Payload, HandlerError>;
}

pub struct TypedWorkflow<W: Workflow> {
    workflow: W,
}

impl<W: Workflow> TypedWorkflow<W> {
    pub fn new(workflow: W) -> Self {
        Self { workflow }
    }
}

#[async_trait]
impl<W: Workflow> DynWorkflow for TypedWorkflow<W> {
    fn name(&self) -> &str {
        W::NAME
    }

    fn implementation(&self) -> TypeId {
        TypeId::of::<W>()
    }

    async fn run_dyn(
        &self,
        ctx: &WorkflowContext,
        codec: &PayloadCodec,
        input: Payload,
    ) -> Result<Payload, HandlerError> {
        let input: W::Input = codec.decode_as(&input)?;
        let output = self.workflow.run(ctx, input).await?;
        Ok(codec.encode_as(output)?)
    }
}
