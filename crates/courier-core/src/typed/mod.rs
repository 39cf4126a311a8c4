//! Typed API - 型付き Activity / Workflow と型消去
//!
//! # 二層構造
//! - **表層（Typed）**: `Activity`, `Workflow`（入出力は関連型）
//! - **内部（Dyn）**: `DynActivity`, `DynWorkflow`（Payload in / Payload out）
//!
//! DomainDescriptor は Dyn 側だけを保持し、ワーカーループは Payload だけを扱います。

pub mod activity;
pub mod context;
pub mod workflow;

pub use self::activity::{Activity, DynActivity, TypedActivity};
pub use self::context::{ActivityOptions, WorkflowContext};
pub use self::workflow::{DynWorkflow, TypedWorkflow, Workflow};

use crate::codec::CodecError;
use crate::domain::HandlerError;

// 入出力を変換できないタスクは何度やり直しても成功しない
impl From<CodecError> for HandlerError {
    fn from(err: CodecError) -> Self {
        HandlerError::non_retryable(err.to_string())
    }
}
