//! Activity trait - エンジンから少なくとも 1 回呼ばれる作業単位
//!
//! # 学習ポイント
//! - Associated Constants (`const NAME`) と Associated Types (`Input`, `Output`)
//! - Type erasure パターン (TypedActivity<A> → DynActivity)

use std::any::TypeId;

use async_trait::async_trait;

use crate::codec::{Payload, PayloadCodec, Transportable};
use crate::domain::HandlerError;

/// Activity は入力を受けて出力を返す
///
/// # 使用例
/// ```ignore
/// struct SayHello;
///
/// #[async_trait]
/// impl Activity for SayHello {
///     const NAME: &'static str = "say_hello";
///     type Input = String;
///     type Output = String;
///
///     async fn execute(&self, name: String) -> Result<String, HandlerError> {
///         Ok(format!("Hello, {name}!"))
///     }
/// }
/// ```
#[async_trait]
pub trait Activity: Send + Sync + 'static {
    /// エンジンに登録される名前（queue 内で一意）
    const NAME: &'static str;

    type Input: Transportable;
    type Output: Transportable;

    async fn execute(&self, input: Self::Input) -> Result<Self::Output, HandlerError>;
}

/// DynActivity は object-safe な Activity
///
/// 入力は `Input` 型の TypeHint でデコードされ、出力は同じコーデックでエンコードされます。
#[async_trait]
pub trait DynActivity: Send + Sync {
    fn name(&self) -> &str;

    /// 実装型の識別子（同名ハンドラが同じ実装かどうかの判定に使う）
    fn implementation(&self) -> TypeId;

    async fn execute_dyn(
        &self,
        codec: &PayloadCodec,
        input: Payload,
    ) -> Result<Payload, HandlerError>;
}

pub struct TypedActivity<A: Activity> {
    activity: A,
}

impl<A: Activity> TypedActivity<A> {
    pub fn new(activity: A) -> Self {
        Self { activity }
    }
}

#[async_trait]
impl<A: Activity> DynActivity for TypedActivity<A> {
    fn name(&self) -> &str {
        A::NAME
    }

    fn implementation(&self) -> TypeId {
        TypeId::of::<A>()
    }

    async fn execute_dyn(
        &self,
        codec: &PayloadCodec,
        input: Payload,
    ) -> Result<Payload, HandlerError> {
        let input: A::Input = codec.decode_as(&input)?;
        let output = self.activity.execute(input).await?;
        Ok(codec.encode_as(output)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{EncodingTag, Payload};
    use crate::domain::ErrorKind;
    use crate::typed::testing::{EchoActivity, ShoutActivity};

    #[tokio::test]
    async fn typed_activity_decodes_input_and_encodes_output() {
        let codec = PayloadCodec::default();
        let handler = TypedActivity::new(ShoutActivity);

        let input = codec.encode_as("quiet".to_string()).unwrap();
        let output = handler.execute_dyn(&codec, input).await.unwrap();

        assert_eq!(codec.decode_as::<String>(&output).unwrap(), "QUIET");
        assert_eq!(handler.name(), "shout");
    }

    #[tokio::test]
    async fn undecodable_input_is_a_non_retryable_failure() {
        let codec = PayloadCodec::default();
        let handler = TypedActivity::new(EchoActivity);

        let input = Payload::new(EncodingTag::BINARY_NULL, "");
        let err = handler.execute_dyn(&codec, input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonRetryable);
    }
}
