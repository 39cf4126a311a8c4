//! CodecError - エンコード / デコードの失敗

use super::validation::ValidationError;

/// CodecError は 1 回の変換操作の失敗
///
/// 呼び出し 1 件だけが失敗し、コーデック自体は引き続き使えます。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// チェーン内のどのエンコーダもこの値を受け付けなかった
    #[error("no encoder in the chain accepts a {kind} value")]
    UnencodableValue { kind: &'static str },

    /// payload のタグに一致するエンコーダがない（欠落・未知のタグ）
    #[error("no encoder matches payload encoding {0:?}")]
    DecodeTagMismatch(Option<String>),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// TypeHint が指す型をこのエンコーディングからは作れない
    #[error("payload encoded as '{encoding}' cannot be decoded into {expected}")]
    IncompatibleHint {
        encoding: String,
        expected: &'static str,
    },

    #[error("expected a {expected} value, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("serialize failed: {0}")]
    Serialize(String),

    #[error("deserialize failed: {0}")]
    Deserialize(String),

    #[error("encoding '{0}' appears more than once in the codec chain")]
    DuplicateEncoding(String),

    #[error("encoder '{shadowed}' can never be selected because '{by}' precedes it")]
    ShadowedEncoder { shadowed: String, by: String },
}

impl CodecError {
    pub fn is_validation(&self) -> bool {
        matches!(self, CodecError::Validation(_))
    }
}
