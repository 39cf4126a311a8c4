//! PayloadCodec - Value と Payload の相互変換
//!
//! # 変換フロー
//! - encode: エンコーダを優先順に走査し、最初に `can_encode` が真になったもので変換
//! - decode: payload の `encoding` タグでエンコーダを 1 つに決め、TypeHint があれば
//!   モデルとして復元・検証、なければ汎用レコードとして返す

use tracing::trace;

use super::encoder::Encoder;
use super::error::CodecError;
use super::payload::Payload;
use super::value::{Transportable, TypeHint, Value};

/// PayloadCodec は順序付きのエンコーダチェーン
///
/// # 使用例
/// ```ignore
/// let codec = PayloadCodec::default();
/// let payload = codec.encode_as(order)?;
/// let order: PizzaOrder = codec.decode_as(&payload)?;
/// ```
///
/// # 不変条件
/// - タグはチェーン内で一意
/// - `JsonModel` は `JsonPlain` より前（モデルが汎用 JSON に取られない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadCodec {
    encoders: Vec<Encoder>,
}

impl PayloadCodec {
    pub fn new(encoders: impl IntoIterator<Item = Encoder>) -> Result<Self, CodecError> {
        let encoders: Vec<Encoder> = encoders.into_iter().collect();

        for (index, encoder) in encoders.iter().enumerate() {
            if encoders[..index].iter().any(|e| e.tag() == encoder.tag()) {
                return Err(CodecError::DuplicateEncoding(encoder.tag().to_string()));
            }
        }

        let position = |target: Encoder| encoders.iter().position(|e| *e == target);
        if let (Some(model), Some(plain)) = (position(Encoder::JsonModel), position(Encoder::JsonPlain))
            && plain < model
        {
            return Err(CodecError::ShadowedEncoder {
                shadowed: Encoder::JsonModel.tag().to_string(),
                by: Encoder::JsonPlain.tag().to_string(),
            });
        }

        Ok(Self { encoders })
    }

    pub fn encoders(&self) -> &[Encoder] {
        &self.encoders
    }

    /// 値を payload に変換
    ///
    /// 受け付けるエンコーダがなければ `UnencodableValue`（損失のある表現には落とさない）。
    pub fn encode(&self, value: &Value) -> Result<Payload, CodecError> {
        let encoder = self
            .encoders
            .iter()
            .copied()
            .find(|encoder| encoder.can_encode(value))
            .ok_or(CodecError::UnencodableValue { kind: value.kind() })?;
        trace!(encoding = %encoder.tag(), kind = value.kind(), "encoding value");
        encoder.encode(value)
    }

    /// payload を値に変換
    ///
    /// エンコーダの選択はタグだけで決まり、TypeHint は選択に影響しません。
    pub fn decode(&self, payload: &Payload, hint: Option<&TypeHint>) -> Result<Value, CodecError> {
        let tag = payload.encoding();
        let encoder = tag
            .and_then(|tag| self.encoders.iter().copied().find(|e| e.tag().as_str() == tag))
            .ok_or_else(|| CodecError::DecodeTagMismatch(tag.map(str::to_string)))?;
        trace!(encoding = %encoder.tag(), hint = ?hint, "decoding payload");
        encoder.decode(payload, hint)
    }

    pub fn encode_as<T: Transportable>(&self, value: T) -> Result<Payload, CodecError> {
        self.encode(&value.into_value())
    }

    /// `T` の TypeHint を使ってデコードし、`T` に変換
    pub fn decode_as<T: Transportable>(&self, payload: &Payload) -> Result<T, CodecError> {
        let hint = T::type_hint();
        let value = self.decode(payload, hint.as_ref())?;
        T::from_value(value)
    }
}

impl Default for PayloadCodec {
    fn default() -> Self {
        Self {
            encoders: Encoder::DEFAULT_CHAIN.to_vec(),
        }
    }
}
