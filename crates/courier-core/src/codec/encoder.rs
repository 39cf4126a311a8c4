//! Encoder - エンコーダの閉じた集合
//!
//! 「扱えないなら None を返す」連鎖ではなく、各 variant が `can_encode` 述語を持ち、
//! PayloadCodec が宣言順に走査します。

use bytes::Bytes;

use super::error::CodecError;
use super::payload::{EncodingTag, Payload};
use super::value::{TypeHint, Value};

/// エンコーダ 1 種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoder {
    /// 構造化モデル専用（`json/model`）。汎用 JSON より前に置く。
    JsonModel,
    /// `()` / 値なし（`binary/null`）
    BinaryNull,
    /// 生バイト列（`binary/plain`）
    BinaryPlain,
    /// 汎用 JSON（`json/plain`）。モデルも受け付けるフォールバック。
    JsonPlain,
}

impl Encoder {
    /// 既定のチェーン: カスタムのモデルエンコーダ → プラットフォーム既定の順
    pub const DEFAULT_CHAIN: [Encoder; 4] = [
        Encoder::JsonModel,
        Encoder::BinaryNull,
        Encoder::BinaryPlain,
        Encoder::JsonPlain,
    ];

    pub fn tag(self) -> EncodingTag {
        match self {
            Encoder::JsonModel => EncodingTag::JSON_MODEL,
            Encoder::BinaryNull => EncodingTag::BINARY_NULL,
            Encoder::BinaryPlain => EncodingTag::BINARY_PLAIN,
            Encoder::JsonPlain => EncodingTag::JSON_PLAIN,
        }
    }

    pub fn can_encode(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Encoder::JsonModel, Value::Model(_))
                | (Encoder::BinaryNull, Value::Null)
                | (Encoder::BinaryPlain, Value::Bytes(_))
                | (Encoder::JsonPlain, Value::Json(_) | Value::Model(_))
        )
    }

    /// このエンコーディングから TypeHint のモデルを復元できるか
    pub fn accepts_hint(self) -> bool {
        matches!(self, Encoder::JsonModel | Encoder::JsonPlain)
    }

    pub(crate) fn encode(self, value: &Value) -> Result<Payload, CodecError> {
        let data = match value {
            Value::Null => Bytes::new(),
            Value::Bytes(bytes) => bytes.clone(),
            Value::Json(json) => serde_json::to_vec(json)
                .map(Bytes::from)
                .map_err(|e| CodecError::Serialize(e.to_string()))?,
            Value::Model(model) => Bytes::from(model.to_json_vec()?),
        };
        Ok(Payload::new(self.tag(), data))
    }

    pub(crate) fn decode(
        self,
        payload: &Payload,
        hint: Option<&TypeHint>,
    ) -> Result<Value, CodecError> {
        match (self, hint) {
            (Encoder::JsonModel | Encoder::JsonPlain, Some(hint)) => {
                hint.decode_json(payload.data()).map(Value::Model)
            }
            (Encoder::JsonModel | Encoder::JsonPlain, None) => {
                serde_json::from_slice(payload.data())
                    .map(Value::Json)
                    .map_err(|e| CodecError::Deserialize(e.to_string()))
            }
            (Encoder::BinaryNull, None) => Ok(Value::Null),
            (Encoder::BinaryPlain, None) => Ok(Value::Bytes(payload.data().clone())),
            (Encoder::BinaryNull | Encoder::BinaryPlain, Some(hint)) => {
                Err(CodecError::IncompatibleHint {
                    encoding: self.tag().to_string(),
                    expected: hint.type_name(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::testing::Ticket;
    use rstest::rstest;

    #[rstest]
    #[case(Encoder::JsonModel, Value::model(Ticket::new("a", 1)), true)]
    #[case(Encoder::JsonModel, Value::Json(serde_json::json!({})), false)]
    #[case(Encoder::JsonPlain, Value::model(Ticket::new("a", 1)), true)]
    #[case(Encoder::JsonPlain, Value::Json(serde_json::json!(1)), true)]
    #[case(Encoder::JsonPlain, Value::Null, false)]
    #[case(Encoder::BinaryNull, Value::Null, true)]
    #[case(Encoder::BinaryPlain, Value::Bytes(Bytes::from_static(b"x")), true)]
    #[case(Encoder::BinaryPlain, Value::Null, false)]
    fn can_encode_matches_value_shape(
        #[case] encoder: Encoder,
        #[case] value: Value,
        #[case] expected: bool,
    ) {
        assert_eq!(encoder.can_encode(&value), expected);
    }

    #[test]
    fn model_payload_holds_utf8_json_text() {
        let payload = Encoder::JsonModel
            .encode(&Value::model(Ticket::new("t-9", 4)))
            .unwrap();
        assert_eq!(payload.encoding(), Some("json/model"));
        let text = std::str::from_utf8(payload.data()).unwrap();
        assert_eq!(text, r#"{"id":"t-9","seats":4}"#);
    }

    #[test]
    fn binary_encoding_rejects_model_hint() {
        let payload = Encoder::BinaryPlain
            .encode(&Value::Bytes(Bytes::from_static(b"raw")))
            .unwrap();
        let err = Encoder::BinaryPlain
            .decode(&payload, Some(&TypeHint::of::<Ticket>()))
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::IncompatibleHint {
                encoding: "binary/plain".to_string(),
                expected: "test.Ticket",
            }
        );
    }
}
