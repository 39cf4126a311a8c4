//! Codec - 多態的なペイロードコーデック
//!
//! 厳密に検証される構造化モデルと汎用レコードが同じシステム内で共存するため、
//! 複数のエンコーダを優先順に並べたチェーンで変換します。
//!
//! # 構成
//! - **payload**: `Payload`（metadata + data）と `EncodingTag`
//! - **value**: `Value`, `Schema`, `TypeHint`, `Transportable`
//! - **encoder**: `Encoder`（閉じた variant 集合）
//! - **chain**: `PayloadCodec`
//! - **validation**: `Validate`, `ValidationError`

pub mod chain;
pub mod encoder;
pub mod error;
pub mod payload;
pub mod validation;
pub mod value;

pub use self::chain::PayloadCodec;
pub use self::encoder::Encoder;
pub use self::error::CodecError;
pub use self::payload::{EncodingTag, METADATA_ENCODING, Payload};
pub use self::validation::{Validate, ValidationError, Violation, Violations};
pub use self::value::{Model, Schema, Transportable, TypeHint, Value};

#[cfg(test)]
pub(crate) mod testing {
    use serde::{Deserialize, Serialize};

    use super::{Schema, Validate, Violations};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Ticket {
        pub id: String,
        pub seats: i64,
    }

    impl Ticket {
        pub fn new(id: &str, seats: i64) -> Self {
            Self {
                id: id.to_string(),
                seats,
            }
        }
    }

    impl Validate for Ticket {
        fn validate(&self, v: &mut Violations) {
            v.check(self.seats > 0, "seats", "must be greater than 0");
        }
    }

    impl Schema for Ticket {
        const NAME: &'static str = "test.Ticket";
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Coupon {
        pub code: String,
    }

    impl Validate for Coupon {
        fn validate(&self, v: &mut Violations) {
            v.check(!self.code.is_empty(), "code", "must not be empty");
        }
    }

    impl Schema for Coupon {
        const NAME: &'static str = "test.Coupon";
    }
}
