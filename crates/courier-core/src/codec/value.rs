//! Value - コーデックが扱える値の閉じた集合
//!
//! # 二層構造
//! - **表層（Typed）**: `Schema`（構造化モデル）、`Transportable`（ハンドラの入出力型）
//! - **内部（Dyn）**: `Value` / `dyn Model`（エンコーダチェーンが見る形）
//!
//! エンコードは `Value` の形でエンコーダを選び、デコードは payload のタグで選びます。
//! 具体的なモデル型の復元には外部から渡される `TypeHint` を使います。

use std::any::Any;
use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::CodecError;
use super::validation::{Validate, ValidationError, validate};

/// Schema は検証付きの構造化モデル
///
/// # 使用例
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// struct Bill {
///     order_id: String,
///     total_amount: f64,
/// }
///
/// impl Schema for Bill {
///     const NAME: &'static str = "pizza.Bill";
/// }
/// ```
pub trait Schema:
    Serialize + DeserializeOwned + Validate + PartialEq + Clone + fmt::Debug + Send + Sync + 'static
{
    /// モデル名（エラーメッセージと TypeHint で使う）
    const NAME: &'static str;
}

/// Model は型消去された Schema
///
/// `Value::Model` に格納するための object-safe な trait です。
pub trait Model: Any + Send + Sync + fmt::Debug {
    fn type_name(&self) -> &'static str;
    fn to_json_vec(&self) -> Result<Vec<u8>, CodecError>;
    fn clone_model(&self) -> Box<dyn Model>;
    fn eq_model(&self, other: &dyn Model) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Schema> Model for T {
    fn type_name(&self) -> &'static str {
        T::NAME
    }

    fn to_json_vec(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(|e| CodecError::Serialize(e.to_string()))
    }

    fn clone_model(&self) -> Box<dyn Model> {
        Box::new(self.clone())
    }

    fn eq_model(&self, other: &dyn Model) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// コーデックが扱える値
#[derive(Debug)]
pub enum Value {
    Null,
    Bytes(Bytes),
    /// 汎用レコード（TypeHint なしでデコードしたモデルもこの形になる）
    Json(serde_json::Value),
    Model(Box<dyn Model>),
}

impl Value {
    pub fn model<T: Schema>(model: T) -> Self {
        Value::Model(Box::new(model))
    }

    /// 値の形の名前（エラーメッセージ用）
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
            Value::Model(_) => "model",
        }
    }

    pub fn as_model<T: Schema>(&self) -> Option<&T> {
        match self {
            Value::Model(model) => model.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(json) => Some(json),
            _ => None,
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        match self {
            Value::Null => Value::Null,
            Value::Bytes(bytes) => Value::Bytes(bytes.clone()),
            Value::Json(json) => Value::Json(json.clone()),
            Value::Model(model) => Value::Model(model.clone_model()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::Model(a), Value::Model(b)) => a.eq_model(b.as_ref()),
            _ => false,
        }
    }
}

/// TypeHint はデコード時に期待するモデル型
///
/// ハンドラのシグネチャ（入力型）から `TypeHint::of::<T>()` で作られます。
#[derive(Clone, Copy)]
pub struct TypeHint {
    type_name: &'static str,
    decode: fn(&[u8]) -> Result<Box<dyn Model>, CodecError>,
}

impl TypeHint {
    pub fn of<T: Schema>() -> Self {
        Self {
            type_name: T::NAME,
            decode: decode_model::<T>,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// JSON テキストから検証済みモデルを復元
    pub(crate) fn decode_json(&self, data: &[u8]) -> Result<Box<dyn Model>, CodecError> {
        (self.decode)(data)
    }
}

impl fmt::Debug for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeHint").field(&self.type_name).finish()
    }
}

impl PartialEq for TypeHint {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

fn decode_model<T: Schema>(data: &[u8]) -> Result<Box<dyn Model>, CodecError> {
    let mut de = serde_json::Deserializer::from_slice(data);
    let model: T = serde_path_to_error::deserialize(&mut de).map_err(|e| serde_failure::<T>(&e))?;
    de.end().map_err(|e| CodecError::Deserialize(e.to_string()))?;
    validate(&model, T::NAME)?;
    Ok(Box::new(model))
}

fn model_from_json<T: Schema>(json: serde_json::Value) -> Result<T, CodecError> {
    let model: T = serde_path_to_error::deserialize(json).map_err(|e| serde_failure::<T>(&e))?;
    validate(&model, T::NAME)?;
    Ok(model)
}

// 構文エラーは壊れた payload、データエラーは型制約の違反として扱う
fn serde_failure<T: Schema>(err: &serde_path_to_error::Error<serde_json::Error>) -> CodecError {
    if err.inner().is_data() {
        ValidationError::from_serde(T::NAME, err).into()
    } else {
        CodecError::Deserialize(err.inner().to_string())
    }
}

/// Transportable はハンドラの入出力として Transport を越えられる型
///
/// - `Schema` を実装したモデル → `Value::Model`（TypeHint あり）
/// - JSON プリミティブ（String, bool, i64, u32, f64）→ `Value::Json`
/// - `()` → `Value::Null`、`Bytes` → `Value::Bytes`
pub trait Transportable: Sized + Send + 'static {
    fn type_hint() -> Option<TypeHint> {
        None
    }

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Result<Self, CodecError>;
}

impl<T: Schema> Transportable for T {
    fn type_hint() -> Option<TypeHint> {
        Some(TypeHint::of::<T>())
    }

    fn into_value(self) -> Value {
        Value::Model(Box::new(self))
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Model(model) => {
                let found = model.type_name();
                model
                    .into_any()
                    .downcast::<T>()
                    .map(|model| *model)
                    .map_err(|_| CodecError::TypeMismatch {
                        expected: T::NAME,
                        found,
                    })
            }
            Value::Json(json) => model_from_json(json),
            other => Err(CodecError::TypeMismatch {
                expected: T::NAME,
                found: other.kind(),
            }),
        }
    }
}

macro_rules! json_transportable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Transportable for $ty {
                fn into_value(self) -> Value {
                    Value::Json(serde_json::Value::from(self))
                }

                fn from_value(value: Value) -> Result<Self, CodecError> {
                    match value {
                        Value::Json(json) => serde_json::from_value(json)
                            .map_err(|e| CodecError::Deserialize(e.to_string())),
                        other => Err(CodecError::TypeMismatch {
                            expected: stringify!($ty),
                            found: other.kind(),
                        }),
                    }
                }
            }
        )*
    };
}

json_transportable!(String, bool, i64, u32, f64);

impl Transportable for () {
    fn into_value(self) -> Value {
        Value::Null
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null | Value::Json(serde_json::Value::Null) => Ok(()),
            other => Err(CodecError::TypeMismatch {
                expected: "()",
                found: other.kind(),
            }),
        }
    }
}

impl Transportable for Bytes {
    fn into_value(self) -> Value {
        Value::Bytes(self)
    }

    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Bytes(bytes) => Ok(bytes),
            other => Err(CodecError::TypeMismatch {
                expected: "bytes",
                found: other.kind(),
            }),
        }
    }
}
