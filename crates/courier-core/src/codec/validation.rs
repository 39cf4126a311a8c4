//! Validation - 構造化モデルのフィールド制約
//!
//! デコード時に TypeHint が与えられた場合、デシリアライズの後に `Validate` を実行し、
//! 違反をすべて集めて `ValidationError` として返します（最初の 1 件で止めない）。

use std::fmt;

/// フィールド単位の違反
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// ドット区切りのパス（例: `items[0].quantity`）。値全体なら `$`。
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// モデルが型制約を満たさなかった
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{type_name} failed validation: {}", join(.violations))]
pub struct ValidationError {
    pub type_name: String,
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(type_name: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self {
            type_name: type_name.into(),
            violations,
        }
    }

    /// serde のデータエラー（必須フィールド欠落・型違い）を違反 1 件に変換
    ///
    /// 違反のフィールドは serde_path_to_error が辿ったパス（例: `items[0].quantity`）。
    /// 欠落フィールドはそのパスの下に名前を足します。
    pub fn from_serde(
        type_name: impl Into<String>,
        err: &serde_path_to_error::Error<serde_json::Error>,
    ) -> Self {
        let message = err.inner().to_string();
        // ルートのパスは "."
        let path = err.path().to_string();
        let base = (path != ".").then_some(path.as_str());
        let field = match (base, missing_field_name(&message)) {
            (Some(base), Some(name)) => format!("{base}.{name}"),
            (None, Some(name)) => name.to_string(),
            (Some(base), None) => base.to_string(),
            (None, None) => "$".to_string(),
        };
        Self::new(type_name, vec![Violation::new(field, message)])
    }

    /// 指定フィールドに違反があるか
    pub fn has_violation(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// serde_json の "missing field `name` at line 1 column 2" からフィールド名を取り出す
fn missing_field_name(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("missing field `")?;
    rest.split('`').next()
}

/// Validate はモデルの値制約を表す
///
/// # 使用例
/// ```ignore
/// impl Validate for PizzaItem {
///     fn validate(&self, v: &mut Violations) {
///         v.check(self.quantity > 0, "quantity", "must be greater than 0");
///     }
/// }
/// ```
pub trait Validate {
    fn validate(&self, violations: &mut Violations);
}

/// 違反の収集器。ネストしたモデルはパスを積んで検証する。
#[derive(Debug, Default)]
pub struct Violations {
    path: Vec<String>,
    items: Vec<Violation>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        let field = self.qualify(field);
        self.items.push(Violation::new(field, message));
    }

    /// `condition` が偽なら違反を記録
    pub fn check(&mut self, condition: bool, field: &str, message: impl Into<String>) {
        if !condition {
            self.push(field, message);
        }
    }

    /// ネストしたモデルを `field` 配下として検証
    pub fn nested<T: Validate + ?Sized>(&mut self, field: &str, value: &T) {
        self.path.push(field.to_string());
        value.validate(self);
        self.path.pop();
    }

    /// 配列の各要素を `field[i]` 配下として検証
    pub fn each<T: Validate>(&mut self, field: &str, values: &[T]) {
        for (index, value) in values.iter().enumerate() {
            self.nested(&format!("{field}[{index}]"), value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_result(self, type_name: &str) -> Result<(), ValidationError> {
        if self.items.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(type_name, self.items))
        }
    }

    fn qualify(&self, field: &str) -> String {
        if self.path.is_empty() {
            return field.to_string();
        }
        let mut qualified = self.path.join(".");
        qualified.push('.');
        qualified.push_str(field);
        qualified
    }
}

/// 値を検証して結果を返す
pub fn validate<T: Validate + ?Sized>(value: &T, type_name: &str) -> Result<(), ValidationError> {
    let mut violations = Violations::new();
    value.validate(&mut violations);
    violations.into_result(type_name)
}
