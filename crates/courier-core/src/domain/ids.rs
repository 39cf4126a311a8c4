//! Strongly-typed identifiers.
//!
//! ULID ベースの ID を Phantom type パターンで型ごとに区別します。
//! `TaskId` と `WorkerId` は同じ表現を持ちますが、混同するとコンパイルエラーになります。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: ログ上で配送順に並ぶ
//! - **分散生成可能**: エンジン側と調整せずに生成できる

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"task-", "worker-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// `T` は実行時にメモリを消費しないマーカーです。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// 現在時刻から新しい ID を生成
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Task のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// Worker のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Worker {}

impl IdMarker for Worker {
    fn prefix() -> &'static str {
        "worker-"
    }
}

/// エンジンが配送するタスク 1 件の ID
pub type TaskId = Id<Task>;

/// 起動したワーカー（queue 1 つにつき 1 つ）の ID
pub type WorkerId = Id<Worker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_type_prefix() {
        let ulid = Ulid::new();
        let task_id = TaskId::from_ulid(ulid);
        let worker_id = WorkerId::from_ulid(ulid);

        assert_eq!(task_id.to_string(), format!("task-{ulid}"));
        assert_eq!(worker_id.to_string(), format!("worker-{ulid}"));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = TaskId::generate();
        let b = TaskId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn serde_keeps_ulid_text() {
        let ulid = Ulid::new();
        let id = TaskId::from_ulid(ulid);
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json["ulid"], ulid.to_string());

        let back: TaskId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }
}
