//! TaskQueue - エンジンが作業を振り分けるチャネル名

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// 空白のみ・空文字の queue 名
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("task queue name must not be blank")]
pub struct BlankTaskQueue;

/// 検証済みの task queue 名
///
/// 前後の空白は取り除かれ、空の名前は作れません。
/// BTreeMap のキーとして使うため `Ord` を持ちます（ワーカーの起動順が決定的になる）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskQueue(String);

impl TaskQueue {
    pub fn new(name: impl Into<String>) -> Result<Self, BlankTaskQueue> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(BlankTaskQueue);
        }
        if trimmed.len() == name.len() {
            Ok(Self(name))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for TaskQueue {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskQueue {
    type Error = BlankTaskQueue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for TaskQueue {
    type Error = BlankTaskQueue;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskQueue> for String {
    fn from(value: TaskQueue) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn blank_names_are_rejected(#[case] raw: &str) {
        assert_eq!(TaskQueue::new(raw), Err(BlankTaskQueue));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let queue = TaskQueue::new("  pizza-task-queue ").unwrap();
        assert_eq!(queue.as_str(), "pizza-task-queue");
    }

    #[test]
    fn deserialize_rejects_blank() {
        let err = serde_json::from_str::<TaskQueue>("\" \"");
        assert!(err.is_err());

        let ok: TaskQueue = serde_json::from_str("\"hello-task-queue\"").unwrap();
        assert_eq!(ok.as_str(), "hello-task-queue");
    }
}
