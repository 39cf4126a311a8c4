//! Errors - ハンドラ実行エラーとドメイン解決エラー

use super::descriptor::HandlerKind;

/// ErrorKind はハンドラ失敗の運用分類
///
/// - Retryable: 一時的なエラー（エンジンのリトライ方針に従って再試行）
/// - NonRetryable: 恒久的なエラー（入力が壊れている等、再試行は無意味）
/// - TimedOut: 1 回の試行が時間切れ（再試行対象）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Retryable,
    NonRetryable,
    TimedOut,
}

/// HandlerError は Activity / Workflow の失敗
///
/// Transport を越えてタスクの投入元に返されます。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct HandlerError {
    kind: ErrorKind,
    message: String,
}

impl HandlerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn retryable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Retryable, message)
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NonRetryable, message)
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TimedOut, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind, ErrorKind::NonRetryable)
    }
}

/// DomainResolutionError は設定に書かれたドメインを読み込めなかった理由
///
/// ドメイン単位で診断として記録され、他のドメインの読み込みは止めません。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainResolutionError {
    #[error("domain '{0}' is not registered in the domain catalog")]
    NotFound(String),

    #[error("domain '{domain}' failed to build: {reason}")]
    Build { domain: String, reason: String },

    #[error("domain '{0}' does not declare a task queue")]
    MissingTaskQueue(String),

    #[error("domain '{domain}' lists {kind} '{handler}' more than once")]
    DuplicateHandler {
        domain: String,
        kind: HandlerKind,
        handler: String,
    },
}

impl DomainResolutionError {
    pub fn build(domain: impl Into<String>, reason: impl ToString) -> Self {
        Self::Build {
            domain: domain.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_out_is_retryable() {
        assert!(HandlerError::timed_out("slow").is_retryable());
        assert!(HandlerError::retryable("flaky").is_retryable());
        assert!(!HandlerError::non_retryable("bad input").is_retryable());
    }

    #[test]
    fn resolution_error_messages_name_the_domain() {
        let err = DomainResolutionError::MissingTaskQueue("billing".to_string());
        assert!(err.to_string().contains("billing"));

        let err = DomainResolutionError::DuplicateHandler {
            domain: "pizza".to_string(),
            kind: HandlerKind::Activity,
            handler: "calculate_bill".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "domain 'pizza' lists activity 'calculate_bill' more than once"
        );
    }
}
