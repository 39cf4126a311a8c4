//! Ports - 外部システムとの境界（trait）
//!
//! 実装は `impls` に置きます。

pub mod transport;

pub use self::transport::{TaskLease, TaskRequest, TaskResult, Transport, TransportError};
