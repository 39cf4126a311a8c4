//! App - アプリケーション層
//!
//! このモジュールは、registry と ports を組み合わせてワーカープロセスを組み立てます。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: 設定からドメインを読み込む composition root
//! - **WorkerComposer**: queue ごとに QueueWorker を起動し WorkerGroup にまとめる
//! - **WorkerLoop**: poll → handle → reply のタスク実行ループ
//! - **Client**: Workflow の投入
//! - **Status**: ワーカーごとの実行件数

pub mod builder;
pub mod client;
pub mod composer;
pub mod status;
pub mod worker_loop;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::client::{Client, ClientError};
pub use self::composer::{ComposeError, WorkerComposer, WorkerGroup};
pub use self::status::WorkerCounts;
pub use self::worker_loop::{QueueWorker, WorkerError, WorkerOptions};
