//! courier-core
//!
//! ドメインプラグイン型のワーカーランタイム。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task_queue, descriptor, retry, errors）
//! - **codec**: PayloadCodec（エンコーダチェーン、Value、TypeHint、検証）
//! - **typed**: 型付き Activity / Workflow API と型消去（DynActivity, DynWorkflow）
//! - **registry**: DomainCatalog, WorkflowRoutes, DomainRegistry（queue ごとの集約）
//! - **ports**: Transport（オーケストレーションエンジンとの境界）
//! - **impls**: InMemoryTransport（プロセス内エンジン）
//! - **app**: AppBuilder, WorkerComposer, WorkerGroup, Client
//! - **domains**: 組み込みのデモドメイン（hello, pizza）
//! - **config**: 環境変数からの WorkerConfig

pub mod app;
pub mod codec;
pub mod config;
pub mod domain;
pub mod domains;
pub mod impls;
pub mod ports;
pub mod registry;
pub mod typed;

pub use self::config::{AppEnv, ConfigError, WorkerConfig};
