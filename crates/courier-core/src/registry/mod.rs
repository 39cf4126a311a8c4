//! Registry - ドメインの解決と queue ごとの集約
//!
//! - **catalog**: 識別子 → ファクトリ関数
//! - **routes**: ドメインから独立した Workflow → queue
//! - **bundle**: queue ごとのハンドラ集合
//! - **loader**: DomainRegistry（LoadDomains）

pub mod bundle;
pub mod catalog;
pub mod loader;
pub mod routes;

pub use self::bundle::{QueueBundle, QueueBundles};
pub use self::catalog::{DomainCatalog, DomainFactory, RegistryError};
pub use self::loader::{Diagnostic, DiagnosticKind, DomainRegistry, LoadReport, Severity};
pub use self::routes::WorkflowRoutes;
