//! Domains - 組み込みのデモドメイン
//!
//! ドメインは実行時に探索されません。ここで識別子とファクトリ関数を明示的に登録し、
//! `ENABLE_DOMAINS` に書かれたものだけが読み込まれます。

pub mod hello;
pub mod pizza;

use tracing::warn;

use crate::domain::TaskQueue;
use crate::registry::{DomainCatalog, DomainFactory, WorkflowRoutes};

const BUILTIN_DOMAINS: [(&str, DomainFactory); 2] = [
    (hello::DOMAIN, hello::descriptor),
    (pizza::DOMAIN, pizza::descriptor),
];

/// 組み込みドメインのカタログ
pub fn builtin_catalog() -> DomainCatalog {
    let mut catalog = DomainCatalog::new();
    for (identifier, factory) in BUILTIN_DOMAINS {
        if let Err(err) = catalog.register(identifier, factory) {
            warn!(error = %err, "skipping builtin domain");
        }
    }
    catalog
}

/// ドメインから独立した Workflow の登録表
///
/// 登録先の queue を担当するドメインが有効な場合だけワーカーに載ります。
pub fn builtin_routes() -> WorkflowRoutes {
    let routes = WorkflowRoutes::new();
    match TaskQueue::new(pizza::TASK_QUEUE) {
        Ok(queue) => routes.route(queue, pizza::PizzaOrderWorkflow),
        Err(err) => {
            warn!(error = %err, "skipping pizza workflow route");
            routes
        }
    }
}
