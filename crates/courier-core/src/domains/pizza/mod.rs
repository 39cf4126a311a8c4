//! pizza - 注文・決済・配送のデモドメイン
//!
//! # 層構造
//! - **contracts**: Activity 名と DTO（検証付きモデル）
//! - **services**: 外部サービスの port と mock 実装
//! - **usecases**: 業務ロジック
//! - **activities**: UseCase を Activity として公開
//! - **workflows**: PizzaOrderWorkflow（routes 経由で登録）
//!
//! `descriptor()` が composition root です。環境に応じて外部サービスの実装を選び、
//! UseCase と Activity に注入します。

pub mod activities;
pub mod contracts;
pub mod services;
pub mod usecases;
pub mod workflows;

use std::sync::Arc;

use tracing::{info, warn};

pub use self::contracts::{Address, Bill, PizzaItem, PizzaOrder, Receipt};
pub use self::workflows::PizzaOrderWorkflow;

use self::activities::{
    CalculateBillActivity, ChargeCreditCardActivity, ProcessDeliveryActivity,
    RefundPaymentActivity,
};
use self::services::{DeliveryService, MockDeliveryService, MockPaymentGateway, PaymentGateway};
use self::usecases::{ArrangeDelivery, CalculateBill, ProcessPayment};
use crate::config::{AppEnv, WorkerConfig};
use crate::domain::{DomainDescriptor, DomainResolutionError};

pub const DOMAIN: &str = "pizza";
pub const TASK_QUEUE: &str = "pizza-task-queue";

/// ドメインのファクトリ
///
/// Workflow は登録しません（PizzaOrderWorkflow は `domains::builtin_routes()` が担当）。
pub fn descriptor(config: &WorkerConfig) -> Result<DomainDescriptor, DomainResolutionError> {
    let (payment, delivery) = external_services(config.app_env());
    Ok(descriptor_with(payment, delivery))
}

fn descriptor_with(
    payment: Arc<dyn PaymentGateway>,
    delivery: Arc<dyn DeliveryService>,
) -> DomainDescriptor {
    // 請求と返金は同じゲートウェイを使う
    let payment = Arc::new(ProcessPayment::new(payment));

    DomainDescriptor::builder(DOMAIN)
        .task_queue(TASK_QUEUE)
        .activity(CalculateBillActivity::new(CalculateBill))
        .activity(ChargeCreditCardActivity::new(Arc::clone(&payment)))
        .activity(ProcessDeliveryActivity::new(Arc::new(ArrangeDelivery::new(
            delivery,
        ))))
        .activity(RefundPaymentActivity::new(payment))
        .build()
}

fn external_services(app_env: AppEnv) -> (Arc<dyn PaymentGateway>, Arc<dyn DeliveryService>) {
    match app_env {
        AppEnv::Prod => {
            // 本番用の実装はまだないので mock で代用する
            warn!(domain = DOMAIN, %app_env, "no production services configured; using mocks");
        }
        AppEnv::Dev => info!(domain = DOMAIN, %app_env, "using mock services"),
    }
    (
        Arc::new(MockPaymentGateway::new()),
        Arc::new(MockDeliveryService::new()),
    )
}
