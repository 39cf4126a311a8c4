//! Pizza services - 外部サービスの port と mock 実装
//!
//! UseCase は trait だけに依存し、どの実装を使うかはドメインのファクトリが決めます。

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::contracts::{Bill, PizzaOrder};

/// 外部サービス呼び出しの失敗（通信エラー等。業務上の拒否は戻り値で表す）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{service} is unavailable: {reason}")]
pub struct ServiceError {
    pub service: &'static str,
    pub reason: String,
}

/// 決済ゲートウェイ
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// 請求する。`Ok(false)` は決済が拒否されたことを表す
    async fn charge(&self, bill: &Bill) -> Result<bool, ServiceError>;

    /// 請求を取り消す。`Ok(false)` は返金が拒否されたことを表す
    async fn refund(&self, order_id: &str, amount: f64) -> Result<bool, ServiceError>;
}

/// 配送サービス
#[async_trait]
pub trait DeliveryService: Send + Sync {
    /// 配送を手配して配送先の住所を返す
    async fn schedule_delivery(&self, order: &PizzaOrder) -> Result<String, ServiceError>;
}

/// 外部呼び出しの遅延を真似る
const MOCK_LATENCY: Duration = Duration::from_millis(100);

/// 常に成功する決済ゲートウェイ
#[derive(Debug, Clone, Default)]
pub struct MockPaymentGateway {
    latency: Option<Duration>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            latency: Some(MOCK_LATENCY),
        }
    }

    /// 遅延なし（テスト用）
    pub fn instant() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn charge(&self, bill: &Bill) -> Result<bool, ServiceError> {
        simulate(self.latency).await;
        info!(
            order_id = %bill.order_id,
            amount = bill.total_amount,
            currency = %bill.currency,
            "mock payment charged"
        );
        Ok(true)
    }

    async fn refund(&self, order_id: &str, amount: f64) -> Result<bool, ServiceError> {
        simulate(self.latency).await;
        info!(%order_id, amount, "mock payment refunded");
        Ok(true)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockDeliveryService {
    latency: Option<Duration>,
}

impl MockDeliveryService {
    pub fn new() -> Self {
        Self {
            latency: Some(MOCK_LATENCY),
        }
    }

    pub fn instant() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryService for MockDeliveryService {
    async fn schedule_delivery(&self, order: &PizzaOrder) -> Result<String, ServiceError> {
        simulate(self.latency).await;
        let address = &order.delivery_address;
        let full_address = format!("{}, {}, {}", address.street, address.city, address.zip_code);
        info!(order_id = %order.order_id, to = %full_address, "mock delivery scheduled");
        Ok(full_address)
    }
}

async fn simulate(latency: Option<Duration>) {
    if let Some(latency) = latency {
        tokio::time::sleep(latency).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::pizza::contracts::fixtures::{item, order};

    #[tokio::test]
    async fn mock_delivery_formats_the_full_address() {
        let service = MockDeliveryService::instant();
        let address = service
            .schedule_delivery(&order(vec![item("S", 1)], false))
            .await
            .unwrap();
        assert_eq!(address, "1 Main St, Springfield, 12345");
    }

    #[tokio::test(start_paused = true)]
    async fn mock_payment_accepts_every_charge() {
        let gateway = MockPaymentGateway::new();
        assert!(gateway.charge(&Bill::new("order-1", 30.0)).await.unwrap());
        assert!(gateway.refund("order-1", 30.0).await.unwrap());
    }
}
