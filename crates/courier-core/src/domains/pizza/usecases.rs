//! Pizza use cases - 業務ロジック
//!
//! payload やリトライのことは知らず、Activity から呼ばれるだけです。

use std::sync::Arc;

use tracing::info;

use super::contracts::{Bill, PizzaItem, PizzaOrder};
use super::services::{DeliveryService, PaymentGateway, ServiceError};

const VIP_DISCOUNT: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UseCaseError {
    #[error("Payment failed for order {0}")]
    PaymentDeclined(String),

    #[error("Refund failed for order {0}")]
    RefundDeclined(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// サイズごとの単価（S=10, M=15, それ以外=20）
fn unit_price(item: &PizzaItem) -> f64 {
    match item.size.as_str() {
        "S" => 10.0,
        "M" => 15.0,
        _ => 20.0,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CalculateBill;

impl CalculateBill {
    pub fn execute(&self, order: &PizzaOrder) -> Bill {
        let mut total: f64 = order
            .items
            .iter()
            .map(|item| unit_price(item) * item.quantity as f64)
            .sum();
        if order.is_vip {
            info!(order_id = %order.order_id, "applying VIP discount");
            total *= VIP_DISCOUNT;
        }
        Bill::new(order.order_id.clone(), total)
    }
}

pub struct ProcessPayment {
    gateway: Arc<dyn PaymentGateway>,
}

impl ProcessPayment {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    /// 請求する。拒否された場合は `PaymentDeclined`
    pub async fn execute(&self, bill: &Bill) -> Result<(), UseCaseError> {
        if self.gateway.charge(bill).await? {
            Ok(())
        } else {
            Err(UseCaseError::PaymentDeclined(bill.order_id.clone()))
        }
    }

    /// 請求を全額取り消す。拒否された場合は `RefundDeclined`
    pub async fn refund(&self, bill: &Bill) -> Result<(), UseCaseError> {
        if self.gateway.refund(&bill.order_id, bill.total_amount).await? {
            info!(order_id = %bill.order_id, amount = bill.total_amount, "payment refunded");
            Ok(())
        } else {
            Err(UseCaseError::RefundDeclined(bill.order_id.clone()))
        }
    }
}

pub struct ArrangeDelivery {
    delivery: Arc<dyn DeliveryService>,
}

impl ArrangeDelivery {
    pub fn new(delivery: Arc<dyn DeliveryService>) -> Self {
        Self { delivery }
    }

    pub async fn execute(&self, order: &PizzaOrder) -> Result<String, UseCaseError> {
        Ok(self.delivery.schedule_delivery(order).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::pizza::contracts::fixtures::{item, order};
    use crate::domains::pizza::services::MockPaymentGateway;
    use async_trait::async_trait;
    use rstest::rstest;

    #[rstest]
    #[case(vec![item("S", 1)], false, 10.0)]
    #[case(vec![item("M", 2)], false, 30.0)]
    #[case(vec![item("L", 1), item("S", 3)], false, 50.0)]
    #[case(vec![item("M", 2), item("L", 1)], true, 40.0)]
    #[case(vec![], false, 0.0)]
    fn bill_totals(#[case] items: Vec<PizzaItem>, #[case] is_vip: bool, #[case] expected: f64) {
        let bill = CalculateBill.execute(&order(items, is_vip));
        assert!((bill.total_amount - expected).abs() < 1e-9, "got {}", bill.total_amount);
        assert_eq!(bill.order_id, "order-1");
        assert_eq!(bill.currency, "USD");
    }

    struct DecliningGateway;

    #[async_trait]
    impl PaymentGateway for DecliningGateway {
        async fn charge(&self, _bill: &Bill) -> Result<bool, ServiceError> {
            Ok(false)
        }

        async fn refund(&self, _order_id: &str, _amount: f64) -> Result<bool, ServiceError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn declined_charge_is_reported_with_the_order_id() {
        let payment = ProcessPayment::new(Arc::new(DecliningGateway));
        let err = payment.execute(&Bill::new("order-9", 10.0)).await.unwrap_err();
        assert_eq!(err, UseCaseError::PaymentDeclined("order-9".to_string()));
        assert_eq!(err.to_string(), "Payment failed for order order-9");
    }

    #[tokio::test]
    async fn accepted_charge_succeeds() {
        let payment = ProcessPayment::new(Arc::new(MockPaymentGateway::instant()));
        assert!(payment.execute(&Bill::new("order-1", 10.0)).await.is_ok());
        assert!(payment.refund(&Bill::new("order-1", 10.0)).await.is_ok());
    }

    #[tokio::test]
    async fn declined_refund_is_reported_with_the_order_id() {
        let payment = ProcessPayment::new(Arc::new(DecliningGateway));
        let err = payment.refund(&Bill::new("order-9", 10.0)).await.unwrap_err();
        assert_eq!(err, UseCaseError::RefundDeclined("order-9".to_string()));
    }
}
