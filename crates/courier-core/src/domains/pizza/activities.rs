//! Pizza activities - UseCase を Activity として公開する
//!
//! UseCase のエラーはここで HandlerError に変換します。
//! 外部サービスの失敗は retryable、入力起因の失敗は non-retryable です。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::contracts::{
    ACTIVITY_CALCULATE_BILL, ACTIVITY_CHARGE_CREDIT_CARD, ACTIVITY_PROCESS_DELIVERY,
    ACTIVITY_REFUND_PAYMENT, Bill, PizzaOrder,
};
use super::usecases::{ArrangeDelivery, CalculateBill, ProcessPayment, UseCaseError};
use crate::domain::HandlerError;
use crate::typed::Activity;

impl From<UseCaseError> for HandlerError {
    fn from(err: UseCaseError) -> Self {
        match err {
            UseCaseError::PaymentDeclined(_) | UseCaseError::RefundDeclined(_) => {
                HandlerError::non_retryable(err.to_string())
            }
            UseCaseError::Service(_) => HandlerError::retryable(err.to_string()),
        }
    }
}

pub struct CalculateBillActivity {
    usecase: CalculateBill,
}

impl CalculateBillActivity {
    pub fn new(usecase: CalculateBill) -> Self {
        Self { usecase }
    }
}

#[async_trait]
impl Activity for CalculateBillActivity {
    const NAME: &'static str = ACTIVITY_CALCULATE_BILL;
    type Input = PizzaOrder;
    type Output = Bill;

    async fn execute(&self, order: PizzaOrder) -> Result<Bill, HandlerError> {
        info!(order_id = %order.order_id, items = order.items.len(), "calculating bill");
        Ok(self.usecase.execute(&order))
    }
}

/// 決済が拒否された場合はエラーではなく `false` を返す
pub struct ChargeCreditCardActivity {
    usecase: Arc<ProcessPayment>,
}

impl ChargeCreditCardActivity {
    pub fn new(usecase: Arc<ProcessPayment>) -> Self {
        Self { usecase }
    }
}

#[async_trait]
impl Activity for ChargeCreditCardActivity {
    const NAME: &'static str = ACTIVITY_CHARGE_CREDIT_CARD;
    type Input = Bill;
    type Output = bool;

    async fn execute(&self, bill: Bill) -> Result<bool, HandlerError> {
        info!(
            order_id = %bill.order_id,
            amount = bill.total_amount,
            currency = %bill.currency,
            "charging credit card"
        );
        match self.usecase.execute(&bill).await {
            Ok(()) => Ok(true),
            Err(UseCaseError::PaymentDeclined(order_id)) => {
                warn!(%order_id, "payment declined");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// 配送に失敗した注文の請求を取り消す（補償）
pub struct RefundPaymentActivity {
    usecase: Arc<ProcessPayment>,
}

impl RefundPaymentActivity {
    pub fn new(usecase: Arc<ProcessPayment>) -> Self {
        Self { usecase }
    }
}

#[async_trait]
impl Activity for RefundPaymentActivity {
    const NAME: &'static str = ACTIVITY_REFUND_PAYMENT;
    type Input = Bill;
    type Output = ();

    async fn execute(&self, bill: Bill) -> Result<(), HandlerError> {
        warn!(order_id = %bill.order_id, amount = bill.total_amount, "refunding payment");
        Ok(self.usecase.refund(&bill).await?)
    }
}

pub struct ProcessDeliveryActivity {
    usecase: Arc<ArrangeDelivery>,
}

impl ProcessDeliveryActivity {
    pub fn new(usecase: Arc<ArrangeDelivery>) -> Self {
        Self { usecase }
    }
}

#[async_trait]
impl Activity for ProcessDeliveryActivity {
    const NAME: &'static str = ACTIVITY_PROCESS_DELIVERY;
    type Input = PizzaOrder;
    type Output = String;

    async fn execute(&self, order: PizzaOrder) -> Result<String, HandlerError> {
        let delivered_to = self.usecase.execute(&order).await?;
        info!(order_id = %order.order_id, to = %delivered_to, "delivery arranged");
        Ok(delivered_to)
    }
}
