//! PizzaOrderWorkflow - 注文から配送までのオーケストレーション
//!
//! 特定のドメインに属さない Workflow として `WorkflowRoutes` 経由で登録されます。
//!
//! 請求後に配送の手配が失敗した場合は、請求を取り消してから失敗します。

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::activities::{
    CalculateBillActivity, ChargeCreditCardActivity, ProcessDeliveryActivity,
    RefundPaymentActivity,
};
use super::contracts::{PizzaOrder, Receipt};
use crate::domain::{HandlerError, RetryPolicy};
use crate::typed::{ActivityOptions, Workflow, WorkflowContext};

/// 配送の手配を諦めて返金に移るまでの試行回数
const DELIVERY_ATTEMPTS: u32 = 3;

pub struct PizzaOrderWorkflow;

#[async_trait]
impl Workflow for PizzaOrderWorkflow {
    const NAME: &'static str = "PizzaOrderWorkflow";
    type Input = PizzaOrder;
    type Output = Receipt;

    async fn run(&self, ctx: &WorkflowContext, order: PizzaOrder) -> Result<Receipt, HandlerError> {
        info!(workflow_id = %ctx.workflow_id(), order_id = %order.order_id, "pizza order received");

        let bill = ctx
            .execute_activity::<CalculateBillActivity>(
                order.clone(),
                ActivityOptions::with_timeout(Duration::from_secs(5)),
            )
            .await?;

        let paid = ctx
            .execute_activity::<ChargeCreditCardActivity>(
                bill.clone(),
                ActivityOptions::with_timeout(Duration::from_secs(10)),
            )
            .await?;
        if !paid {
            return Err(HandlerError::non_retryable("Payment failed!"));
        }

        let delivery = ctx
            .execute_activity::<ProcessDeliveryActivity>(
                order.clone(),
                ActivityOptions::with_timeout(Duration::from_secs(10)).with_retry_policy(
                    RetryPolicy::default().with_maximum_attempts(DELIVERY_ATTEMPTS),
                ),
            )
            .await;
        let delivered_to = match delivery {
            Ok(delivered_to) => delivered_to,
            Err(err) => {
                warn!(order_id = %order.order_id, error = %err, "delivery failed; refunding payment");
                ctx.execute_activity::<RefundPaymentActivity>(
                    bill,
                    ActivityOptions::with_timeout(Duration::from_secs(10)),
                )
                .await?;
                return Err(HandlerError::non_retryable(format!(
                    "Delivery failed, payment refunded: {}",
                    err.message()
                )));
            }
        };

        Ok(Receipt {
            order_id: order.order_id,
            status: "COMPLETED".to_string(),
            message: "Bon Appetit!".to_string(),
            delivered_to,
        })
    }
}
