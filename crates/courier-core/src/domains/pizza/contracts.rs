//! Pizza contracts - Activity 名と DTO
//!
//! Activity 名はここが唯一の定義元です。Activity 実装と Workflow の両方がこの定数を参照します。

use serde::{Deserialize, Serialize};

use crate::codec::{Schema, Validate, Violations};

pub const ACTIVITY_CALCULATE_BILL: &str = "calculate_bill";
pub const ACTIVITY_CHARGE_CREDIT_CARD: &str = "charge_credit_card";
pub const ACTIVITY_PROCESS_DELIVERY: &str = "process_delivery";
pub const ACTIVITY_REFUND_PAYMENT: &str = "refund_payment";

/// 受け付けるピザのサイズ
pub const PIZZA_SIZES: [&str; 3] = ["S", "M", "L"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub zip_code: String,
}

impl Validate for Address {
    fn validate(&self, _violations: &mut Violations) {}
}

impl Schema for Address {
    const NAME: &'static str = "pizza.Address";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PizzaItem {
    pub flavor: String,
    /// S, M, L のいずれか
    pub size: String,
    pub quantity: i64,
}

impl Validate for PizzaItem {
    fn validate(&self, v: &mut Violations) {
        v.check(
            PIZZA_SIZES.contains(&self.size.as_str()),
            "size",
            format!("must be one of S, M, L (got '{}')", self.size),
        );
        v.check(self.quantity > 0, "quantity", "must be greater than 0");
    }
}

impl Schema for PizzaItem {
    const NAME: &'static str = "pizza.PizzaItem";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PizzaOrder {
    pub order_id: String,
    pub customer_name: String,
    pub items: Vec<PizzaItem>,
    pub delivery_address: Address,
    #[serde(default)]
    pub is_vip: bool,
}

impl Validate for PizzaOrder {
    fn validate(&self, v: &mut Violations) {
        v.each("items", &self.items);
        v.nested("delivery_address", &self.delivery_address);
    }
}

impl Schema for PizzaOrder {
    const NAME: &'static str = "pizza.PizzaOrder";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub order_id: String,
    pub total_amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Bill {
    pub fn new(order_id: impl Into<String>, total_amount: f64) -> Self {
        Self {
            order_id: order_id.into(),
            total_amount,
            currency: default_currency(),
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Validate for Bill {
    fn validate(&self, v: &mut Violations) {
        v.check(
            self.total_amount.is_finite() && self.total_amount >= 0.0,
            "total_amount",
            "must be a non-negative amount",
        );
    }
}

impl Schema for Bill {
    const NAME: &'static str = "pizza.Bill";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub order_id: String,
    pub status: String,
    pub message: String,
    pub delivered_to: String,
}

impl Validate for Receipt {
    fn validate(&self, _violations: &mut Violations) {}
}

impl Schema for Receipt {
    const NAME: &'static str = "pizza.Receipt";
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn item(size: &str, quantity: i64) -> PizzaItem {
        PizzaItem {
            flavor: "margherita".to_string(),
            size: size.to_string(),
            quantity,
        }
    }

    pub fn order(items: Vec<PizzaItem>, is_vip: bool) -> PizzaOrder {
        PizzaOrder {
            order_id: "order-1".to_string(),
            customer_name: "Ada".to_string(),
            items,
            delivery_address: Address {
                street: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                zip_code: "12345".to_string(),
            },
            is_vip,
        }
    }
}
