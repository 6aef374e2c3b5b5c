//! Order line items and payment records.

use chrono::{DateTime, Utc};
use common::{Money, ProductId, VariantId};
use serde::{Deserialize, Serialize};

/// A line on a placed order. Snapshotted from the cart at placement; later
/// catalog changes never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub sku: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderItem {
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Record of a successful charge against the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub transaction_id: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub paid_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Currency;

    #[test]
    fn test_order_item_total() {
        let item = OrderItem {
            product_id: ProductId::new(),
            variant_id: None,
            product_name: "Widget".to_string(),
            sku: "WID-001".to_string(),
            unit_price: Money::from_cents(1250, Currency::Usd),
            quantity: 3,
        };
        assert_eq!(item.total_price(), Money::from_cents(3750, Currency::Usd));
    }

    #[test]
    fn test_payment_method_serialization() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::BankTransfer).unwrap(),
            "\"bank_transfer\""
        );
        assert_eq!(PaymentMethod::CashOnDelivery.as_str(), "cash_on_delivery");
    }
}
