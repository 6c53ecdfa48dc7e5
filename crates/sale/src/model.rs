//! Catalog and sale records.
//!
//! Prices are integer minor currency units (cents).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A physical store. Every product and sale belongs to exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub store_id: String,

    /// Selling price per unit.
    pub unit_price: u64,

    /// Purchase price per unit.
    #[serde(default)]
    pub cost_price: Option<u64>,

    #[serde(default)]
    pub stock_quantity: u32,
    #[serde(default)]
    pub min_stock: u32,
    #[serde(default)]
    pub max_stock: Option<u32>,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Product {
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::classify(self.stock_quantity, self.min_stock)
    }
}

/// Stock level relative to the product's minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    Low,
    InStock,
}

impl StockStatus {
    pub fn classify(stock: u32, min_stock: u32) -> Self {
        if stock == 0 {
            Self::OutOfStock
        } else if stock <= min_stock {
            Self::Low
        } else {
            Self::InStock
        }
    }

    pub fn needs_attention(self) -> bool {
        self != Self::InStock
    }
}

/// How a sale was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Transfer,
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            "transfer" => Ok(Self::Transfer),
            other => Err(format!("unknown payment method '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Pending,
    Completed,
    Cancelled,
}

/// One product line of a completed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub total_price: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Inbound,
    Outbound,
    Adjustment,
}

/// A change in stock, recorded against the sale that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub product_id: String,
    pub movement_type: MovementType,
    /// Signed change; negative for outbound movements.
    pub quantity: i64,
    pub previous_stock: u32,
    pub new_stock: u32,
    pub reference_id: String,
    pub reference_type: String,
    pub notes: Option<String>,
}

/// A sale ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSale {
    pub sale_number: String,
    pub store_id: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<SaleItem>,
    pub subtotal: u64,
    pub discount_amount: u64,
    pub total_amount: u64,
    pub movements: Vec<StockMovement>,
}

/// Format minor units as a decimal amount, e.g. `1250` as `12.50`.
pub fn format_amount(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_status_thresholds() {
        assert_eq!(StockStatus::classify(0, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(0, 0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(5, 5), StockStatus::Low);
        assert_eq!(StockStatus::classify(6, 5), StockStatus::InStock);
        assert!(!StockStatus::InStock.needs_attention());
    }

    #[test]
    fn test_product_defaults_for_sparse_rows() {
        let product: Product = serde_json::from_str(
            r#"{ "id": "p1", "name": "Hammer", "store_id": "s1", "unit_price": 1299 }"#,
        )
        .unwrap();
        assert!(product.is_active);
        assert_eq!(product.stock_quantity, 0);
        assert_eq!(product.stock_status(), StockStatus::OutOfStock);
        assert!(product.barcode.is_none());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0.00");
        assert_eq!(format_amount(1205), "12.05");
        assert_eq!(format_amount(99), "0.99");
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("card".parse::<PaymentMethod>(), Ok(PaymentMethod::Card));
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }
}
