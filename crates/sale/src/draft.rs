//! Sale drafts built from scanned or typed codes.

use chrono::Utc;
use serde::Serialize;
use tillscan_common::error::TillscanError;

use crate::catalog::ProductCatalog;
use crate::model::{
    CompletedSale, MovementType, PaymentMethod, Product, SaleItem, SaleStatus, StockMovement,
    StockStatus,
};

/// Errors building or finalizing a sale.
#[derive(Debug, thiserror::Error)]
pub enum SaleError {
    #[error("No product matches '{identifier}'")]
    ProductNotFound { identifier: String },

    #[error("Product belongs to store {found}, but this sale is for store {expected}")]
    StoreMismatch { expected: String, found: String },

    #[error("Product {product_id} is not in this sale")]
    UnknownLine { product_id: String },

    #[error("Add at least one product to the sale")]
    Empty,

    #[error(transparent)]
    Catalog(#[from] TillscanError),
}

impl From<SaleError> for TillscanError {
    fn from(e: SaleError) -> Self {
        match e {
            SaleError::Catalog(inner) => inner,
            other => TillscanError::sale(other.to_string()),
        }
    }
}

/// One product line in a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleLine {
    pub product_id: String,
    pub name: String,
    pub unit_price: u64,
    pub quantity: u32,
}

impl SaleLine {
    pub fn total(&self) -> u64 {
        self.unit_price * u64::from(self.quantity)
    }
}

/// Result of adding a code to a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineAdded {
    pub product_id: String,
    pub quantity: u32,
    pub stock_status: StockStatus,
}

/// The store a draft is locked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftStore {
    pub id: String,
    pub name: String,
}

/// A sale being assembled at the till.
///
/// The draft locks to the store of its first product; products from any
/// other store are rejected until the draft is emptied.
#[derive(Debug, Clone, Default)]
pub struct SaleDraft {
    store: Option<DraftStore>,
    lines: Vec<SaleLine>,
    discount: u64,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub payment_method: PaymentMethod,
}

impl SaleDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> Option<&DraftStore> {
        self.store.as_ref()
    }

    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Resolve a barcode, SKU or name and add one unit of it.
    pub async fn add_identifier(
        &mut self,
        catalog: &dyn ProductCatalog,
        identifier: &str,
    ) -> Result<LineAdded, SaleError> {
        let identifier = identifier.trim();
        let product = match identifier {
            "" => None,
            id => catalog.find_by_identifier(id).await?,
        }
        .ok_or_else(|| SaleError::ProductNotFound {
            identifier: identifier.to_string(),
        })?;

        match &self.store {
            Some(store) if store.id != product.store_id => {
                tracing::warn!(
                    product = %product.id,
                    expected = %store.id,
                    found = %product.store_id,
                    "Rejected product from another store"
                );
                return Err(SaleError::StoreMismatch {
                    expected: store.id.clone(),
                    found: product.store_id,
                });
            }
            Some(_) => {}
            None => {
                let name = catalog
                    .store_name(&product.store_id)
                    .await?
                    .unwrap_or_else(|| "Unknown store".to_string());
                tracing::info!(store = %product.store_id, name = %name, "Sale locked to store");
                self.store = Some(DraftStore {
                    id: product.store_id.clone(),
                    name,
                });
            }
        }

        Ok(self.add_product(&product))
    }

    fn add_product(&mut self, product: &Product) -> LineAdded {
        let quantity = match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => {
                line.quantity += 1;
                line.quantity
            }
            None => {
                self.lines.push(SaleLine {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                    unit_price: product.unit_price,
                    quantity: 1,
                });
                1
            }
        };

        let stock_status = product.stock_status();
        if stock_status.needs_attention() || quantity > product.stock_quantity {
            tracing::warn!(
                product = %product.id,
                stock = product.stock_quantity,
                min = product.min_stock,
                quantity,
                ?stock_status,
                "Selling a product with low stock"
            );
        }

        LineAdded {
            product_id: product.id.clone(),
            quantity,
            stock_status,
        }
    }

    pub fn increase(&mut self, product_id: &str) -> Result<u32, SaleError> {
        let line = self.line_mut(product_id)?;
        line.quantity += 1;
        Ok(line.quantity)
    }

    /// Remove one unit, never going below one.
    pub fn decrease(&mut self, product_id: &str) -> Result<u32, SaleError> {
        let line = self.line_mut(product_id)?;
        if line.quantity > 1 {
            line.quantity -= 1;
        }
        Ok(line.quantity)
    }

    /// Drop a line. Emptying the draft releases the store lock.
    pub fn remove(&mut self, product_id: &str) -> Result<(), SaleError> {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        if self.lines.len() == before {
            return Err(SaleError::UnknownLine {
                product_id: product_id.to_string(),
            });
        }
        if self.lines.is_empty() {
            self.store = None;
        }
        Ok(())
    }

    pub fn set_discount(&mut self, discount: u64) {
        self.discount = discount;
    }

    pub fn discount(&self) -> u64 {
        self.discount
    }

    pub fn subtotal(&self) -> u64 {
        self.lines.iter().map(SaleLine::total).sum()
    }

    /// Subtotal minus discount, never negative.
    pub fn total(&self) -> u64 {
        self.subtotal().saturating_sub(self.discount)
    }

    /// Clear every line, the store lock and customer details.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Turn the draft into a completed sale, record it in the catalog and
    /// reset the draft.
    pub async fn finalize(&mut self, catalog: &dyn ProductCatalog) -> Result<CompletedSale, SaleError> {
        let store = self.store.clone().ok_or(SaleError::Empty)?;
        if self.lines.is_empty() {
            return Err(SaleError::Empty);
        }

        let created_at = Utc::now();
        let sale_number = format!("V-{}", created_at.timestamp_millis());

        let items: Vec<SaleItem> = self
            .lines
            .iter()
            .map(|line| SaleItem {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                total_price: line.total(),
            })
            .collect();

        let mut movements = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            let Some(previous_stock) = catalog.stock_level(&line.product_id).await? else {
                tracing::warn!(product = %line.product_id, "No stock record; skipping movement");
                continue;
            };
            movements.push(StockMovement {
                product_id: line.product_id.clone(),
                movement_type: MovementType::Outbound,
                quantity: -i64::from(line.quantity),
                previous_stock,
                new_stock: previous_stock.saturating_sub(line.quantity),
                reference_id: sale_number.clone(),
                reference_type: "sale".to_string(),
                notes: Some(format!("Sale {sale_number}")),
            });
        }

        let sale = CompletedSale {
            sale_number,
            store_id: store.id,
            customer_name: self.customer_name.clone().filter(|s| !s.trim().is_empty()),
            customer_phone: self.customer_phone.clone().filter(|s| !s.trim().is_empty()),
            payment_method: self.payment_method,
            status: SaleStatus::Completed,
            created_at,
            items,
            subtotal: self.subtotal(),
            discount_amount: self.discount,
            total_amount: self.total(),
            movements,
        };

        catalog.record_sale(&sale).await?;
        tracing::info!(
            sale = %sale.sale_number,
            items = sale.items.len(),
            total = sale.total_amount,
            "Sale recorded"
        );
        self.clear();
        Ok(sale)
    }

    fn line_mut(&mut self, product_id: &str) -> Result<&mut SaleLine, SaleError> {
        self.lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| SaleError::UnknownLine {
                product_id: product_id.to_string(),
            })
    }
}
