//! Product catalog access.
//!
//! The hosted backend is reached only through [`ProductCatalog`], so the sale
//! flow can run against the in-memory implementation in tests and in the CLI.

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tillscan_common::error::{TillscanError, TillscanResult};

use crate::model::{CompletedSale, Product, Store};

/// Data access needed by the sale flow.
#[async_trait::async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Find an active product by barcode, then SKU, then a
    /// case-insensitive name match.
    async fn find_by_identifier(&self, identifier: &str) -> TillscanResult<Option<Product>>;

    /// Active products whose name or description contains `query`.
    async fn search(&self, query: &str, limit: usize) -> TillscanResult<Vec<Product>>;

    async fn store_name(&self, store_id: &str) -> TillscanResult<Option<String>>;

    /// Current stock of a product.
    async fn stock_level(&self, product_id: &str) -> TillscanResult<Option<u32>>;

    /// Persist a sale and apply its stock movements.
    async fn record_sale(&self, sale: &CompletedSale) -> TillscanResult<()>;
}

/// Serialized catalog contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub stores: Vec<Store>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub sales: Vec<CompletedSale>,
}

/// Errors loading or saving a catalog file.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<CatalogError> for TillscanError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::IoError { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                TillscanError::FileNotFound { path }
            }
            other => TillscanError::catalog(other.to_string()),
        }
    }
}

/// Catalog held in memory, optionally loaded from a JSON file.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    data: RwLock<CatalogSnapshot>,
}

impl InMemoryCatalog {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            data: RwLock::new(snapshot),
        }
    }

    /// Load a catalog snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| CatalogError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let snapshot: CatalogSnapshot =
            serde_json::from_str(&json).map_err(|e| CatalogError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
        tracing::debug!(
            path = %path.display(),
            stores = snapshot.stores.len(),
            products = snapshot.products.len(),
            "Loaded catalog"
        );
        Ok(Self::new(snapshot))
    }

    /// Write the current contents back to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&*self.read()).map_err(|e| {
            CatalogError::ParseError {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
        std::fs::write(path, json).map_err(|e| CatalogError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> CatalogSnapshot {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogSnapshot> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogSnapshot> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn matches_text(haystack: Option<&str>, needle_lower: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(needle_lower))
        .unwrap_or(false)
}

#[async_trait::async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn find_by_identifier(&self, identifier: &str) -> TillscanResult<Option<Product>> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(None);
        }
        let data = self.read();
        let active = || data.products.iter().filter(|p| p.is_active);

        let needle = identifier.to_lowercase();
        let found = active()
            .find(|p| p.barcode.as_deref() == Some(identifier))
            .or_else(|| active().find(|p| p.sku.as_deref() == Some(identifier)))
            .or_else(|| active().find(|p| matches_text(Some(&p.name), &needle)));
        Ok(found.cloned())
    }

    async fn search(&self, query: &str, limit: usize) -> TillscanResult<Vec<Product>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .read()
            .products
            .iter()
            .filter(|p| p.is_active)
            .filter(|p| {
                matches_text(Some(&p.name), &needle) || matches_text(p.description.as_deref(), &needle)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn store_name(&self, store_id: &str) -> TillscanResult<Option<String>> {
        Ok(self
            .read()
            .stores
            .iter()
            .find(|s| s.id == store_id)
            .map(|s| s.name.clone()))
    }

    async fn stock_level(&self, product_id: &str) -> TillscanResult<Option<u32>> {
        Ok(self
            .read()
            .products
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| p.stock_quantity))
    }

    async fn record_sale(&self, sale: &CompletedSale) -> TillscanResult<()> {
        let mut data = self.write();
        if data.sales.iter().any(|s| s.sale_number == sale.sale_number) {
            return Err(TillscanError::sale(format!(
                "sale {} already recorded",
                sale.sale_number
            )));
        }
        for movement in &sale.movements {
            if let Some(product) = data.products.iter_mut().find(|p| p.id == movement.product_id) {
                product.stock_quantity = movement.new_stock;
            }
        }
        data.sales.push(sale.clone());
        Ok(())
    }
}
