//! Tillscan Sale
//!
//! Product catalog access and the sale draft a capture session feeds.
//! Scanned codes resolve to products by barcode, SKU or name; the draft
//! keeps one line per product, locks to a single store and turns into a
//! completed sale with outbound stock movements.

pub mod catalog;
pub mod draft;
pub mod host;
pub mod model;

pub use catalog::{CatalogError, CatalogSnapshot, InMemoryCatalog, ProductCatalog};
pub use draft::{DraftStore, LineAdded, SaleDraft, SaleError, SaleLine};
pub use host::{apply_scans, AppliedScan, SaleScanHost, ScanEvent};
pub use model::*;
