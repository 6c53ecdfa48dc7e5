//! Search a catalog for products.

use std::path::PathBuf;

use tillscan_common::error::TillscanError;
use tillscan_sale::{format_amount, InMemoryCatalog, Product, ProductCatalog};

pub async fn run(catalog: PathBuf, query: String, limit: usize) -> anyhow::Result<()> {
    let catalog = InMemoryCatalog::load(&catalog).map_err(TillscanError::from)?;
    let products = catalog.search(&query, limit).await?;

    if products.is_empty() {
        println!("No products match '{}'", query.trim());
        return Ok(());
    }
    for product in &products {
        println!("{}", describe(product));
    }
    Ok(())
}

fn describe(product: &Product) -> String {
    let code = product
        .barcode
        .as_deref()
        .or(product.sku.as_deref())
        .unwrap_or("-");
    let mut line = format!(
        "{:<10} {:<28} {:<15} {:>9}  stock {}",
        product.id,
        product.name,
        code,
        format_amount(product.unit_price),
        product.stock_quantity
    );
    let status = product.stock_status();
    if status.needs_attention() {
        line.push_str(&format!(" [{status:?}]"));
    }
    line
}
