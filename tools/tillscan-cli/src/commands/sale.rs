//! Scan codes into a sale draft and record the sale.

use std::path::PathBuf;

use serde::Serialize;
use tillscan_capture::ErrorKind;
use tillscan_common::config::AppConfig;
use tillscan_common::error::TillscanError;
use tillscan_sale::{
    apply_scans, format_amount, AppliedScan, InMemoryCatalog, PaymentMethod, SaleDraft,
    SaleScanHost,
};

use super::camera::{self, Camera};
use crate::SourceArgs;

pub struct SaleArgs {
    pub catalog: PathBuf,
    pub source: SourceArgs,
    pub manual: Vec<String>,
    pub discount: u64,
    pub payment: String,
    pub customer: Option<String>,
    pub dry_run: bool,
}

#[derive(Serialize)]
struct Receipt<'a> {
    sale_number: &'a str,
    store: &'a str,
    subtotal: String,
    discount: String,
    total: String,
}

pub async fn run(config: &AppConfig, args: SaleArgs) -> anyhow::Result<()> {
    let payment: PaymentMethod = args.payment.parse().map_err(anyhow::Error::msg)?;
    let catalog = InMemoryCatalog::load(&args.catalog).map_err(TillscanError::from)?;
    let mut draft = SaleDraft::new();

    if let Some(camera) = Camera::from_args(config, &args.source)? {
        let (host, mut events) = SaleScanHost::channel();
        let mut session = camera.session(Box::new(host));
        println!("Scanning with policy {:?}...", camera.options.policy);

        match camera::drive(&mut session, args.source.timeout).await {
            Ok(()) => {}
            Err(e) if camera.finite && e.kind() == ErrorKind::DecodeEngineFault => {}
            Err(e) => println!("Scanner: {}", e.user_message()),
        }
        print_applied(&apply_scans(&mut draft, &catalog, &mut events).await);
    }

    if !args.manual.is_empty() {
        let applied = enter_manually(config, &args.manual, &mut draft, &catalog).await;
        print_applied(&applied);
    }

    if draft.is_empty() {
        anyhow::bail!("No products were added to the sale");
    }

    draft.set_discount(args.discount);
    draft.customer_name = args.customer;
    draft.payment_method = payment;
    print_draft(&draft);

    if args.dry_run {
        println!("\nDry run: sale not recorded.");
        return Ok(());
    }

    let store = draft.store().map(|s| s.name.clone()).unwrap_or_default();
    let sale = draft.finalize(&catalog).await.map_err(TillscanError::from)?;
    catalog.save(&args.catalog).map_err(TillscanError::from)?;

    let receipt = Receipt {
        sale_number: &sale.sale_number,
        store: &store,
        subtotal: format_amount(sale.subtotal),
        discount: format_amount(sale.discount_amount),
        total: format_amount(sale.total_amount),
    };
    println!();
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

/// Push typed codes through a camera-less session so they take the same
/// path as scans.
async fn enter_manually(
    config: &AppConfig,
    values: &[String],
    draft: &mut SaleDraft,
    catalog: &InMemoryCatalog,
) -> Vec<AppliedScan> {
    let camera = Camera::manual_only(config);
    let (host, mut events) = SaleScanHost::channel();
    let mut session = camera.session(Box::new(host));

    if let Err(e) = session.open().await {
        tracing::debug!(error = %e, "No camera for manual entry");
    }
    for value in values {
        match session.manual_entry(value).await {
            Ok(true) => {}
            Ok(false) => println!("  '{value}' was already entered"),
            Err(e) => println!("  '{value}': {}", e.user_message()),
        }
    }
    session.close();

    apply_scans(draft, catalog, &mut events).await
}

fn print_applied(applied: &[AppliedScan]) {
    for scan in applied {
        match &scan.result {
            Ok(added) if added.stock_status.needs_attention() => println!(
                "  + {} (x{}) [{:?}]",
                scan.code.value, added.quantity, added.stock_status
            ),
            Ok(added) => println!("  + {} (x{})", scan.code.value, added.quantity),
            Err(e) => println!("  ! {}: {e}", scan.code.value),
        }
    }
}

fn print_draft(draft: &SaleDraft) {
    println!();
    if let Some(store) = draft.store() {
        println!("Store: {} ({})", store.name, store.id);
    }
    println!("{}", "=".repeat(50));
    for line in draft.lines() {
        println!(
            "  {:<28} {:>3} x {:>8} = {:>9}",
            line.name,
            line.quantity,
            format_amount(line.unit_price),
            format_amount(line.total())
        );
    }
    println!("{}", "-".repeat(50));
    println!("  Subtotal: {:>9}", format_amount(draft.subtotal()));
    println!("  Discount: {:>9}", format_amount(draft.discount()));
    println!("  Total:    {:>9}", format_amount(draft.total()));
    println!("  Payment:  {:?}", draft.payment_method);
}
