//! Stock reconciler.
//!
//! Computes, for an invoice create/update/delete, the per-product stock
//! adjustments needed so that `stock consumed by invoices + current stock` is
//! conserved. Planning is pure: every requested quantity is validated against
//! the catalog snapshot before a plan exists, and the plan is applied later in a
//! single commit. A rejected operation therefore never leaves a partial write.
//!
//! Each adjustment records the product version it was planned against so the
//! commit can refuse to apply it over a concurrent change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tally_core::{AggregateRoot, DomainError, ProductId, RecordKind};
use tally_products::Product;

use crate::invoice::InvoiceItem;

/// Catalog snapshot the planner reads from.
pub type ProductIndex = BTreeMap<ProductId, Product>;

/// Build a [`ProductIndex`] from a product listing.
pub fn index_products(products: impl IntoIterator<Item = Product>) -> ProductIndex {
    products.into_iter().map(|p| (p.id_typed(), p)).collect()
}

/// One product's stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub product_id: ProductId,
    /// Product version the plan was computed against.
    pub expected_version: u64,
    pub before: u32,
    pub after: u32,
}

impl StockAdjustment {
    /// Signed change (`after − before`).
    pub fn delta(&self) -> i64 {
        i64::from(self.after) - i64::from(self.before)
    }
}

/// Ordered set of stock adjustments, one per product whose stock changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPlan {
    adjustments: Vec<StockAdjustment>,
}

impl StockPlan {
    pub fn adjustments(&self) -> &[StockAdjustment] {
        &self.adjustments
    }

    pub fn into_adjustments(self) -> Vec<StockAdjustment> {
        self.adjustments
    }

    pub fn is_empty(&self) -> bool {
        self.adjustments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.adjustments.len()
    }

    pub fn for_product(&self, product_id: ProductId) -> Option<&StockAdjustment> {
        self.adjustments.iter().find(|a| a.product_id == product_id)
    }
}

/// Plan the stock taken by a new invoice.
///
/// Quantities of repeated lines for the same product are summed before the
/// check. Fails with `NotFound` for an unknown product and with
/// `InsufficientStock` if any product cannot cover its total.
pub fn plan_create<I>(catalog: &ProductIndex, requested: I) -> Result<StockPlan, DomainError>
where
    I: IntoIterator<Item = (ProductId, u32)>,
{
    plan(catalog, core::iter::empty(), requested)
}

/// Plan the net stock change of replacing `original` lines with `requested`.
///
/// The original quantities are virtually returned first:
/// `available[p] = stock[p] + Σ original[p]`. Lines of products that no longer
/// exist contribute nothing. Products whose stock ends up unchanged are left
/// out of the plan.
pub fn plan_update<I>(
    catalog: &ProductIndex,
    original: &[InvoiceItem],
    requested: I,
) -> Result<StockPlan, DomainError>
where
    I: IntoIterator<Item = (ProductId, u32)>,
{
    plan(
        catalog,
        original.iter().map(|i| (i.product_id, i.quantity)),
        requested,
    )
}

/// Plan returning every line of a deleted invoice to stock.
///
/// Products that no longer exist are skipped.
pub fn plan_delete(catalog: &ProductIndex, items: &[InvoiceItem]) -> Result<StockPlan, DomainError> {
    plan(
        catalog,
        items.iter().map(|i| (i.product_id, i.quantity)),
        core::iter::empty(),
    )
}

/// Products referenced by `items` that are missing from `catalog`.
pub fn missing_products(catalog: &ProductIndex, items: &[InvoiceItem]) -> Vec<ProductId> {
    let mut missing: Vec<ProductId> = items
        .iter()
        .map(|i| i.product_id)
        .filter(|id| !catalog.contains_key(id))
        .collect();
    missing.sort();
    missing.dedup();
    missing
}

fn plan<R, Q>(catalog: &ProductIndex, returned: R, requested: Q) -> Result<StockPlan, DomainError>
where
    R: IntoIterator<Item = (ProductId, u32)>,
    Q: IntoIterator<Item = (ProductId, u32)>,
{
    let mut available: BTreeMap<ProductId, u64> = BTreeMap::new();

    for (product_id, quantity) in returned {
        let Some(product) = catalog.get(&product_id) else {
            continue;
        };
        let slot = available
            .entry(product_id)
            .or_insert_with(|| u64::from(product.quantity_in_stock()));
        *slot = slot
            .checked_add(u64::from(quantity))
            .ok_or_else(|| DomainError::invariant("stock overflow"))?;
    }

    // Sum repeated lines, keeping first-seen order for deterministic errors.
    let mut wanted: Vec<(ProductId, u64)> = Vec::new();
    for (product_id, quantity) in requested {
        match wanted.iter_mut().find(|(id, _)| *id == product_id) {
            Some((_, total)) => *total += u64::from(quantity),
            None => wanted.push((product_id, u64::from(quantity))),
        }
    }

    // Validate everything before producing a plan.
    for (product_id, quantity) in wanted {
        let product = catalog
            .get(&product_id)
            .ok_or_else(|| DomainError::not_found(RecordKind::Product, product_id))?;
        let slot = available
            .entry(product_id)
            .or_insert_with(|| u64::from(product.quantity_in_stock()));
        if *slot < quantity {
            return Err(DomainError::insufficient_stock(product.name(), *slot, quantity));
        }
        *slot -= quantity;
    }

    let mut adjustments = Vec::new();
    for (product_id, after) in available {
        let Some(product) = catalog.get(&product_id) else {
            continue;
        };
        let before = product.quantity_in_stock();
        if u64::from(before) == after {
            continue;
        }
        let after = u32::try_from(after).map_err(|_| {
            DomainError::invariant(format!("stock overflow for product {}", product.name()))
        })?;
        adjustments.push(StockAdjustment {
            product_id,
            expected_version: product.version(),
            before,
            after,
        });
    }

    Ok(StockPlan { adjustments })
}
