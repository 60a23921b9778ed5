use serde::{Deserialize, Serialize};

use tally_core::{AggregateRoot, DomainError, Money, ProductId};

/// Aggregate root: Product.
///
/// `unit_price` is the authoritative price when an invoice is created.
/// `quantity_in_stock` is an unsigned counter; invoicing changes it only through
/// a reconciled stock plan, and every write bumps `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: ProductId,
    name: String,
    reference: String,
    unit_price: Money,
    quantity_in_stock: u32,
    version: u64,
}

/// Partial update of a product (catalog maintenance).
///
/// `None` keeps the existing value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub reference: Option<String>,
    pub unit_price: Option<Money>,
    pub quantity_in_stock: Option<u32>,
}

impl Product {
    /// Create a product at version 1.
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        reference: impl Into<String>,
        unit_price: Money,
        quantity_in_stock: u32,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if unit_price.is_negative() {
            return Err(DomainError::validation("unit price cannot be negative"));
        }
        Ok(Self {
            id,
            name,
            reference: reference.into(),
            unit_price,
            quantity_in_stock,
            version: 1,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity_in_stock(&self) -> u32 {
        self.quantity_in_stock
    }

    /// Overwrite the stock counter (reconciled commit).
    pub fn set_stock(&mut self, quantity: u32) {
        self.quantity_in_stock = quantity;
        self.version += 1;
    }

    /// Apply a partial update. Validation happens before any field changes.
    pub fn apply_patch(&mut self, patch: &ProductPatch) -> Result<(), DomainError> {
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("product name cannot be empty"));
            }
        }
        if let Some(price) = patch.unit_price {
            if price.is_negative() {
                return Err(DomainError::validation("unit price cannot be negative"));
            }
        }

        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(reference) = &patch.reference {
            self.reference = reference.clone();
        }
        if let Some(price) = patch.unit_price {
            self.unit_price = price;
        }
        if let Some(quantity) = patch.quantity_in_stock {
            self.quantity_in_stock = quantity;
        }
        self.version += 1;
        Ok(())
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product() -> Product {
        Product::new(ProductId::new(), "Cement 50kg", "CEM-50", Money::whole(1000), 5).unwrap()
    }

    #[test]
    fn new_product_starts_at_version_one() {
        let product = test_product();
        assert_eq!(product.version(), 1);
        assert_eq!(product.quantity_in_stock(), 5);
    }

    #[test]
    fn new_product_rejects_empty_name() {
        let err = Product::new(ProductId::new(), "  ", "X", Money::whole(1), 0).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty name"),
        }
    }

    #[test]
    fn new_product_rejects_negative_price() {
        let err = Product::new(ProductId::new(), "Nails", "N", Money::whole(-1), 0).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn set_stock_bumps_version() {
        let mut product = test_product();
        product.set_stock(2);
        assert_eq!(product.quantity_in_stock(), 2);
        assert_eq!(product.version(), 2);
    }

    #[test]
    fn invalid_patch_changes_nothing() {
        let mut product = test_product();
        let before = product.clone();
        let patch = ProductPatch {
            name: Some("Renamed".to_string()),
            unit_price: Some(Money::whole(-5)),
            ..ProductPatch::default()
        };
        assert!(product.apply_patch(&patch).is_err());
        assert_eq!(product, before);
    }

    #[test]
    fn patch_keeps_unspecified_fields() {
        let mut product = test_product();
        let patch = ProductPatch {
            name: Some("Cement 25kg".to_string()),
            ..ProductPatch::default()
        };
        product.apply_patch(&patch).unwrap();
        assert_eq!(product.name(), "Cement 25kg");
        assert_eq!(product.reference(), "CEM-50");
        assert_eq!(product.unit_price(), Money::whole(1000));
        assert_eq!(product.version(), 2);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: every accepted write increases the version by exactly one.
            #[test]
            fn version_increments_monotonically(
                stocks in proptest::collection::vec(0u32..10_000, 1..20)
            ) {
                let mut product = test_product();
                let mut previous = product.version();
                for stock in stocks {
                    product.set_stock(stock);
                    prop_assert_eq!(product.version(), previous + 1);
                    prop_assert_eq!(product.quantity_in_stock(), stock);
                    previous = product.version();
                }
            }
        }
    }
}
