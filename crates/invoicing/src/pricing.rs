//! Ledger calculator: priced lines and invoice totals.
//!
//! ```text
//! total           = quantity × unit_price            (per line)
//! sub_total       = Σ total
//! discount_amount = sub_total × discount / 100
//! vat_amount      = (sub_total − discount_amount) × vat / 100
//! total_amount    = sub_total − discount_amount + vat_amount
//! ```
//!
//! Pure and deterministic: the same lines and rates always produce the same
//! decimal values, so totals re-derived from a stored invoice match exactly.

use serde::{Deserialize, Serialize};

use tally_core::{DomainError, Money, Percent, ProductId};

use crate::invoice::InvoiceItem;

/// A requested line, already resolved to a unit price and product snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub reference: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// The four derived invoice amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTotals {
    pub sub_total: Money,
    pub discount_amount: Money,
    pub vat_amount: Money,
    pub total_amount: Money,
}

impl LedgerTotals {
    pub fn compute(items: &[InvoiceItem], discount: Percent, vat: Percent) -> Result<Self, DomainError> {
        let sub_total = Money::checked_sum(items.iter().map(|i| i.total))?;
        let discount_amount = sub_total.checked_percent(discount)?;
        let after_discount = sub_total.checked_sub(discount_amount)?;
        let vat_amount = after_discount.checked_percent(vat)?;
        let total_amount = after_discount.checked_add(vat_amount)?;

        Ok(Self {
            sub_total,
            discount_amount,
            vat_amount,
            total_amount,
        })
    }
}

/// Turn requested lines into invoice items (`total = quantity × unit_price`).
pub fn price_lines(lines: &[PricedLine]) -> Result<Vec<InvoiceItem>, DomainError> {
    lines
        .iter()
        .map(|line| {
            if line.quantity == 0 {
                return Err(DomainError::validation(format!(
                    "quantity for {} must be positive",
                    line.product_name
                )));
            }
            if line.unit_price.is_negative() {
                return Err(DomainError::validation(format!(
                    "unit price for {} cannot be negative",
                    line.product_name
                )));
            }
            Ok(InvoiceItem {
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                reference: line.reference.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                total: line.unit_price.checked_times(line.quantity)?,
            })
        })
        .collect()
}

/// Price lines and compute totals in one step.
pub fn price(
    lines: &[PricedLine],
    discount: Percent,
    vat: Percent,
) -> Result<(Vec<InvoiceItem>, LedgerTotals), DomainError> {
    let items = price_lines(lines)?;
    let totals = LedgerTotals::compute(&items, discount, vat)?;
    Ok((items, totals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(quantity: u32, unit_price: Money) -> PricedLine {
        PricedLine {
            product_id: ProductId::new(),
            product_name: "Rebar 12mm".to_string(),
            reference: "RB-12".to_string(),
            quantity,
            unit_price,
        }
    }

    fn pct(v: u32) -> Percent {
        Percent::whole(v).unwrap()
    }

    #[test]
    fn zero_items_yield_zero_totals() {
        let (items, totals) = price(&[], pct(10), pct(18)).unwrap();
        assert!(items.is_empty());
        assert_eq!(totals, LedgerTotals::default());
    }

    #[test]
    fn zero_rates_are_no_ops() {
        let (_, totals) = price(&[line(2, Money::whole(250))], Percent::ZERO, Percent::ZERO).unwrap();
        assert_eq!(totals.sub_total, Money::whole(500));
        assert_eq!(totals.discount_amount, Money::ZERO);
        assert_eq!(totals.vat_amount, Money::ZERO);
        assert_eq!(totals.total_amount, Money::whole(500));
    }

    #[test]
    fn vat_applies_after_discount() {
        let (_, totals) = price(&[line(1, Money::whole(1000))], pct(20), pct(18)).unwrap();
        assert_eq!(totals.discount_amount, Money::whole(200));
        assert_eq!(totals.vat_amount, Money::whole(144));
        assert_eq!(totals.total_amount, Money::whole(944));
    }

    #[test]
    fn fractional_amounts_stay_exact() {
        let price_each: Money = "0.10".parse().unwrap();
        let (_, totals) = price(&[line(3, price_each)], Percent::ZERO, Percent::ZERO).unwrap();
        assert_eq!(totals.total_amount, "0.30".parse::<Money>().unwrap());
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = price_lines(&[line(0, Money::whole(10))]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn negative_price_is_rejected() {
        let err = price_lines(&[line(1, Money::whole(-10))]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn money_strategy() -> impl Strategy<Value = Money> {
            // up to 1_000_000.00 with two decimals
            (0i64..100_000_000).prop_map(|cents| Money::new(Decimal::new(cents, 2)))
        }

        fn percent_strategy() -> impl Strategy<Value = Percent> {
            // 0.00 ..= 100.00
            (0i64..=10_000).prop_map(|hundredths| Percent::new(Decimal::new(hundredths, 2)).unwrap())
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: sub_total is the sum of line totals and total_amount
            /// closes the ledger exactly.
            #[test]
            fn totals_close_exactly(
                lines in proptest::collection::vec((1u32..1_000, money_strategy()), 0..20),
                discount in percent_strategy(),
                vat in percent_strategy(),
            ) {
                let lines: Vec<PricedLine> = lines.into_iter().map(|(q, p)| line(q, p)).collect();
                let (items, totals) = price(&lines, discount, vat).unwrap();

                let sum = items.iter().fold(Decimal::ZERO, |acc, i| acc + i.total.amount());
                prop_assert_eq!(totals.sub_total.amount(), sum);
                prop_assert_eq!(
                    totals.total_amount.amount(),
                    totals.sub_total.amount() - totals.discount_amount.amount() + totals.vat_amount.amount()
                );
                prop_assert!(totals.discount_amount <= totals.sub_total);
            }

            /// Property: recomputing from the produced items is idempotent.
            #[test]
            fn recompute_is_idempotent(
                lines in proptest::collection::vec((1u32..1_000, money_strategy()), 0..20),
                discount in percent_strategy(),
                vat in percent_strategy(),
            ) {
                let lines: Vec<PricedLine> = lines.into_iter().map(|(q, p)| line(q, p)).collect();
                let (items, totals) = price(&lines, discount, vat).unwrap();
                let again = LedgerTotals::compute(&items, discount, vat).unwrap();
                prop_assert_eq!(totals, again);
            }
        }
    }
}
