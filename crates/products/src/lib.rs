//! Products domain module: the priced, stocked catalog invoices draw from.
//!
//! This crate contains the product record and its stock-counter rules,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod product;

pub use product::{Product, ProductPatch};
