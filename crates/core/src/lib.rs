//! `tally-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, versioning for optimistic concurrency,
//! and the money/percentage value objects used by the ledger.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult, RecordKind};
pub use id::{ClientId, InvoiceId, PaymentId, ProductId};
pub use money::{Money, Percent};
