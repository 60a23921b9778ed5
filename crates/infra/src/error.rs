//! Service-level errors.
//!
//! Domain rejections, store conflicts and storage failures all surface to
//! callers as one [`ServiceError`], so an outer layer can map each variant to a
//! user-facing message without knowing which collaborator raised it.

use thiserror::Error;

use tally_core::{DomainError, RecordKind};

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input failed a domain rule (empty number, zero quantity, bad amount).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced client, product or invoice does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    /// A line asks for more units than the product has available.
    #[error("insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: u64,
        requested: u64,
    },

    /// A ledger invariant would be broken (e.g. refused overpayment).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Optimistic concurrency kept failing after every retry.
    #[error("concurrent modification: {0}")]
    Conflict(String),

    /// The renderer refused the document.
    #[error("rendering failed: {0}")]
    Render(String),

    /// The store failed; nothing was written.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl ServiceError {
    /// Only conflicts are worth another attempt: the operation re-reads and re-plans.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Conflict(_))
    }

    pub(crate) fn not_found(kind: RecordKind, id: impl core::fmt::Display) -> Self {
        ServiceError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                ServiceError::Validation(msg)
            }
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
            DomainError::NotFound { kind, id } => ServiceError::NotFound { kind, id },
            DomainError::InsufficientStock {
                product,
                available,
                requested,
            } => ServiceError::InsufficientStock {
                product,
                available,
                requested,
            },
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::Domain(err) => err.into(),
            StoreError::Storage(msg) => ServiceError::Storage(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_keep_their_meaning() {
        let err: ServiceError = DomainError::insufficient_stock("Cement", 2, 5).into();
        assert!(matches!(
            err,
            ServiceError::InsufficientStock {
                available: 2,
                requested: 5,
                ..
            }
        ));

        let err: ServiceError = DomainError::invalid_id("nope").into();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(ServiceError::from(StoreError::Conflict("stale".into())).is_retryable());
        assert!(!ServiceError::from(StoreError::Storage("disk".into())).is_retryable());
        assert!(!ServiceError::from(DomainError::validation("bad")).is_retryable());
    }

    #[test]
    fn store_domain_errors_unwrap() {
        let err: ServiceError =
            StoreError::from(DomainError::not_found(RecordKind::Product, "p-1")).into();
        assert_eq!(err.to_string(), "product not found: p-1");
    }
}
