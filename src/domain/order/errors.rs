use super::value_objects::AccountId;
use crate::collaborators::LookupError;
use crate::store::StorageError;

// ============================================================================
// Order Composition Errors
// ============================================================================

/// Errors surfaced to callers of the composer and the aggregator.
///
/// Unmatched catalog products are not an error: they are dropped from the
/// order without being reported.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Invalid order request: {0}")]
    InvalidInput(String),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Account directory unavailable: {0}")]
    AccountUnavailable(#[source] LookupError),

    #[error("Product catalog unavailable: {0}")]
    CatalogUnavailable(#[source] LookupError),

    #[error("Order storage failure: {0}")]
    StorageFailure(#[from] StorageError),
}

impl OrderError {
    /// Stable label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::InvalidInput(_) => "invalid_input",
            OrderError::AccountNotFound(_) => "account_not_found",
            OrderError::AccountUnavailable(_) => "account_unavailable",
            OrderError::CatalogUnavailable(_) => "catalog_unavailable",
            OrderError::StorageFailure(_) => "storage_failure",
        }
    }
}
