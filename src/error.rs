// Ledger Errors
// Caller errors (not found, insufficient stock, validation) vs storage failures

use thiserror::Error;

use crate::model::ProductId;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// No product has this id (never existed or was deleted)
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Order would drive stock below zero
    #[error("Not enough quantity available for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Ledger lock poisoned")]
    LockPoisoned,
}

impl LedgerError {
    /// True for errors the caller can fix by sending a different request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LedgerError::ProductNotFound(_)
                | LedgerError::InsufficientStock { .. }
                | LedgerError::Validation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
