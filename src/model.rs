// Catalog & Order Records
// Plain data, no storage coupling - both ledgers map to and from these

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Product identifier (assigned by the store, never reused)
pub type ProductId = i64;

/// Order identifier (assigned on acceptance)
pub type OrderId = i64;

// ============================================================================
// PRODUCT
// ============================================================================

/// A catalog entry with its current stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
}

/// Caller-supplied product fields, used for both create and full replace
///
/// An `id` in the incoming JSON is accepted and ignored: the store owns ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub quantity: i64,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: f64, quantity: i64) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
        }
    }

    /// Reject records that would break the catalog invariants
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::Validation("name must not be empty".to_string()));
        }

        if !self.price.is_finite() || self.price < 0.0 {
            return Err(LedgerError::Validation(format!(
                "price must be a non-negative number, got {}",
                self.price
            )));
        }

        if self.quantity < 0 {
            return Err(LedgerError::Validation(format!(
                "quantity must not be negative, got {}",
                self.quantity
            )));
        }

        Ok(())
    }

    /// Attach a store-assigned id
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price,
            quantity: self.quantity,
        }
    }
}

// ============================================================================
// ORDER
// ============================================================================

/// An accepted order (immutable once recorded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Order request as it arrives from the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl NewOrder {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.quantity <= 0 {
            return Err(LedgerError::Validation(format!(
                "order quantity must be positive, got {}",
                self.quantity
            )));
        }
        Ok(())
    }
}
