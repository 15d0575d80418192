// In-memory Ledger
// Non-persistent variant: products & orders live in the process only.
//
// One RwLock guards the whole ledger. Reads share it, every mutation
// (including the check-then-decrement of place_order) holds it exclusively,
// so no two orders can both pass the stock check against the same quantity.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use super::Ledger;
use crate::error::{LedgerError, Result};
use crate::model::{NewOrder, NewProduct, Order, OrderId, Product, ProductId};

#[derive(Debug, Default)]
struct LedgerState {
    /// Insertion order is the listing order
    products: Vec<Product>,

    /// Append-only
    orders: Vec<Order>,

    /// Highest id ever handed out (ids are never reused)
    last_product_id: ProductId,
    last_order_id: OrderId,
}

impl LedgerState {
    fn position(&self, id: ProductId) -> Result<usize> {
        self.products
            .iter()
            .position(|p| p.id == id)
            .ok_or(LedgerError::ProductNotFound(id))
    }

    fn next_product_id(&mut self) -> ProductId {
        self.last_product_id += 1;
        self.last_product_id
    }

    fn next_order_id(&mut self) -> OrderId {
        self.last_order_id += 1;
        self.last_order_id
    }
}

pub struct MemoryLedger {
    state: RwLock<LedgerState>,
}

impl MemoryLedger {
    /// Create new empty ledger
    pub fn new() -> Self {
        MemoryLedger {
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// Create ledger with the demo catalog pre-loaded
    pub fn with_defaults() -> Self {
        let ledger = MemoryLedger::new();
        ledger.register_default_products();
        ledger
    }

    fn register_default_products(&self) {
        let defaults = [
            NewProduct::new("Apple", 150.0, 20),
            NewProduct::new("Banana", 50.0, 100),
        ];

        for product in defaults {
            // Demo records are known-valid
            if let Err(e) = self.add_product(product) {
                warn!(error = %e, "failed to seed demo product");
            }
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>> {
        self.state.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>> {
        self.state.write().map_err(|_| LedgerError::LockPoisoned)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger for MemoryLedger {
    fn add_product(&self, product: NewProduct) -> Result<Product> {
        product.validate()?;

        let mut state = self.write()?;
        let id = state.next_product_id();
        let product = product.into_product(id);
        state.products.push(product.clone());

        info!(product_id = id, name = %product.name, quantity = product.quantity, "product added");
        Ok(product)
    }

    fn get_product(&self, id: ProductId) -> Result<Product> {
        let state = self.read()?;
        let idx = state.position(id)?;
        Ok(state.products[idx].clone())
    }

    fn list_products(&self) -> Result<Vec<Product>> {
        let state = self.read()?;
        debug!(count = state.products.len(), "listing products");
        Ok(state.products.clone())
    }

    fn update_product(&self, id: ProductId, product: NewProduct) -> Result<Product> {
        product.validate()?;

        let mut state = self.write()?;
        let idx = state.position(id)?;
        let updated = product.into_product(id);
        state.products[idx] = updated.clone();

        info!(product_id = id, quantity = updated.quantity, "product replaced");
        Ok(updated)
    }

    fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut state = self.write()?;
        let idx = state.position(id)?;
        state.products.remove(idx);

        info!(product_id = id, "product deleted");
        Ok(())
    }

    fn place_order(&self, order: NewOrder) -> Result<Order> {
        order.validate()?;

        let mut state = self.write()?;
        let idx = state.position(order.product_id)?;

        let available = state.products[idx].quantity;
        if available < order.quantity {
            warn!(
                product_id = order.product_id,
                requested = order.quantity,
                available,
                "order rejected: insufficient stock"
            );
            return Err(LedgerError::InsufficientStock {
                product_id: order.product_id,
                requested: order.quantity,
                available,
            });
        }

        state.products[idx].quantity -= order.quantity;
        let accepted = Order {
            id: state.next_order_id(),
            product_id: order.product_id,
            quantity: order.quantity,
        };
        state.orders.push(accepted.clone());

        info!(
            order_id = accepted.id,
            product_id = accepted.product_id,
            quantity = accepted.quantity,
            remaining = state.products[idx].quantity,
            "order accepted"
        );
        Ok(accepted)
    }

    fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.read()?.orders.clone())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
