// Inventory Ledger
// Owns product stock and the append-only order log.
//
// Two interchangeable backing stores:
// - MemoryLedger: in-process, gone on restart
// - SqliteLedger: products/orders tables, one transaction per operation
//
// The request layer only ever sees `dyn Ledger`.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

use crate::error::Result;
use crate::model::{NewOrder, NewProduct, Order, Product, ProductId};

/// Operations every ledger backend provides
///
/// `place_order` is the one read-modify-write on stock: the sufficiency check,
/// the decrement and the order append happen as a single atomic step with
/// respect to any other `place_order` call.
pub trait Ledger: Send + Sync {
    /// Store a new product under a fresh id
    fn add_product(&self, product: NewProduct) -> Result<Product>;

    fn get_product(&self, id: ProductId) -> Result<Product>;

    fn list_products(&self) -> Result<Vec<Product>>;

    /// Full overwrite of name, price and quantity; the id is preserved
    fn update_product(&self, id: ProductId, product: NewProduct) -> Result<Product>;

    /// Remove a product. Orders that reference it are left untouched.
    fn delete_product(&self, id: ProductId) -> Result<()>;

    /// Accept an order, decrementing stock, or reject it without side effects
    fn place_order(&self, order: NewOrder) -> Result<Order>;

    /// Accepted orders in acceptance order
    fn list_orders(&self) -> Result<Vec<Order>>;

    /// Short backend name for logs and health output
    fn kind(&self) -> &'static str;
}

/// Behaviour shared by every backend, run against each one from its own tests
#[cfg(test)]
pub(crate) mod conformance {
    use std::sync::Arc;
    use std::thread;

    use super::Ledger;
    use crate::error::LedgerError;
    use crate::model::{NewOrder, NewProduct};

    pub fn add_then_get(ledger: &dyn Ledger) {
        let added = ledger
            .add_product(NewProduct::new("Apple", 150.0, 20))
            .unwrap();
        let fetched = ledger.get_product(added.id).unwrap();

        assert_eq!(added, fetched);
        assert_eq!(fetched.name, "Apple");
        assert_eq!(fetched.quantity, 20);
    }

    pub fn ids_start_at_one_and_increase(ledger: &dyn Ledger) {
        let first = ledger.add_product(NewProduct::new("A", 1.0, 1)).unwrap();
        let second = ledger.add_product(NewProduct::new("A", 1.0, 1)).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2, "names are not required to be unique");
    }

    pub fn ids_not_reused_after_delete(ledger: &dyn Ledger) {
        ledger.add_product(NewProduct::new("A", 1.0, 1)).unwrap();
        let last = ledger.add_product(NewProduct::new("B", 1.0, 1)).unwrap();
        ledger.delete_product(last.id).unwrap();

        let next = ledger.add_product(NewProduct::new("C", 1.0, 1)).unwrap();
        assert!(next.id > last.id);
    }

    pub fn delete_then_get_fails(ledger: &dyn Ledger) {
        let product = ledger.add_product(NewProduct::new("Pear", 80.0, 3)).unwrap();
        ledger.delete_product(product.id).unwrap();

        assert!(matches!(
            ledger.get_product(product.id),
            Err(LedgerError::ProductNotFound(id)) if id == product.id
        ));
        assert!(matches!(
            ledger.delete_product(product.id),
            Err(LedgerError::ProductNotFound(_))
        ));
    }

    pub fn update_replaces_all_fields(ledger: &dyn Ledger) {
        let product = ledger.add_product(NewProduct::new("Pear", 80.0, 3)).unwrap();
        let updated = ledger
            .update_product(product.id, NewProduct::new("Nashi Pear", 95.5, 12))
            .unwrap();

        assert_eq!(updated.id, product.id);
        assert_eq!(updated.name, "Nashi Pear");
        assert_eq!(updated.price, 95.5);
        assert_eq!(updated.quantity, 12);
        assert_eq!(ledger.get_product(product.id).unwrap(), updated);
    }

    pub fn update_missing_does_not_create(ledger: &dyn Ledger) {
        let before = ledger.list_products().unwrap();

        let result = ledger.update_product(4242, NewProduct::new("Ghost", 1.0, 1));

        assert!(matches!(result, Err(LedgerError::ProductNotFound(4242))));
        assert_eq!(ledger.list_products().unwrap(), before);
    }

    pub fn apple_order_scenario(ledger: &dyn Ledger) {
        let apple = ledger
            .add_product(NewProduct::new("Apple", 150.0, 20))
            .unwrap();

        let order = ledger.place_order(NewOrder::new(apple.id, 5)).unwrap();
        assert_eq!(order.product_id, apple.id);
        assert_eq!(order.quantity, 5);
        assert_eq!(ledger.get_product(apple.id).unwrap().quantity, 15);

        let rejected = ledger.place_order(NewOrder::new(apple.id, 20));
        assert!(matches!(
            rejected,
            Err(LedgerError::InsufficientStock {
                requested: 20,
                available: 15,
                ..
            })
        ));
        assert_eq!(ledger.get_product(apple.id).unwrap().quantity, 15);
        assert_eq!(ledger.list_orders().unwrap(), vec![order]);
    }

    pub fn order_for_unknown_product(ledger: &dyn Ledger) {
        let result = ledger.place_order(NewOrder::new(999, 1));

        assert!(matches!(result, Err(LedgerError::ProductNotFound(999))));
        assert!(ledger.list_orders().unwrap().is_empty());
    }

    pub fn order_for_deleted_product(ledger: &dyn Ledger) {
        let product = ledger.add_product(NewProduct::new("Pear", 80.0, 3)).unwrap();
        let accepted = ledger.place_order(NewOrder::new(product.id, 1)).unwrap();
        ledger.delete_product(product.id).unwrap();

        let result = ledger.place_order(NewOrder::new(product.id, 1));

        assert!(matches!(
            result,
            Err(LedgerError::ProductNotFound(id)) if id == product.id
        ));
        assert_eq!(ledger.list_orders().unwrap(), vec![accepted]);
        assert!(ledger.list_products().unwrap().is_empty());
        assert!(matches!(
            ledger.get_product(product.id),
            Err(LedgerError::ProductNotFound(_))
        ));
    }

    pub fn order_can_drain_stock_exactly(ledger: &dyn Ledger) {
        let product = ledger.add_product(NewProduct::new("Kiwi", 30.0, 4)).unwrap();

        ledger.place_order(NewOrder::new(product.id, 4)).unwrap();
        assert_eq!(ledger.get_product(product.id).unwrap().quantity, 0);

        assert!(matches!(
            ledger.place_order(NewOrder::new(product.id, 1)),
            Err(LedgerError::InsufficientStock { available: 0, .. })
        ));
    }

    pub fn orders_survive_product_delete(ledger: &dyn Ledger) {
        let product = ledger.add_product(NewProduct::new("Plum", 40.0, 10)).unwrap();
        let first = ledger.place_order(NewOrder::new(product.id, 2)).unwrap();
        let second = ledger.place_order(NewOrder::new(product.id, 3)).unwrap();
        assert!(second.id > first.id);

        ledger.delete_product(product.id).unwrap();

        let orders = ledger.list_orders().unwrap();
        assert_eq!(orders, vec![first, second]);
    }

    pub fn listing_is_stable(ledger: &dyn Ledger) {
        ledger.add_product(NewProduct::new("A", 1.0, 1)).unwrap();
        ledger.add_product(NewProduct::new("B", 2.0, 2)).unwrap();

        let first = ledger.list_products().unwrap();
        let second = ledger.list_products().unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(ledger.list_orders().unwrap(), ledger.list_orders().unwrap());
    }

    pub fn rejects_invalid_input(ledger: &dyn Ledger) {
        assert!(matches!(
            ledger.add_product(NewProduct::new("", 1.0, 1)),
            Err(LedgerError::Validation(_))
        ));

        let product = ledger.add_product(NewProduct::new("Fig", 10.0, 5)).unwrap();
        assert!(matches!(
            ledger.place_order(NewOrder::new(product.id, 0)),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ledger.update_product(product.id, NewProduct::new("Fig", 10.0, -1)),
            Err(LedgerError::Validation(_))
        ));
        assert_eq!(ledger.get_product(product.id).unwrap().quantity, 5);
        assert_eq!(ledger.list_products().unwrap().len(), 1);
    }

    /// N threads each order 1 unit of a product holding K < N units
    pub fn concurrent_orders_never_overdraw(ledger: Arc<dyn Ledger>) {
        const STOCK: i64 = 25;
        const WORKERS: usize = 64;

        let product_id = ledger
            .add_product(NewProduct::new("Limited", 10.0, STOCK))
            .unwrap()
            .id;

        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.place_order(NewOrder::new(product_id, 1)))
            })
            .collect();

        let mut accepted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => accepted += 1,
                Err(LedgerError::InsufficientStock { .. }) => rejected += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(accepted, STOCK as usize);
        assert_eq!(rejected, WORKERS - STOCK as usize);
        assert_eq!(ledger.get_product(product_id).unwrap().quantity, 0);
        assert_eq!(ledger.list_orders().unwrap().len(), STOCK as usize);
    }

    /// Run every single-threaded check, each on a fresh ledger
    pub fn run_all<F>(mut fresh: F)
    where
        F: FnMut() -> Box<dyn Ledger>,
    {
        add_then_get(fresh().as_ref());
        ids_start_at_one_and_increase(fresh().as_ref());
        ids_not_reused_after_delete(fresh().as_ref());
        delete_then_get_fails(fresh().as_ref());
        update_replaces_all_fields(fresh().as_ref());
        update_missing_does_not_create(fresh().as_ref());
        apple_order_scenario(fresh().as_ref());
        order_for_unknown_product(fresh().as_ref());
        order_for_deleted_product(fresh().as_ref());
        order_can_drain_stock_exactly(fresh().as_ref());
        orders_survive_product_delete(fresh().as_ref());
        listing_is_stable(fresh().as_ref());
        rejects_invalid_input(fresh().as_ref());
    }
}
