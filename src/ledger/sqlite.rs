// SQLite Ledger
// Persisted variant: `products` and `orders` tables, survives restart.
//
// Every operation is one transaction: committed on success, rolled back when
// the `rusqlite::Transaction` is dropped on any error path. Writes begin
// IMMEDIATE so the stock check and decrement hold SQLite's write lock
// together, even against other processes sharing the file.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use super::Ledger;
use crate::error::{LedgerError, Result};
use crate::model::{NewOrder, NewProduct, Order, Product, ProductId};

/// How long a writer waits on another connection's lock before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open (or create) a database file and make sure the schema exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // Enable WAL mode for crash recovery
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.as_ref().display(), journal_mode = %mode, "database opened");

        Self::from_connection(conn)
    }

    /// Private, throwaway database (tests, demos)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteLedger {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| LedgerError::LockPoisoned)
    }

    /// Run `f` in a transaction, commit if it returns Ok
    fn with_transaction<T, F>(&self, behavior: TransactionBehavior, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(behavior)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        self.with_transaction(TransactionBehavior::Deferred, f)
    }

    fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        self.with_transaction(TransactionBehavior::Immediate, f)
    }
}

/// Create tables if absent (runs on every open)
pub fn setup_database(conn: &Connection) -> Result<()> {
    // AUTOINCREMENT: ids of deleted rows are never handed out again
    conn.execute(
        "CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            price REAL NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity >= 0)
        )",
        [],
    )?;

    // No foreign key: orders outlive the products they reference
    conn.execute(
        "CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity > 0)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_orders_product ON orders(product_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// Row mapping (products / orders tables <-> model records)
// ============================================================================

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
        quantity: row.get(3)?,
    })
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        product_id: row.get(1)?,
        quantity: row.get(2)?,
    })
}

fn find_product(tx: &Transaction<'_>, id: ProductId) -> Result<Product> {
    tx.query_row(
        "SELECT id, name, price, quantity FROM products WHERE id = ?1",
        [id],
        product_from_row,
    )
    .optional()?
    .ok_or(LedgerError::ProductNotFound(id))
}

impl Ledger for SqliteLedger {
    fn add_product(&self, product: NewProduct) -> Result<Product> {
        product.validate()?;

        let product = self.write(|tx| {
            tx.execute(
                "INSERT INTO products (name, price, quantity) VALUES (?1, ?2, ?3)",
                params![product.name, product.price, product.quantity],
            )?;
            Ok(product.into_product(tx.last_insert_rowid()))
        })?;

        info!(product_id = product.id, name = %product.name, quantity = product.quantity, "product added");
        Ok(product)
    }

    fn get_product(&self, id: ProductId) -> Result<Product> {
        self.read(|tx| find_product(tx, id))
    }

    fn list_products(&self) -> Result<Vec<Product>> {
        self.read(|tx| {
            let mut stmt =
                tx.prepare("SELECT id, name, price, quantity FROM products ORDER BY id")?;
            let products = stmt
                .query_map([], product_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            debug!(count = products.len(), "listing products");
            Ok(products)
        })
    }

    fn update_product(&self, id: ProductId, product: NewProduct) -> Result<Product> {
        product.validate()?;

        let updated = self.write(|tx| {
            let changed = tx.execute(
                "UPDATE products SET name = ?1, price = ?2, quantity = ?3 WHERE id = ?4",
                params![product.name, product.price, product.quantity, id],
            )?;
            if changed == 0 {
                return Err(LedgerError::ProductNotFound(id));
            }
            Ok(product.into_product(id))
        })?;

        info!(product_id = id, quantity = updated.quantity, "product replaced");
        Ok(updated)
    }

    fn delete_product(&self, id: ProductId) -> Result<()> {
        self.write(|tx| {
            let changed = tx.execute("DELETE FROM products WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(LedgerError::ProductNotFound(id));
            }
            Ok(())
        })?;

        info!(product_id = id, "product deleted");
        Ok(())
    }

    fn place_order(&self, order: NewOrder) -> Result<Order> {
        order.validate()?;

        let accepted = self.write(|tx| {
            let product = find_product(tx, order.product_id)?;

            // Conditional decrement: never trust the quantity read above alone
            let changed = tx.execute(
                "UPDATE products SET quantity = quantity - ?1 WHERE id = ?2 AND quantity >= ?1",
                params![order.quantity, order.product_id],
            )?;
            if changed == 0 {
                return Err(LedgerError::InsufficientStock {
                    product_id: order.product_id,
                    requested: order.quantity,
                    available: product.quantity,
                });
            }

            tx.execute(
                "INSERT INTO orders (product_id, quantity) VALUES (?1, ?2)",
                params![order.product_id, order.quantity],
            )?;

            Ok(Order {
                id: tx.last_insert_rowid(),
                product_id: order.product_id,
                quantity: order.quantity,
            })
        });

        match &accepted {
            Ok(o) => info!(
                order_id = o.id,
                product_id = o.product_id,
                quantity = o.quantity,
                "order accepted"
            ),
            Err(LedgerError::InsufficientStock { available, .. }) => warn!(
                product_id = order.product_id,
                requested = order.quantity,
                available,
                "order rejected: insufficient stock"
            ),
            Err(_) => {}
        }

        accepted
    }

    fn list_orders(&self) -> Result<Vec<Order>> {
        self.read(|tx| {
            let mut stmt = tx.prepare("SELECT id, product_id, quantity FROM orders ORDER BY id")?;
            let orders = stmt
                .query_map([], order_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(orders)
        })
    }

    fn kind(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::conformance;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sqlite_ledger_conformance() {
        conformance::run_all(|| -> Box<dyn Ledger> { Box::new(SqliteLedger::open_in_memory().unwrap()) });
    }

    #[test]
    fn test_sqlite_ledger_concurrent_orders() {
        conformance::concurrent_orders_never_overdraw(Arc::new(
            SqliteLedger::open_in_memory().unwrap(),
        ));
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('products', 'orders')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn test_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pos.db");

        let (apple, order) = {
            let ledger = SqliteLedger::open(&path).unwrap();
            let apple = ledger.add_product(NewProduct::new("Apple", 150.0, 20)).unwrap();
            let order = ledger.place_order(NewOrder::new(apple.id, 5)).unwrap();
            (apple, order)
        };

        let reopened = SqliteLedger::open(&path).unwrap();
        assert_eq!(reopened.get_product(apple.id).unwrap().quantity, 15);
        assert_eq!(reopened.list_orders().unwrap(), vec![order]);
    }

    #[test]
    fn test_failed_order_leaves_no_trace() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let apple = ledger.add_product(NewProduct::new("Apple", 150.0, 2)).unwrap();

        assert!(ledger.place_order(NewOrder::new(apple.id, 3)).is_err());

        let conn = ledger.lock().unwrap();
        let orders: i64 = conn
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .unwrap();
        let quantity: i64 = conn
            .query_row("SELECT quantity FROM products WHERE id = ?1", [apple.id], |row| row.get(0))
            .unwrap();
        assert_eq!(orders, 0);
        assert_eq!(quantity, 2);
    }

    #[test]
    fn test_two_connections_share_stock_safely() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pos.db");

        let first = Arc::new(SqliteLedger::open(&path).unwrap());
        let second = Arc::new(SqliteLedger::open(&path).unwrap());
        let product_id = first.add_product(NewProduct::new("Limited", 10.0, 10)).unwrap().id;

        let handles: Vec<_> = (0..30)
            .map(|i| {
                let ledger = if i % 2 == 0 { Arc::clone(&first) } else { Arc::clone(&second) };
                thread::spawn(move || ledger.place_order(NewOrder::new(product_id, 1)).is_ok())
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(accepted, 10);
        assert_eq!(second.get_product(product_id).unwrap().quantity, 0);
        assert_eq!(first.list_orders().unwrap().len(), 10);
    }
}
