// Catalog Import
// CSV (name,price,quantity) → NewProduct records → Ledger::add_product

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use crate::ledger::Ledger;
use crate::model::{NewProduct, Product};

pub fn load_catalog_csv(csv_path: &Path) -> Result<Vec<NewProduct>> {
    let rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    read_catalog(rdr)
}

/// Parse catalog rows from any reader (header row required)
pub fn read_catalog<R: Read>(mut rdr: csv::Reader<R>) -> Result<Vec<NewProduct>> {
    let mut products = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        // +2: header row, 1-based lines
        let product: NewProduct =
            result.with_context(|| format!("Failed to deserialize product on line {}", line + 2))?;
        products.push(product);
    }

    Ok(products)
}

/// Add every record; stops at the first rejected row
pub fn import_catalog(ledger: &dyn Ledger, products: Vec<NewProduct>) -> Result<Vec<Product>> {
    let mut added = Vec::with_capacity(products.len());

    for product in products {
        let name = product.name.clone();
        let product = ledger
            .add_product(product)
            .with_context(|| format!("Failed to import product {name:?}"))?;
        added.push(product);
    }

    tracing::info!(count = added.len(), "catalog imported");
    Ok(added)
}
