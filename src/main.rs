use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

use pos_ledger::{
    import_catalog, load_catalog_csv, telemetry, Config, Ledger, NewOrder, SqliteLedger,
};

/// Admin commands against the persisted store
#[derive(Debug, PartialEq)]
enum Command {
    Init,
    Import(PathBuf),
    Products,
    Orders,
    Order { product_id: i64, quantity: i64 },
}

impl Command {
    fn parse(args: &[String]) -> Result<Command> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        match args.as_slice() {
            ["init"] => Ok(Command::Init),
            ["import", path] => Ok(Command::Import(PathBuf::from(*path))),
            ["products"] => Ok(Command::Products),
            ["orders"] => Ok(Command::Orders),
            ["order", product_id, quantity] => Ok(Command::Order {
                product_id: product_id
                    .parse()
                    .with_context(|| format!("Invalid product id {product_id:?}"))?,
                quantity: quantity
                    .parse()
                    .with_context(|| format!("Invalid quantity {quantity:?}"))?,
            }),
            _ => bail!(
                "Usage: pos-ledger <init | import <csv> | products | orders | order <product_id> <quantity>>"
            ),
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let db_path = db_path(|key| env::var(key).ok());
    let ledger = SqliteLedger::open(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    run(&ledger, command)
}

/// Always the persisted store: only POS_DB_PATH matters here
fn db_path<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup("POS_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| Config::default().db_path)
}

fn run(ledger: &dyn Ledger, command: Command) -> Result<()> {
    match command {
        Command::Init => {
            println!("✓ Database ready (products, orders)");
        }
        Command::Import(path) => {
            println!("📂 Loading catalog from {}...", path.display());
            let products = load_catalog_csv(&path)?;
            let added = import_catalog(ledger, products)?;
            println!("✓ Imported {} products", added.len());
        }
        Command::Products => {
            println!("{:>6}  {:<30} {:>10} {:>8}", "ID", "NAME", "PRICE", "QTY");
            for p in ledger.list_products()? {
                println!("{:>6}  {:<30} {:>10.2} {:>8}", p.id, p.name, p.price, p.quantity);
            }
        }
        Command::Orders => {
            println!("{:>6}  {:>10} {:>8}", "ID", "PRODUCT", "QTY");
            for o in ledger.list_orders()? {
                println!("{:>6}  {:>10} {:>8}", o.id, o.product_id, o.quantity);
            }
        }
        Command::Order {
            product_id,
            quantity,
        } => {
            let order = ledger.place_order(NewOrder::new(product_id, quantity))?;
            let remaining = ledger.get_product(product_id)?.quantity;
            println!(
                "✓ Order #{} accepted: {} x product {} ({} left)",
                order.id, order.quantity, order.product_id, remaining
            );
        }
    }

    Ok(())
}
