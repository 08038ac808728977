//! Database schema and operations for the crude catalog

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::config::DefaultPrices;
use crate::financials::PriceTable;
use crate::models::{CrudeOption, Product};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Crude assays available to the refinery
        CREATE TABLE IF NOT EXISTS crude_options (
            name TEXT PRIMARY KEY,
            api REAL NOT NULL,
            sulfur REAL NOT NULL,
            purchase_price REAL NOT NULL,
            transport_cost REAL NOT NULL,
            operational_cost REAL NOT NULL
        );

        -- Market price per barrel of each refined product
        CREATE TABLE IF NOT EXISTS product_prices (
            product TEXT PRIMARY KEY,
            price_per_barrel REAL NOT NULL
        );

        -- Serialized results kept between runs
        CREATE TABLE IF NOT EXISTS cache_entries (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn crude_from_row(row: &Row<'_>) -> rusqlite::Result<CrudeOption> {
    Ok(CrudeOption {
        name: row.get(0)?,
        api: row.get(1)?,
        sulfur: row.get(2)?,
        purchase_price: row.get(3)?,
        transport_cost: row.get(4)?,
        operational_cost: row.get(5)?,
    })
}

/// Insert or replace a crude option
pub fn upsert_crude(conn: &Connection, crude: &CrudeOption) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO crude_options (name, api, sulfur, purchase_price, transport_cost, operational_cost)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            &crude.name,
            crude.api,
            crude.sulfur,
            crude.purchase_price,
            crude.transport_cost,
            crude.operational_cost,
        ),
    )?;
    Ok(())
}

/// Look up a crude by name (case-insensitive)
pub fn get_crude(conn: &Connection, name: &str) -> Result<Option<CrudeOption>> {
    let crude = conn
        .query_row(
            "SELECT name, api, sulfur, purchase_price, transport_cost, operational_cost
             FROM crude_options
             WHERE name = ?1 COLLATE NOCASE",
            [name],
            crude_from_row,
        )
        .optional()?;
    Ok(crude)
}

/// List all crudes in the catalog
pub fn list_crudes(conn: &Connection) -> Result<Vec<CrudeOption>> {
    let mut stmt = conn.prepare(
        "SELECT name, api, sulfur, purchase_price, transport_cost, operational_cost
         FROM crude_options ORDER BY name",
    )?;

    let rows = stmt.query_map([], crude_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Remove a crude. Returns whether it existed.
pub fn delete_crude(conn: &Connection, name: &str) -> Result<bool> {
    let n = conn.execute(
        "DELETE FROM crude_options WHERE name = ?1 COLLATE NOCASE",
        [name],
    )?;
    Ok(n > 0)
}

/// Clear crudes and prices (for re-import)
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM product_prices;
        DELETE FROM crude_options;
        "#,
    )?;
    Ok(())
}

pub fn set_price(conn: &Connection, product: Product, price: f64) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO product_prices (product, price_per_barrel) VALUES (?1, ?2)",
        (product.as_str(), price),
    )?;
    Ok(())
}

/// Stored prices, falling back to `defaults` for products with none
pub fn load_prices(conn: &Connection, defaults: &DefaultPrices) -> Result<PriceTable> {
    let mut table = PriceTable::from(defaults);

    let mut stmt = conn.prepare("SELECT product, price_per_barrel FROM product_prices")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?;

    for row in rows {
        let (name, price) = row?;
        let product: Product = name
            .parse()
            .with_context(|| format!("Unknown product '{}' in product_prices", name))?;
        table.set(product, price);
    }
    Ok(table)
}

pub fn load_cache_entries(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT key, value FROM cache_entries ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Replace the whole cache table in one transaction
pub fn replace_cache_entries<'a, I>(conn: &mut Connection, entries: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM cache_entries", [])?;
    {
        let mut stmt = tx.prepare("INSERT INTO cache_entries (key, value) VALUES (?1, ?2)")?;
        for (key, value) in entries {
            stmt.execute((key, value))?;
        }
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn mesa() -> CrudeOption {
        CrudeOption {
            name: "Mesa 30".to_string(),
            api: 30.0,
            sulfur: 1.0,
            purchase_price: 72.0,
            transport_cost: 3.0,
            operational_cost: 5.5,
        }
    }

    #[test]
    fn crude_roundtrips_through_catalog() {
        let conn = open();
        upsert_crude(&conn, &mesa()).unwrap();

        assert_eq!(get_crude(&conn, "mesa 30").unwrap(), Some(mesa()));
        assert_eq!(get_crude(&conn, "Boscan").unwrap(), None);

        let mut updated = mesa();
        updated.purchase_price = 75.0;
        upsert_crude(&conn, &updated).unwrap();
        let all = list_crudes(&conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].purchase_price, 75.0);

        assert!(delete_crude(&conn, "Mesa 30").unwrap());
        assert!(!delete_crude(&conn, "Mesa 30").unwrap());
    }

    #[test]
    fn prices_fall_back_to_defaults() {
        let conn = open();
        set_price(&conn, Product::Kerosene, 101.0).unwrap();

        let defaults = DefaultPrices::default();
        let table = load_prices(&conn, &defaults).unwrap();
        assert_eq!(table.price(Product::Kerosene), 101.0);
        assert_eq!(table.price(Product::Gas), defaults.gas);
    }

    #[test]
    fn cache_table_is_replaced_wholesale() {
        let mut conn = open();
        replace_cache_entries(&mut conn, [("a", "1"), ("b", "2")]).unwrap();
        replace_cache_entries(&mut conn, [("b", "3")]).unwrap();
        assert_eq!(
            load_cache_entries(&conn).unwrap(),
            vec![("b".to_string(), "3".to_string())]
        );
    }
}
