//! SQL schema for the FEFO SQLite store.
//!
//! Executed once at connection startup. Referential integrity between
//! families, products, lots and sorties is enforced by the store itself;
//! the foreign keys below only guard against bugs, so none of them cascade.
//!
//! Names and codes compare under the `FOLD` collation, which must be
//! registered on the connection (see [`register_collations`]) before the
//! schema runs. SQLite's built-in `NOCASE` only folds ASCII letters.

use std::cmp::Ordering;

use rusqlite::Connection;

/// Case-insensitive comparison over full Unicode lowercase mapping.
pub fn fold_cmp(a: &str, b: &str) -> Ordering {
  a.chars()
    .flat_map(char::to_lowercase)
    .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Install the collations the schema refers to.
pub fn register_collations(conn: &Connection) -> rusqlite::Result<()> {
  conn.create_collation("FOLD", fold_cmp)
}

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS` / `OR IGNORE`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS families (
    family_id   TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE COLLATE FOLD
);

CREATE TABLE IF NOT EXISTS products (
    product_id            TEXT PRIMARY KEY,
    reference             TEXT NOT NULL UNIQUE COLLATE FOLD,
    name                  TEXT,
    barcode               TEXT NOT NULL UNIQUE COLLATE FOLD,
    family_id             TEXT NOT NULL REFERENCES families(family_id),
    stock_alert_threshold INTEGER NOT NULL CHECK (stock_alert_threshold >= 0),
    expiry_alert_days     INTEGER NOT NULL CHECK (expiry_alert_days >= 0)
);

-- Dates are ISO 8601 (YYYY-MM-DD), so text order is calendar order.
CREATE TABLE IF NOT EXISTS lots (
    lot_id      TEXT PRIMARY KEY,
    product_id  TEXT NOT NULL REFERENCES products(product_id),
    quantity    INTEGER NOT NULL CHECK (quantity >= 0),
    entry_date  TEXT NOT NULL,
    expiry_date TEXT NOT NULL
);

-- Append-only consumption log.
CREATE TABLE IF NOT EXISTS sorties (
    sortie_id   TEXT PRIMARY KEY,
    product_id  TEXT NOT NULL REFERENCES products(product_id),
    quantity    INTEGER NOT NULL CHECK (quantity > 0),
    sortie_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS products_family_idx ON products(family_id);
CREATE INDEX IF NOT EXISTS lots_fefo_idx       ON lots(product_id, expiry_date);
CREATE INDEX IF NOT EXISTS sorties_date_idx    ON sorties(sortie_date);

-- The fallback family always exists and has the nil UUID.
INSERT OR IGNORE INTO families (family_id, name)
VALUES ('00000000-0000-0000-0000-000000000000', '-');

PRAGMA user_version = 1;
";
