//! [`SqliteStore`], the SQLite implementation of [`InventoryStore`].

use std::{collections::HashMap, path::Path, sync::Arc};

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use fefo_core::{
  Error as CoreError,
  catalog::{
    FALLBACK_FAMILY_ID, Family, FamilyDeletion, FamilyRemoval, NewFamily, NewProduct,
    Product, ProductDraft, ProductRemoval,
  },
  fefo::{self, Allocation},
  lot::{Lot, NewLot, Sortie, positive_quantity},
  status::ProductStock,
  store::InventoryStore,
  version::DataVersion,
};

use crate::{
  Result,
  encode::{
    FAMILY_COLUMNS, LOT_COLUMNS, PRODUCT_COLUMNS, RawFamily, RawLot, RawProduct,
    RawSortie, SORTIE_COLUMNS, encode_date, encode_uuid,
  },
  locks::KeyedLocks,
  schema::{SCHEMA, register_collations},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A stock ledger backed by a single SQLite file.
///
/// Clones share the connection, the version counter and the lock table.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  version: DataVersion,
  pub(crate) locks: Arc<KeyedLocks<Uuid>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  /// Share an externally owned version counter instead of the store's own.
  pub fn with_data_version(mut self, version: DataVersion) -> Self {
    self.version = version;
    self
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        register_collations(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      version: DataVersion::new(),
      locks: Arc::new(KeyedLocks::new()),
    })
  }

  /// Run `op` on the connection thread, keeping its own error type.
  async fn run<T, F>(&self, op: F) -> Result<T>
  where
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(op(conn))).await?
  }

  /// Record that a mutation has committed.
  fn committed(&self) -> u64 {
    let version = self.version.bump();
    tracing::debug!(version, "data version bumped");
    version
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn load_family(conn: &Connection, id: &str) -> Result<Option<Family>> {
  conn
    .query_row(
      &format!("SELECT {FAMILY_COLUMNS} FROM families WHERE family_id = ?1"),
      [id],
      RawFamily::from_row,
    )
    .optional()?
    .map(RawFamily::into_family)
    .transpose()
}

fn load_product(conn: &Connection, id: &str) -> Result<Option<Product>> {
  conn
    .query_row(
      &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = ?1"),
      [id],
      RawProduct::from_row,
    )
    .optional()?
    .map(RawProduct::into_product)
    .transpose()
}

fn load_lot(conn: &Connection, id: &str) -> Result<Option<Lot>> {
  conn
    .query_row(
      &format!("SELECT {LOT_COLUMNS} FROM lots WHERE lot_id = ?1"),
      [id],
      RawLot::from_row,
    )
    .optional()?
    .map(RawLot::into_lot)
    .transpose()
}

fn query_lots(
  conn: &Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> Result<Vec<Lot>> {
  let mut stmt = conn.prepare(sql)?;
  let raws = stmt
    .query_map(params, RawLot::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawLot::into_lot).collect()
}

fn query_products(
  conn: &Connection,
  family: Option<&str>,
) -> Result<Vec<Product>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {PRODUCT_COLUMNS} FROM products
     WHERE ?1 IS NULL OR family_id = ?1
     ORDER BY reference"
  ))?;
  let raws = stmt
    .query_map([family], RawProduct::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawProduct::into_product).collect()
}

fn require_family(conn: &Connection, id: Uuid) -> Result<Family> {
  load_family(conn, &encode_uuid(id))?
    .ok_or_else(|| CoreError::NotFound(format!("family {id}")).into())
}

fn require_product(conn: &Connection, id: Uuid) -> Result<Product> {
  load_product(conn, &encode_uuid(id))?
    .ok_or_else(|| CoreError::NotFound(format!("product {id}")).into())
}

/// Reject a family name already taken by another family.
fn ensure_family_name_free(conn: &Connection, name: &str, exclude: Option<&str>) -> Result<()> {
  let clash: Option<String> = conn
    .query_row(
      "SELECT family_id FROM families
       WHERE name = ?1 COLLATE FOLD AND family_id != ?2",
      rusqlite::params![name, exclude.unwrap_or_default()],
      |r| r.get(0),
    )
    .optional()?;
  if clash.is_some() {
    return Err(CoreError::Conflict(format!("family name {name:?} already exists")).into());
  }
  Ok(())
}

/// Reject a reference or barcode already used by another product.
fn ensure_product_unique(
  conn: &Connection,
  draft: &ProductDraft,
  exclude: Option<&str>,
) -> Result<()> {
  let exclude = exclude.unwrap_or_default();
  for (column, value) in [("reference", &draft.reference), ("barcode", &draft.barcode)] {
    let clash: Option<String> = conn
      .query_row(
        &format!(
          "SELECT product_id FROM products
           WHERE {column} = ?1 COLLATE FOLD AND product_id != ?2"
        ),
        rusqlite::params![value, exclude],
        |r| r.get(0),
      )
      .optional()?;
    if clash.is_some() {
      return Err(
        CoreError::Conflict(format!("{column} {value:?} is already used by another product"))
          .into(),
      );
    }
  }
  Ok(())
}

/// Remove a product's lots, sorties and row. Returns the number of lots
/// removed.
fn remove_product_rows(conn: &Connection, id: &str) -> Result<u64> {
  let lots = conn.execute("DELETE FROM lots WHERE product_id = ?1", [id])?;
  conn.execute("DELETE FROM sorties WHERE product_id = ?1", [id])?;
  conn.execute("DELETE FROM products WHERE product_id = ?1", [id])?;
  Ok(lots as u64)
}

/// The locked part of an allocation. Must run while the caller holds the
/// product's lock; everything happens inside one immediate transaction.
fn allocate_locked(
  conn: &mut Connection,
  product_id: Uuid,
  requested: u32,
  today: NaiveDate,
) -> Result<Allocation> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  // The product may have been deleted between lookup and lock.
  let product = require_product(&tx, product_id)?;
  let id_str = encode_uuid(product_id);

  let candidates = query_lots(
    &tx,
    &format!(
      "SELECT {LOT_COLUMNS} FROM lots
       WHERE product_id = ?1 AND quantity > 0 AND expiry_date >= ?2
       ORDER BY expiry_date, rowid"
    ),
    rusqlite::params![id_str, encode_date(today)],
  )?;

  // An error here drops `tx`, which rolls back.
  let plan = fefo::plan(&product.reference, &candidates, requested, today)?;

  for step in &plan.consumption {
    tx.execute(
      "UPDATE lots SET quantity = ?1 WHERE lot_id = ?2",
      rusqlite::params![step.remaining, encode_uuid(step.lot_id)],
    )?;
  }

  let sortie = Sortie {
    sortie_id: Uuid::new_v4(),
    product_id,
    quantity: requested,
    sortie_date: today,
  };
  tx.execute(
    "INSERT INTO sorties (sortie_id, product_id, quantity, sortie_date)
     VALUES (?1, ?2, ?3, ?4)",
    rusqlite::params![
      encode_uuid(sortie.sortie_id),
      id_str,
      sortie.quantity,
      encode_date(sortie.sortie_date),
    ],
  )?;

  tx.commit()?;

  Ok(Allocation {
    product_id,
    reference: product.reference,
    quantity: requested,
    sortie,
    consumed: plan.consumption,
  })
}

// ─── InventoryStore impl ─────────────────────────────────────────────────────

impl InventoryStore for SqliteStore {
  type Error = crate::Error;

  fn data_version(&self) -> &DataVersion { &self.version }

  // ── Families ──────────────────────────────────────────────────────────────

  async fn add_family(&self, input: NewFamily) -> Result<Family> {
    let family = Family { family_id: Uuid::new_v4(), name: input.validate()? };

    let row = family.clone();
    self
      .run(move |conn| {
        let tx = conn.transaction()?;
        ensure_family_name_free(&tx, &row.name, None)?;
        tx.execute(
          "INSERT INTO families (family_id, name) VALUES (?1, ?2)",
          rusqlite::params![encode_uuid(row.family_id), row.name],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    self.committed();
    tracing::info!(family = %family.name, "family created");
    Ok(family)
  }

  async fn list_families(&self) -> Result<Vec<Family>> {
    self
      .run(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FAMILY_COLUMNS} FROM families ORDER BY name"
        ))?;
        let raws = stmt
          .query_map([], RawFamily::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawFamily::into_family).collect()
      })
      .await
  }

  async fn get_family(&self, id: Uuid) -> Result<Option<Family>> {
    self.run(move |conn| load_family(conn, &encode_uuid(id))).await
  }

  async fn rename_family(&self, id: Uuid, input: NewFamily) -> Result<Family> {
    if id == FALLBACK_FAMILY_ID {
      return Err(
        CoreError::InvalidInput("the fallback family cannot be renamed".into()).into(),
      );
    }
    let name = input.validate()?;

    let (old, family) = self
      .run(move |conn| {
        let tx = conn.transaction()?;
        let old = require_family(&tx, id)?;
        let id_str = encode_uuid(id);
        ensure_family_name_free(&tx, &name, Some(&id_str))?;
        tx.execute(
          "UPDATE families SET name = ?1 WHERE family_id = ?2",
          rusqlite::params![name, id_str],
        )?;
        tx.commit()?;
        Ok((old.name, Family { family_id: id, name }))
      })
      .await?;

    self.committed();
    tracing::info!(from = %old, to = %family.name, "family renamed");
    Ok(family)
  }

  async fn delete_family(&self, id: Uuid, mode: FamilyDeletion) -> Result<FamilyRemoval> {
    if id == FALLBACK_FAMILY_ID {
      return Err(
        CoreError::IllegalDeletion("the fallback family cannot be deleted".into()).into(),
      );
    }

    let removal = self
      .run(move |conn| {
        let tx = conn.transaction()?;
        let family = require_family(&tx, id)?;
        let id_str = encode_uuid(id);

        let affected = match mode {
          FamilyDeletion::Reassign => tx.execute(
            "UPDATE products SET family_id = ?1 WHERE family_id = ?2",
            rusqlite::params![encode_uuid(FALLBACK_FAMILY_ID), id_str],
          )? as u64,
          FamilyDeletion::Cascade => {
            let products: Vec<String> = {
              let mut stmt =
                tx.prepare("SELECT product_id FROM products WHERE family_id = ?1")?;
              stmt
                .query_map([&id_str], |r| r.get(0))?
                .collect::<rusqlite::Result<_>>()?
            };
            for product in &products {
              remove_product_rows(&tx, product)?;
            }
            products.len() as u64
          }
        };

        tx.execute("DELETE FROM families WHERE family_id = ?1", [&id_str])?;
        tx.commit()?;
        Ok(FamilyRemoval { family, mode, affected_products: affected })
      })
      .await?;

    self.committed();
    tracing::info!(
      family = %removal.family.name,
      mode = ?removal.mode,
      products = removal.affected_products,
      "family deleted"
    );
    Ok(removal)
  }

  // ── Products ──────────────────────────────────────────────────────────────

  async fn add_product(&self, input: NewProduct) -> Result<Product> {
    let draft = input.validate()?;
    let product_id = Uuid::new_v4();

    let product = self
      .run(move |conn| {
        let tx = conn.transaction()?;
        require_family(&tx, draft.family_id)?;
        ensure_product_unique(&tx, &draft, None)?;
        tx.execute(
          "INSERT INTO products (
             product_id, reference, name, barcode, family_id,
             stock_alert_threshold, expiry_alert_days
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            encode_uuid(product_id),
            draft.reference,
            draft.name,
            draft.barcode,
            encode_uuid(draft.family_id),
            draft.stock_alert_threshold,
            draft.expiry_alert_days,
          ],
        )?;
        tx.commit()?;
        Ok(draft.into_product(product_id))
      })
      .await?;

    self.committed();
    tracing::info!(reference = %product.reference, "product created");
    Ok(product)
  }

  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    self.run(move |conn| load_product(conn, &encode_uuid(id))).await
  }

  async fn update_product(&self, id: Uuid, input: NewProduct) -> Result<Product> {
    let draft = input.validate()?;

    let product = self
      .run(move |conn| {
        let tx = conn.transaction()?;
        require_product(&tx, id)?;
        require_family(&tx, draft.family_id)?;
        let id_str = encode_uuid(id);
        ensure_product_unique(&tx, &draft, Some(&id_str))?;
        tx.execute(
          "UPDATE products SET
             reference = ?1, name = ?2, barcode = ?3, family_id = ?4,
             stock_alert_threshold = ?5, expiry_alert_days = ?6
           WHERE product_id = ?7",
          rusqlite::params![
            draft.reference,
            draft.name,
            draft.barcode,
            encode_uuid(draft.family_id),
            draft.stock_alert_threshold,
            draft.expiry_alert_days,
            id_str,
          ],
        )?;
        tx.commit()?;
        Ok(draft.into_product(id))
      })
      .await?;

    self.committed();
    tracing::info!(reference = %product.reference, "product updated");
    Ok(product)
  }

  async fn delete_product(&self, id: Uuid) -> Result<ProductRemoval> {
    let removal = self
      .run(move |conn| {
        let tx = conn.transaction()?;
        let product = require_product(&tx, id)?;
        let lots_removed = remove_product_rows(&tx, &encode_uuid(id))?;
        tx.commit()?;
        Ok(ProductRemoval { product, lots_removed })
      })
      .await?;

    self.committed();
    tracing::info!(
      reference = %removal.product.reference,
      lots = removal.lots_removed,
      "product deleted"
    );
    Ok(removal)
  }

  async fn list_products(&self, family: Option<Uuid>) -> Result<Vec<Product>> {
    let family = family.map(encode_uuid);
    self
      .run(move |conn| query_products(conn, family.as_deref()))
      .await
  }

  async fn find_product(&self, code: &str) -> Result<Option<Product>> {
    let code = code.trim().to_owned();
    if code.is_empty() {
      return Ok(None);
    }
    self
      .run(move |conn| {
        conn
          .query_row(
            &format!(
              "SELECT {PRODUCT_COLUMNS} FROM products
               WHERE reference = ?1 COLLATE FOLD OR barcode = ?1 COLLATE FOLD
               ORDER BY (reference = ?1 COLLATE FOLD) DESC, rowid
               LIMIT 1"
            ),
            [&code],
            RawProduct::from_row,
          )
          .optional()?
          .map(RawProduct::into_product)
          .transpose()
      })
      .await
  }

  async fn stock_snapshot(&self, family: Option<Uuid>) -> Result<Vec<ProductStock>> {
    let family = family.map(encode_uuid);
    self
      .run(move |conn| {
        // One read transaction so products and lots come from the same state.
        let tx = conn.transaction()?;

        let families: HashMap<Uuid, Family> = {
          let mut stmt = tx.prepare(&format!("SELECT {FAMILY_COLUMNS} FROM families"))?;
          let raws = stmt
            .query_map([], RawFamily::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          raws
            .into_iter()
            .map(|raw| raw.into_family().map(|f| (f.family_id, f)))
            .collect::<Result<_>>()?
        };

        let products = query_products(&tx, family.as_deref())?;

        let mut lots_by_product: HashMap<Uuid, Vec<Lot>> = HashMap::new();
        for lot in query_lots(
          &tx,
          &format!("SELECT {LOT_COLUMNS} FROM lots ORDER BY expiry_date, rowid"),
          [],
        )? {
          lots_by_product.entry(lot.product_id).or_default().push(lot);
        }
        tx.commit()?;

        products
          .into_iter()
          .map(|product| -> Result<ProductStock> {
            let family = families
              .get(&product.family_id)
              .cloned()
              .ok_or_else(|| CoreError::NotFound(format!("family {}", product.family_id)))?;
            let lots = lots_by_product.remove(&product.product_id).unwrap_or_default();
            Ok(ProductStock { product, family, lots })
          })
          .collect()
      })
      .await
  }

  // ── Lots ──────────────────────────────────────────────────────────────────

  async fn add_lot(&self, input: NewLot, today: NaiveDate) -> Result<Lot> {
    let lot = input.validate(today)?.into_lot(Uuid::new_v4());

    let row = lot.clone();
    let reference = self
      .run(move |conn| {
        let tx = conn.transaction()?;
        let product = require_product(&tx, row.product_id)?;
        tx.execute(
          "INSERT INTO lots (lot_id, product_id, quantity, entry_date, expiry_date)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            encode_uuid(row.lot_id),
            encode_uuid(row.product_id),
            row.quantity,
            encode_date(row.entry_date),
            encode_date(row.expiry_date),
          ],
        )?;
        tx.commit()?;
        Ok(product.reference)
      })
      .await?;

    self.committed();
    tracing::info!(
      reference = %reference,
      quantity = lot.quantity,
      expiry = %lot.expiry_date,
      "lot recorded"
    );
    Ok(lot)
  }

  async fn get_lot(&self, id: Uuid) -> Result<Option<Lot>> {
    self.run(move |conn| load_lot(conn, &encode_uuid(id))).await
  }

  async fn list_lots(&self, product: Option<Uuid>) -> Result<Vec<Lot>> {
    let product = product.map(encode_uuid);
    self
      .run(move |conn| {
        query_lots(
          conn,
          &format!(
            "SELECT {LOT_COLUMNS} FROM lots
             WHERE ?1 IS NULL OR product_id = ?1
             ORDER BY expiry_date, rowid"
          ),
          [product],
        )
      })
      .await
  }

  async fn delete_expired_lot(&self, id: Uuid, today: NaiveDate) -> Result<Lot> {
    let lot = self
      .run(move |conn| {
        let tx = conn.transaction()?;
        let id_str = encode_uuid(id);
        let lot = load_lot(&tx, &id_str)?
          .ok_or_else(|| CoreError::NotFound(format!("lot {id}")))?;
        if !lot.is_expired(today) {
          return Err(
            CoreError::IllegalDeletion(format!(
              "lot {id} expires on {} and is not expired yet",
              lot.expiry_date
            ))
            .into(),
          );
        }
        tx.execute("DELETE FROM lots WHERE lot_id = ?1", [&id_str])?;
        tx.commit()?;
        Ok(lot)
      })
      .await?;

    self.committed();
    tracing::info!(lot = %lot.lot_id, expiry = %lot.expiry_date, "expired lot deleted");
    Ok(lot)
  }

  async fn fefo_queue(&self, today: NaiveDate, limit: usize) -> Result<Vec<Lot>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    self
      .run(move |conn| {
        query_lots(
          conn,
          &format!(
            "SELECT {LOT_COLUMNS} FROM lots
             WHERE quantity > 0 AND expiry_date >= ?1
             ORDER BY expiry_date, rowid
             LIMIT ?2"
          ),
          rusqlite::params![encode_date(today), limit],
        )
      })
      .await
  }

  // ── Movements ─────────────────────────────────────────────────────────────

  async fn allocate(&self, code: &str, quantity: i64, today: NaiveDate) -> Result<Allocation> {
    let requested = positive_quantity(quantity)?;
    let code = code.trim();
    if code.is_empty() {
      return Err(CoreError::InvalidInput("product reference or barcode is required".into()).into());
    }

    let product = self
      .find_product(code)
      .await?
      .ok_or_else(|| CoreError::NotFound(format!("product with reference or barcode {code:?}")))?;

    // Held until the transaction below has committed or rolled back.
    let _guard = self.locks.lock(product.product_id).await;

    let product_id = product.product_id;
    let result = self
      .run(move |conn| allocate_locked(conn, product_id, requested, today))
      .await;

    let allocation = match result {
      Ok(allocation) => allocation,
      Err(e) => {
        tracing::warn!(reference = %product.reference, requested, error = %e, "allocation rejected");
        return Err(e);
      }
    };

    self.committed();
    tracing::info!(
      reference = %allocation.reference,
      quantity = allocation.quantity,
      lots = allocation.consumed.len(),
      "stock allocated"
    );
    Ok(allocation)
  }

  async fn list_sorties(&self, limit: usize) -> Result<Vec<Sortie>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    self
      .run(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SORTIE_COLUMNS} FROM sorties
           ORDER BY sortie_date DESC, rowid DESC
           LIMIT ?1"
        ))?;
        let raws = stmt
          .query_map([limit], RawSortie::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawSortie::into_sortie).collect()
      })
      .await
  }
}
