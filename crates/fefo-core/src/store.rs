//! The `InventoryStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `fefo-store-sqlite`).
//! Higher layers (`fefo-api`, `fefo-server`) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  catalog::{Family, FamilyDeletion, FamilyRemoval, NewFamily, NewProduct, Product, ProductRemoval},
  fefo::Allocation,
  lot::{Lot, NewLot, Sortie},
  status::ProductStock,
  version::DataVersion,
};

/// Errors produced by a store backend.
///
/// Backends wrap domain failures alongside their own I/O errors; `domain`
/// lets callers tell a rejected request apart from a broken database.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn domain(&self) -> Option<&crate::Error>;
}

/// Abstraction over a stock-ledger backend.
///
/// Operations that depend on the current date take `today` explicitly so the
/// caller decides which calendar day the request belongs to. Every mutation
/// is atomic and bumps the store's [`DataVersion`] once it has committed.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait InventoryStore: Send + Sync {
  type Error: StoreError;

  /// The counter this store bumps after each committed mutation.
  fn data_version(&self) -> &DataVersion;

  // ── Families ──────────────────────────────────────────────────────────

  /// Create a family. The name is trimmed and must be unique
  /// (case-insensitive).
  fn add_family(
    &self,
    input: NewFamily,
  ) -> impl Future<Output = Result<Family, Self::Error>> + Send + '_;

  /// All families ordered by name, the fallback family included.
  fn list_families(
    &self,
  ) -> impl Future<Output = Result<Vec<Family>, Self::Error>> + Send + '_;

  fn get_family(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Family>, Self::Error>> + Send + '_;

  /// Rename a family. The fallback family cannot be renamed.
  fn rename_family(
    &self,
    id: Uuid,
    input: NewFamily,
  ) -> impl Future<Output = Result<Family, Self::Error>> + Send + '_;

  /// Delete a family, reassigning or deleting its products according to
  /// `mode`. Deleting the fallback family always fails.
  fn delete_family(
    &self,
    id: Uuid,
    mode: FamilyDeletion,
  ) -> impl Future<Output = Result<FamilyRemoval, Self::Error>> + Send + '_;

  // ── Products ──────────────────────────────────────────────────────────

  fn add_product(
    &self,
    input: NewProduct,
  ) -> impl Future<Output = Result<Product, Self::Error>> + Send + '_;

  fn get_product(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Product>, Self::Error>> + Send + '_;

  /// Replace every editable field of a product.
  fn update_product(
    &self,
    id: Uuid,
    input: NewProduct,
  ) -> impl Future<Output = Result<Product, Self::Error>> + Send + '_;

  /// Delete a product together with its lots and sorties.
  fn delete_product(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<ProductRemoval, Self::Error>> + Send + '_;

  /// Products ordered by reference, optionally restricted to one family.
  fn list_products(
    &self,
    family: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Product>, Self::Error>> + Send + '_;

  /// Resolve a product by exact reference or barcode, ignoring case.
  /// A reference match is preferred over a barcode match.
  fn find_product<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Option<Product>, Self::Error>> + Send + 'a;

  /// Every product (optionally of one family) with its family and all of
  /// its lots in FEFO order.
  fn stock_snapshot(
    &self,
    family: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<ProductStock>, Self::Error>> + Send + '_;

  // ── Lots ──────────────────────────────────────────────────────────────

  /// Record a lot. A missing entry date defaults to `today`.
  fn add_lot(
    &self,
    input: NewLot,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Lot, Self::Error>> + Send + '_;

  fn get_lot(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Lot>, Self::Error>> + Send + '_;

  /// Lots in FEFO order, optionally restricted to one product.
  fn list_lots(
    &self,
    product: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Lot>, Self::Error>> + Send + '_;

  /// Delete a lot, but only if it expired before `today`.
  fn delete_expired_lot(
    &self,
    id: Uuid,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Lot, Self::Error>> + Send + '_;

  /// The next `limit` lots the allocator would draw from, across products.
  fn fefo_queue(
    &self,
    today: NaiveDate,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Lot>, Self::Error>> + Send + '_;

  // ── Movements ─────────────────────────────────────────────────────────

  /// Consume `quantity` units of the product identified by `code`, earliest
  /// expiry first, and log one sortie. Fully applied or fully rejected.
  fn allocate<'a>(
    &'a self,
    code: &'a str,
    quantity: i64,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Allocation, Self::Error>> + Send + 'a;

  /// Most recent sorties first.
  fn list_sorties(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Sortie>, Self::Error>> + Send + '_;
}
