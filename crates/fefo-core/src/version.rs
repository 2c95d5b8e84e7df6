//! The shared data-version counter.
//!
//! Every committed mutation bumps the counter; observers compare the value
//! they last saw with the current one and re-read whatever they display when
//! it differs. The value only lives as long as the process and restarts at
//! [`DataVersion::INITIAL`], so a change in value means "something changed",
//! never "exactly N things changed".

use std::sync::{
  Arc,
  atomic::{AtomicU64, Ordering},
};

/// A cheaply clonable handle to one counter. Clones share the same value.
#[derive(Debug, Clone)]
pub struct DataVersion {
  inner: Arc<AtomicU64>,
}

impl DataVersion {
  pub const INITIAL: u64 = 1;

  pub fn new() -> Self {
    Self { inner: Arc::new(AtomicU64::new(Self::INITIAL)) }
  }

  pub fn current(&self) -> u64 { self.inner.load(Ordering::Acquire) }

  /// Increment the counter and return the new value.
  pub fn bump(&self) -> u64 { self.inner.fetch_add(1, Ordering::AcqRel) + 1 }
}

impl Default for DataVersion {
  fn default() -> Self { Self::new() }
}
