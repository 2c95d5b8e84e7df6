//! Core types and trait definitions for the FEFO stock tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The allocation planner and the status classifier are pure functions over
//! snapshots of ledger state; storage backends and the API build on them.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod alerts;
pub mod catalog;
pub mod error;
pub mod fefo;
pub mod lot;
pub mod status;
pub mod store;
pub mod version;

pub use error::{Error, Result};
