//! Persistence contracts and the SQLite-backed tagging store.
//!
//! # Responsibility
//! - Define the async store interface the editing session saves through.
//! - Keep SQL and category-code details behind that interface.
//!
//! # Invariants
//! - Spans cross this boundary as create/delete only; there is no update.
//! - Deleting a missing span is a success.

pub mod sqlite_store;
pub mod tagging_store;
