//! Pure annotation algorithms.
//!
//! # Responsibility
//! - Resolve a newly drawn span against the working set (`resolver`).
//! - Split text plus spans into renderable segments (`compositor`).
//!
//! # Invariants
//! - Functions here have no side effects besides debug logging.
//! - The resolver is the only way spans enter a working set.

pub mod compositor;
pub mod resolver;
