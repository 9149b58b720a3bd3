//! Baseline/working reconciliation against the tagging store.
//!
//! # Responsibility
//! - Compute the minimal create/delete plan between two span sets (`differ`).
//! - Run that plan as one concurrent batch and report per operation
//!   (`executor`).
//!
//! # Invariants
//! - No update operation exists; a category change is delete plus create.
//! - A failed operation never reverts the working set.

pub mod differ;
pub mod executor;
