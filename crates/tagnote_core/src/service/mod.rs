//! Use-case services on top of the engine, surface and store.
//!
//! # Responsibility
//! - Drive the open/edit/save lifecycle of one note (`session`).
//! - Aggregate project taggings for review screens (`review`).
//!
//! # Invariants
//! - Services reach persistence only through the `repo` traits.

pub mod review;
pub mod session;
