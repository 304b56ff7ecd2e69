//! Strata - Archetype-based entity storage engine
//!
//! This crate re-exports both layers of the Strata system for convenient
//! access. For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 1: strata_storage    — Fields, columns, archetypes, registry,
//!                              handles, iteration, snapshot protocol
//! Layer 0: strata_foundation — Core types (EntityId, SlotState, masks,
//!                              Error, the Stream abstraction)
//! ```

pub use strata_foundation as foundation;
pub use strata_storage as storage;
