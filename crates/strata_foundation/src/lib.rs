//! Core types for the Strata entity store.
//!
//! This crate provides:
//! - [`EntityId`] - Packed slot index + slot version identifiers
//! - [`SlotState`] - Per-slot occupancy and version byte
//! - [`FieldMask`] / [`Signature`] - Schema bitsets
//! - [`Error`] - Rich error types with context
//! - [`Stream`] / [`MemoryStream`] - The serialization byte stream boundary

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod entity;
mod error;
mod mask;
mod stream;

pub use entity::{ArchetypeId, EntityId, SlotState, SlotVersion, SLOT_INDEX_MAX, SLOT_VERSION_MAX};
pub use error::{Error, ErrorKind, Result};
pub use mask::{FieldFlags, FieldMask, Signature};
pub use stream::{MemoryStream, Stream};
