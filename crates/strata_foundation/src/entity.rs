//! Entity identifiers with packed slot indices and versions.
//!
//! An [`EntityId`] packs a 24-bit slot index and a 7-bit slot version into
//! a single `u32`. The version wraps from 127 back to 1 and never lands on
//! 0, so id 0 can serve as the universal invalid sentinel.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Numeric archetype identifier used for serialization and O(1) lookup.
pub type ArchetypeId = u8;

/// Slot version counter, always in `1..=127` for slots that have ever
/// been occupied. Version 0 marks the invalid sentinel.
pub type SlotVersion = u8;

/// Highest addressable slot index (24 bits).
pub const SLOT_INDEX_MAX: u32 = (1 << 24) - 1;

/// Highest slot version before wrapping back to 1 (7 bits).
pub const SLOT_VERSION_MAX: SlotVersion = 0x7f;

const INDEX_MASK: u32 = 0x00ff_ffff;
const VERSION_SHIFT: u32 = 24;

/// Entity identifier packing a slot index and a slot version.
///
/// # Layout
/// - bits 0..24: slot index
/// - bits 24..31: slot version (1..=127)
/// - id 0 is reserved invalid (version 0 never occurs for a live slot)
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityId(u32);

impl EntityId {
    /// The reserved invalid id.
    pub const INVALID: Self = Self(0);

    /// Creates an id from a slot index and version.
    ///
    /// The index must fit in 24 bits and the version in 7 bits; excess
    /// bits are masked off.
    #[must_use]
    pub const fn from_parts(index: u32, version: SlotVersion) -> Self {
        Self((index & INDEX_MASK) | ((version as u32 & SLOT_VERSION_MAX as u32) << VERSION_SHIFT))
    }

    /// Creates an id for a slot from its index and current state byte.
    #[must_use]
    pub const fn from_index_and_state(index: u32, state: SlotState) -> Self {
        Self::from_parts(index, state.version())
    }

    /// Returns the raw packed value.
    #[must_use]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Reconstructs an id from its raw packed value.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the slot index encoded in this id.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 & INDEX_MASK
    }

    /// Returns the slot version encoded in this id.
    #[must_use]
    pub const fn version(self) -> SlotVersion {
        ((self.0 >> VERSION_SHIFT) & SLOT_VERSION_MAX as u32) as SlotVersion
    }

    /// Returns true if this is the invalid sentinel.
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "EntityId(invalid)")
        } else {
            write!(f, "EntityId({}v{})", self.index(), self.version())
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "Entity(invalid)")
        } else {
            write!(f, "Entity({})", self.index())
        }
    }
}

const STATE_VERSION_MASK: u8 = SLOT_VERSION_MAX;
const STATE_EMPTY_BIT: u8 = 0x80;

/// Per-slot state byte: the current slot version plus one "empty" flag bit.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlotState(u8);

impl SlotState {
    /// State of a freshly occupied slot at the starting version.
    pub const FIRST: Self = Self(1);

    /// Creates an occupied state at the given version.
    #[must_use]
    pub const fn occupied(version: SlotVersion) -> Self {
        Self(version & STATE_VERSION_MASK)
    }

    /// Creates an empty (free) state at the given version.
    #[must_use]
    pub const fn vacant(version: SlotVersion) -> Self {
        Self((version & STATE_VERSION_MASK) | STATE_EMPTY_BIT)
    }

    /// Returns the slot version held in this state.
    #[must_use]
    pub const fn version(self) -> SlotVersion {
        self.0 & STATE_VERSION_MASK
    }

    /// Returns true if the slot is marked empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 & STATE_EMPTY_BIT != 0
    }

    /// Returns this state with the empty bit cleared, version preserved.
    #[must_use]
    pub const fn reoccupied(self) -> Self {
        Self::occupied(self.version())
    }

    /// Returns the next version after this state's, wrapping 127 -> 1.
    ///
    /// The result never lands on 0, so an id built from any committed
    /// state is never the invalid sentinel.
    #[must_use]
    pub const fn next_version(self) -> SlotVersion {
        let bumped = (self.version() + 1) & STATE_VERSION_MASK;
        if bumped == 0 { 1 } else { bumped }
    }

    /// Returns the raw state byte as stored on the wire.
    #[must_use]
    pub const fn to_bits(self) -> u8 {
        self.0
    }

    /// Reconstructs a state from its raw byte.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }
}

impl fmt::Debug for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SlotState(v{}, {})",
            self.version(),
            if self.is_empty() { "empty" } else { "occupied" }
        )
    }
}
