//! Field masks, archetype signatures, and field behavior flags.

use std::fmt;
use std::ops::BitOr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single-bit mask statically assigned to one field type.
///
/// Field types composed into one archetype must carry mutually exclusive
/// bits; this is validated at registration time.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldMask(u64);

impl FieldMask {
    /// Creates a mask from the given bit position (0..64).
    #[must_use]
    pub const fn from_bit(bit: u32) -> Self {
        Self(1 << (bit & 63))
    }

    /// Creates a mask from a raw value. Must have exactly one bit set to
    /// pass registration validation.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw mask value.
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Returns true if exactly one bit is set.
    #[must_use]
    pub const fn is_single_bit(self) -> bool {
        self.0 != 0 && self.0 & (self.0 - 1) == 0
    }
}

impl fmt::Debug for FieldMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldMask({:#x})", self.0)
    }
}

/// An archetype schema signature: the bitwise OR of its field masks.
///
/// Signatures are the registry's lookup key and must be unique across
/// registered archetypes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Signature(u64);

impl Signature {
    /// The empty signature.
    pub const EMPTY: Self = Self(0);

    /// Creates a signature from a raw bitset.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bitset.
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Returns this signature with the given field mask added.
    #[must_use]
    pub const fn with(self, mask: FieldMask) -> Self {
        Self(self.0 | mask.0)
    }

    /// Returns true if this signature includes the given field mask.
    #[must_use]
    pub const fn contains(self, mask: FieldMask) -> bool {
        self.0 & mask.0 == mask.0
    }

    /// Returns true if this signature includes every bit of `other`.
    #[must_use]
    pub const fn is_superset(self, other: Signature) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr<FieldMask> for Signature {
    type Output = Signature;

    fn bitor(self, rhs: FieldMask) -> Signature {
        self.with(rhs)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:#x})", self.0)
    }
}

/// Behavior flags declared per field type.
///
/// Flags are opt-outs from default engine behavior and are combined with
/// [`FieldFlags::union`] (or `|`-style chaining in const context).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldFlags(u64);

impl FieldFlags {
    /// No flags: default behavior on every axis.
    pub const NONE: Self = Self(0);
    /// Skip the default-value reset when a slot is freed; the slot keeps
    /// logical garbage until reused.
    pub const NO_RESET: Self = Self(0x01);
    /// Invoke the field's pre-destroy hook before a slot's data is reset.
    pub const PRE_DESTROY: Self = Self(0x02);
    /// The field serializes its whole column as raw bytes in one write.
    pub const SERIALIZE_POD: Self = Self(0x04);
    /// The field is never written to or read from a stream.
    pub const NEVER_SERIALIZE: Self = Self(0x08);

    /// Combines two flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns true if every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the raw flag bits.
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }
}

impl BitOr for FieldFlags {
    type Output = FieldFlags;

    fn bitor(self, rhs: Self) -> FieldFlags {
        self.union(rhs)
    }
}

impl fmt::Debug for FieldFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldFlags({:#x})", self.0)
    }
}
