//! Stable-but-revocable entity handles.

use std::fmt;

use strata_foundation::{ArchetypeId, EntityId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An opaque (archetype, id) pair referencing one slot.
///
/// Handles are non-owning: they become meaningless once their archetype
/// is reset or the registry is destroyed. A handle carrying no archetype
/// is "empty"; a handle fully validates only through
/// [`Archetype::validate`](crate::Archetype::validate) or
/// [`Registry::validate`](crate::Registry::validate), which check the
/// slot's current version against the one encoded in the id — that is
/// what makes stale handles detectably invalid rather than silently
/// aliasing newer data.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Handle {
    archetype: Option<ArchetypeId>,
    id: EntityId,
}

impl Handle {
    /// The empty handle: no archetype, invalid id.
    pub const EMPTY: Self = Self {
        archetype: None,
        id: EntityId::INVALID,
    };

    /// Creates a handle for a slot in the given archetype.
    #[must_use]
    pub const fn new(archetype: ArchetypeId, id: EntityId) -> Self {
        Self {
            archetype: Some(archetype),
            id,
        }
    }

    /// Returns the numeric archetype id, or `None` for an empty handle.
    #[must_use]
    pub const fn archetype(self) -> Option<ArchetypeId> {
        self.archetype
    }

    /// Returns the entity id carried by this handle.
    #[must_use]
    pub const fn id(self) -> EntityId {
        self.id
    }

    /// Returns true if this handle carries no archetype reference.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.archetype.is_none()
    }

    /// Clears this handle to empty.
    pub fn clear(&mut self) {
        *self = Self::EMPTY;
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.archetype {
            Some(archetype) => write!(f, "Handle(a{} {:?})", archetype, self.id),
            None => write!(f, "Handle(empty)"),
        }
    }
}
