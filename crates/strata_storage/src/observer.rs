//! The passive notification boundary.
//!
//! An observer attached to a [`Registry`](crate::Registry) receives
//! structured events about registration and serialization progress,
//! carrying counts, masks, names, and versions for diagnostics. The
//! engine injects the sink at construction; there is no process-wide
//! logging state. Observers are strictly passive and must not mutate
//! engine state from within a callback.

use strata_foundation::{ArchetypeId, Signature};

/// What a [`SerializationEvent`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationEventKind {
    /// A whole-registry load began.
    LoadStart,
    /// A whole-registry load finished.
    LoadFinished,
    /// A whole-registry save began.
    SaveStart,
    /// A whole-registry save finished.
    SaveFinished,
    /// One archetype's block is about to be loaded.
    ArchetypeStart,
    /// One archetype's block finished loading.
    ArchetypeFinished,
    /// One field block is about to be written.
    SaveField,
    /// One field block is about to be read.
    LoadField,
}

/// A structured diagnostics event emitted during save/load.
#[derive(Debug, Clone, Copy)]
pub struct SerializationEvent<'a> {
    /// The event kind.
    pub kind: SerializationEventKind,
    /// The archetype this event applies to, if any.
    pub archetype: ArchetypeId,
    /// A version relevant to the event: the stream format version for
    /// start events, the field schema version for field events.
    pub version: u32,
    /// Slot count for field events.
    pub slot_count: u32,
    /// The field's mask bits for field events.
    pub mask: u64,
    /// A name relevant to the event: registry name or field name.
    pub name: Option<&'a str>,
}

impl<'a> SerializationEvent<'a> {
    pub(crate) fn registry(kind: SerializationEventKind, version: u32, name: &'a str) -> Self {
        Self {
            kind,
            archetype: 0,
            version,
            slot_count: 0,
            mask: 0,
            name: Some(name),
        }
    }

    pub(crate) fn archetype(kind: SerializationEventKind, archetype: ArchetypeId) -> Self {
        Self {
            kind,
            archetype,
            version: 0,
            slot_count: 0,
            mask: 0,
            name: None,
        }
    }

    pub(crate) fn field(
        kind: SerializationEventKind,
        archetype: ArchetypeId,
        version: u8,
        slot_count: u32,
        mask: u64,
        name: &'a str,
    ) -> Self {
        Self {
            kind,
            archetype,
            version: u32::from(version),
            slot_count,
            mask,
            name: Some(name),
        }
    }
}

/// Summary of a freshly registered archetype.
#[derive(Debug, Clone, Copy)]
pub struct ArchetypeSummary<'a> {
    /// The archetype's human-readable name.
    pub name: &'a str,
    /// The archetype's numeric id.
    pub id: ArchetypeId,
    /// The archetype's schema signature.
    pub signature: Signature,
    /// How many field types the archetype composes.
    pub field_count: usize,
}

/// A passive diagnostics sink attached to a registry.
pub trait StoreObserver {
    /// Called once when an archetype is registered.
    fn archetype_registered(&mut self, summary: &ArchetypeSummary<'_>);

    /// Called for every step of save/load progress.
    fn serialization_event(&mut self, event: &SerializationEvent<'_>);
}
