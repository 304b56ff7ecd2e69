//! The archetype registry: ownership, lookup, and cross-archetype
//! iteration.
//!
//! A registry owns every registered archetype, keyed both by schema
//! signature (lookup and dedup) and by numeric id (serialization).
//! Archetypes are exclusively owned; callers get references for direct
//! manipulation and non-owning [`Handle`]s for individual slots.

use std::fmt;

use strata_foundation::{ArchetypeId, Error, Result, Signature};

use crate::archetype::{Archetype, ArchetypeSpec};
use crate::field::Field;
use crate::handle::Handle;
use crate::observer::{ArchetypeSummary, StoreObserver};
use crate::query::FieldSet;

/// How much detail [`Registry::dump`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpMode {
    /// One line for the whole registry.
    OneLine,
    /// One line per archetype, with per-field detail.
    Normal,
}

/// Owns all registered archetypes and orchestrates lookup, iteration,
/// maintenance, and whole-store save/load.
pub struct Registry {
    pub(crate) name: String,
    pub(crate) archetypes: Vec<Archetype>,
    by_id: [Option<u8>; 256],
    pub(crate) observer: Option<Box<dyn StoreObserver>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            archetypes: Vec::new(),
            by_id: [None; 256],
            observer: None,
        }
    }

    /// Creates an empty registry with a diagnostics observer attached.
    #[must_use]
    pub fn with_observer(name: impl Into<String>, observer: Box<dyn StoreObserver>) -> Self {
        let mut registry = Self::new(name);
        registry.observer = Some(observer);
        registry
    }

    /// Attaches or detaches the diagnostics observer.
    pub fn set_observer(&mut self, observer: Option<Box<dyn StoreObserver>>) {
        self.observer = observer;
    }

    /// The registry's name, used in diagnostics and dumps.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of registered archetypes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// True if no archetype is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Registers an archetype built from `spec` under a fixed name and
    /// numeric id, returning a reference usable for direct manipulation.
    ///
    /// # Errors
    ///
    /// Fails on malformed field declarations, on a schema signature
    /// already registered, or on a numeric id already taken. The
    /// registry remains usable after a failed registration.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        id: ArchetypeId,
        spec: ArchetypeSpec,
    ) -> Result<&mut Archetype> {
        let archetype = spec.build(name.into(), id)?;

        if self
            .archetypes
            .iter()
            .any(|existing| existing.signature() == archetype.signature())
        {
            return Err(Error::duplicate_signature(archetype.signature())
                .with_context(archetype.name()));
        }
        if self.by_id[id as usize].is_some() {
            return Err(Error::duplicate_archetype_id(id).with_context(archetype.name()));
        }

        if let Some(observer) = &mut self.observer {
            observer.archetype_registered(&ArchetypeSummary {
                name: archetype.name(),
                id,
                signature: archetype.signature(),
                field_count: archetype.field_count(),
            });
        }

        self.by_id[id as usize] = Some(self.archetypes.len() as u8);
        self.archetypes.push(archetype);
        Ok(self.archetypes.last_mut().unwrap_or_else(|| unreachable!()))
    }

    /// Looks up an archetype by exact schema signature.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ArchetypeNotFound`](strata_foundation::ErrorKind::ArchetypeNotFound)
    /// if no archetype carries that signature.
    pub fn find(&self, signature: Signature) -> Result<&Archetype> {
        self.archetypes
            .iter()
            .find(|archetype| archetype.signature() == signature)
            .ok_or_else(|| Error::archetype_not_found(signature))
    }

    /// Mutable variant of [`Registry::find`].
    ///
    /// # Errors
    ///
    /// Same as [`Registry::find`].
    pub fn find_mut(&mut self, signature: Signature) -> Result<&mut Archetype> {
        self.archetypes
            .iter_mut()
            .find(|archetype| archetype.signature() == signature)
            .ok_or_else(|| Error::archetype_not_found(signature))
    }

    /// Looks up the archetype whose signature is exactly the requested
    /// field set's signature.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::find`].
    pub fn find_set<S: FieldSet>(&self) -> Result<&Archetype> {
        self.find(S::SIGNATURE)
    }

    /// Mutable variant of [`Registry::find_set`].
    ///
    /// # Errors
    ///
    /// Same as [`Registry::find`].
    pub fn find_set_mut<S: FieldSet>(&mut self) -> Result<&mut Archetype> {
        self.find_mut(S::SIGNATURE)
    }

    /// O(1) lookup by numeric id.
    #[must_use]
    pub fn find_by_id(&self, id: ArchetypeId) -> Option<&Archetype> {
        let index = self.by_id[id as usize]?;
        self.archetypes.get(index as usize)
    }

    /// Mutable variant of [`Registry::find_by_id`].
    #[must_use]
    pub fn find_by_id_mut(&mut self, id: ArchetypeId) -> Option<&mut Archetype> {
        let index = self.by_id[id as usize]?;
        self.archetypes.get_mut(index as usize)
    }

    /// Registered archetypes in registration order.
    pub fn archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    /// Mutable variant of [`Registry::archetypes`].
    pub fn archetypes_mut(&mut self) -> impl Iterator<Item = &mut Archetype> {
        self.archetypes.iter_mut()
    }

    // ---------------------------------------------------------------
    // Cross-archetype iteration
    // ---------------------------------------------------------------

    /// Visits every occupied slot of every archetype whose signature is
    /// a superset of the requested field set, in registration order
    /// across archetypes and slot-index order within each. The only
    /// filtering is the mask-superset match.
    pub fn for_each<S: FieldSet>(&mut self, mut visit: impl FnMut(S::Row<'_>)) {
        for archetype in &mut self.archetypes {
            if archetype.signature().is_superset(S::SIGNATURE) {
                archetype.for_each_rows::<S, _>(&mut visit);
            }
        }
    }

    /// Like [`Registry::for_each`], also passing a freshly constructed
    /// handle for each slot.
    pub fn for_each_with_handle<S: FieldSet>(&mut self, mut visit: impl FnMut(Handle, S::Row<'_>)) {
        for archetype in &mut self.archetypes {
            if archetype.signature().is_superset(S::SIGNATURE) {
                archetype.for_each_rows_with_handle::<S, _>(&mut visit);
            }
        }
    }

    // ---------------------------------------------------------------
    // Handle routing
    // ---------------------------------------------------------------

    /// Fully validates a handle against its archetype. Empty handles
    /// and handles naming an unregistered archetype are invalid.
    #[must_use]
    pub fn validate(&self, handle: &Handle) -> bool {
        self.archetype_for(handle)
            .is_some_and(|archetype| archetype.validate(handle))
    }

    /// Returns the field value a handle points at, routed through the
    /// handle's archetype.
    #[must_use]
    pub fn get<F: Field>(&self, handle: &Handle) -> Option<&F> {
        self.archetype_for(handle)?.get(handle)
    }

    /// Mutable variant of [`Registry::get`].
    #[must_use]
    pub fn get_mut<F: Field>(&mut self, handle: &Handle) -> Option<&mut F> {
        self.archetype_for_mut(handle)?.get_mut(handle)
    }

    /// Removes the slot a handle points at and clears the handle.
    /// Handles naming an unregistered archetype are just cleared.
    pub fn remove_handle(&mut self, handle: &mut Handle) {
        if let Some(archetype) = self.archetype_for_mut(&*handle) {
            archetype.remove_handle(handle);
        } else {
            handle.clear();
        }
    }

    /// Duplicates the slot a handle points at within its archetype.
    /// Returns [`Handle::EMPTY`] on an invalid source or a full
    /// archetype.
    pub fn duplicate(&mut self, source: &Handle) -> Handle {
        self.archetype_for_mut(source)
            .map_or(Handle::EMPTY, |archetype| archetype.duplicate(source))
    }

    fn archetype_for(&self, handle: &Handle) -> Option<&Archetype> {
        self.find_by_id(handle.archetype()?)
    }

    fn archetype_for_mut(&mut self, handle: &Handle) -> Option<&mut Archetype> {
        self.find_by_id_mut(handle.archetype()?)
    }

    // ---------------------------------------------------------------
    // Whole-store operations
    // ---------------------------------------------------------------

    /// Forwards to every archetype's maintenance routine, in
    /// registration order.
    pub fn perform_maintenance(&mut self) {
        for archetype in &mut self.archetypes {
            archetype.perform_maintenance();
        }
    }

    /// Resets every archetype to empty. Registrations are kept;
    /// outstanding handles become meaningless. This is the required
    /// recovery step after a failed load.
    pub fn reset(&mut self) {
        for archetype in &mut self.archetypes {
            archetype.reset();
        }
    }

    /// Total live entities across all archetypes.
    #[must_use]
    pub fn count_entities(&self) -> usize {
        self.archetypes.iter().map(Archetype::len).sum()
    }

    /// Writes a human-readable occupancy summary.
    ///
    /// # Errors
    ///
    /// Propagates formatter errors from `sink`.
    pub fn dump(&self, mode: DumpMode, sink: &mut dyn fmt::Write) -> fmt::Result {
        match mode {
            DumpMode::OneLine => {
                write!(sink, "{}:", self.name)?;
                for archetype in &self.archetypes {
                    write!(
                        sink,
                        " {}={}/{}",
                        archetype.name(),
                        archetype.len(),
                        archetype.capacity()
                    )?;
                }
                writeln!(sink, " total={}", self.count_entities())
            }
            DumpMode::Normal => {
                writeln!(
                    sink,
                    "{}: {} archetypes, {} entities",
                    self.name,
                    self.archetypes.len(),
                    self.count_entities()
                )?;
                for archetype in &self.archetypes {
                    writeln!(
                        sink,
                        "  [{}] {}: {} live, {} slots, {} capacity, {} bytes/slot",
                        archetype.id(),
                        archetype.name(),
                        archetype.len(),
                        archetype.slot_count(),
                        archetype.capacity(),
                        archetype.slot_bytes()
                    )?;
                    for index in 0..archetype.field_count() {
                        if let Some(info) = archetype.field_at(index) {
                            writeln!(
                                sink,
                                "    {} v{} mask={:#x} {}B",
                                info.name,
                                info.version,
                                info.mask.to_bits(),
                                info.slot_size
                            )?;
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = String::new();
        self.dump(DumpMode::OneLine, &mut line)?;
        f.write_str(line.trim_end())
    }
}
