//! Archetype slot management: allocation, removal, growth, compaction,
//! and maintenance heuristics.
//!
//! An archetype owns one storage container per declared field type, a
//! slot-state array, and a free-slot list, all at identical capacity.
//! Creating an entity never reallocates: when no capacity remains,
//! creation returns the invalid id and callers grow explicitly via
//! [`Archetype::reserve`]/[`Archetype::enlarge`] or the maintenance
//! heuristics, outside of any iteration.

use std::fmt;

use strata_foundation::{
    ArchetypeId, EntityId, Error, Result, Signature, SlotState, SLOT_INDEX_MAX,
};

use crate::column::AnyColumn;
use crate::column::ColumnData;
use crate::field::{validate_field_infos, Field, FieldInfo};
use crate::handle::Handle;
use crate::query::FieldSet;

/// Which container kind backs every column of an archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// Growable columns; capacity starts at zero and is raised by
    /// [`Archetype::reserve`] and [`Archetype::enlarge`].
    #[default]
    Dynamic,
    /// Fixed-capacity columns; the archetype can never hold more slots
    /// than declared here, and growth requests are no-ops.
    Fixed(usize),
}

/// Independent optional maintenance heuristics, evaluated once per
/// [`Archetype::perform_maintenance`] call.
///
/// Compaction policies only have an effect on compressible archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaintenancePolicy {
    /// Compact every N maintenance calls.
    pub compact_every_calls: Option<u32>,
    /// Compact once free-list length / capacity reaches this ratio.
    pub compact_free_ratio: Option<f32>,
    /// Enlarge once remaining capacity drops to/below this many slots.
    pub enlarge_slots_left: Option<u32>,
    /// Enlarge once slot count / capacity reaches this ratio.
    pub enlarge_full_ratio: Option<f32>,
}

/// Whether a tracked change created or removed a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The slot was created.
    Created,
    /// The slot was removed.
    Removed,
}

/// One tracked create/remove event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The id the slot carried when the event happened.
    pub id: EntityId,
    /// Created or removed.
    pub kind: ChangeKind,
}

struct ChangeLog {
    events: Vec<ChangeEvent>,
    enabled: bool,
}

impl ChangeLog {
    fn new() -> Self {
        Self {
            events: Vec::with_capacity(16),
            enabled: true,
        }
    }
}

type ColumnBuilder = Box<dyn FnOnce(StorageKind) -> Box<dyn AnyColumn>>;

/// Declaration-time description of an archetype: its field list,
/// storage kind, and policies. Consumed by
/// [`Registry::register`](crate::Registry::register).
#[derive(Default)]
pub struct ArchetypeSpec {
    storage: StorageKind,
    compressible: bool,
    never_serialize: bool,
    track_changes: bool,
    policy: MaintenancePolicy,
    builders: Vec<ColumnBuilder>,
}

impl ArchetypeSpec {
    /// Creates an empty spec with dynamic storage and no policies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field whose slots default to `F::default()`.
    #[must_use]
    pub fn field<F: Field + Default>(self) -> Self {
        self.field_with_default(F::default())
    }

    /// Adds a field with an explicit per-archetype default value.
    #[must_use]
    pub fn field_with_default<F: Field>(mut self, default: F) -> Self {
        self.builders.push(Box::new(move |storage| match storage {
            StorageKind::Dynamic => Box::new(crate::column::DynamicColumn::new(default)),
            StorageKind::Fixed(capacity) => {
                Box::new(crate::column::FixedColumn::new(default, capacity))
            }
        }));
        self
    }

    /// Selects the container kind backing every column.
    #[must_use]
    pub fn storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    /// Opts the archetype into compaction. Compaction and stable
    /// handles are mutually exclusive: a compressible archetype forgoes
    /// handle-based creation entirely and is meant for contiguous bulk
    /// iteration only.
    #[must_use]
    pub fn compressible(mut self) -> Self {
        self.compressible = true;
        self
    }

    /// Excludes the archetype from save/load entirely.
    #[must_use]
    pub fn never_serialize(mut self) -> Self {
        self.never_serialize = true;
        self
    }

    /// Enables create/remove change tracking.
    #[must_use]
    pub fn track_changes(mut self) -> Self {
        self.track_changes = true;
        self
    }

    /// Sets the maintenance heuristics.
    #[must_use]
    pub fn maintenance(mut self, policy: MaintenancePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub(crate) fn build(self, name: String, id: ArchetypeId) -> Result<Archetype> {
        let storage = self.storage;
        let columns: Vec<Box<dyn AnyColumn>> = self
            .builders
            .into_iter()
            .map(|builder| builder(storage))
            .collect();
        let infos: Vec<FieldInfo> = columns.iter().map(|column| *column.info()).collect();
        validate_field_infos(&infos).map_err(|e| e.with_context(format!("archetype {name}")))?;

        let signature = infos
            .iter()
            .fold(Signature::EMPTY, |sig, info| sig.with(info.mask));
        let capacity = match storage {
            StorageKind::Dynamic => 0,
            StorageKind::Fixed(capacity) => capacity,
        };

        Ok(Archetype {
            name,
            id,
            signature,
            columns,
            states: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            capacity,
            storage,
            compressible: self.compressible,
            never_serialize: self.never_serialize,
            policy: self.policy,
            maintenance_calls: 0,
            changes: self.track_changes.then(ChangeLog::new),
        })
    }
}

/// A fixed combination of field types sharing one parallel storage
/// block and one schema signature.
pub struct Archetype {
    name: String,
    id: ArchetypeId,
    signature: Signature,
    pub(crate) columns: Vec<Box<dyn AnyColumn>>,
    pub(crate) states: Vec<SlotState>,
    pub(crate) free: Vec<u32>,
    pub(crate) capacity: usize,
    storage: StorageKind,
    pub(crate) compressible: bool,
    pub(crate) never_serialize: bool,
    policy: MaintenancePolicy,
    maintenance_calls: u32,
    changes: Option<ChangeLog>,
}

impl Archetype {
    /// The archetype's human-readable name, fixed at registration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The archetype's numeric id, fixed at registration.
    #[must_use]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    /// The archetype's schema signature.
    #[must_use]
    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Which container kind backs this archetype's columns.
    #[must_use]
    pub fn storage_kind(&self) -> StorageKind {
        self.storage
    }

    /// True if this archetype may compact (and therefore never issues
    /// handles).
    #[must_use]
    pub fn is_compressible(&self) -> bool {
        self.compressible
    }

    /// Number of live (occupied) slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len() - self.free.len()
    }

    /// True if no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total slots in use, occupied or free (the length of every
    /// per-slot array).
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.states.len()
    }

    /// Current capacity, identical across every per-slot array.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of composed field types.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.columns.len()
    }

    /// Field description by position in declaration order.
    #[must_use]
    pub fn field_at(&self, index: usize) -> Option<&FieldInfo> {
        self.columns.get(index).map(|column| column.info())
    }

    /// Field description by mask.
    #[must_use]
    pub fn field_info(&self, mask: strata_foundation::FieldMask) -> Option<&FieldInfo> {
        self.columns
            .iter()
            .map(|column| column.info())
            .find(|info| info.mask == mask)
    }

    /// Sum of one slot's bytes across all fields.
    #[must_use]
    pub fn slot_bytes(&self) -> usize {
        self.columns
            .iter()
            .map(|column| column.info().slot_size)
            .sum()
    }

    /// True if every column can grow after construction.
    #[must_use]
    pub fn can_reallocate(&self) -> bool {
        self.columns.iter().all(|column| column.can_reallocate())
    }

    // ---------------------------------------------------------------
    // Slot allocation
    // ---------------------------------------------------------------

    /// Creates one entity, reusing the most-recently-freed slot when
    /// available, appending otherwise.
    ///
    /// Returns [`EntityId::INVALID`] when no free slot and no capacity
    /// remains; storage is never reallocated by this call.
    pub fn create(&mut self) -> EntityId {
        match self.free.pop() {
            Some(index) => self.reuse_slot(index),
            None => self.append_slot(),
        }
    }

    /// Creates one entity at a specific slot index, used to preserve
    /// original indices when re-materializing saved entities.
    ///
    /// An index equal to the current slot count appends (same capacity
    /// rules as [`Archetype::create`]); any other index must currently
    /// be in the free list.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidRequestedIndex`](strata_foundation::ErrorKind::InvalidRequestedIndex)
    /// if the index is neither the append position nor free.
    pub fn create_at(&mut self, index: u32) -> Result<EntityId> {
        if index as usize == self.states.len() {
            return Ok(self.append_slot());
        }
        let position = self
            .free
            .iter()
            .rposition(|&free_index| free_index == index)
            .ok_or_else(|| Error::invalid_requested_index(index))?;
        self.free.swap_remove(position);
        Ok(self.reuse_slot(index))
    }

    fn append_slot(&mut self) -> EntityId {
        if self.states.len() >= self.capacity || self.states.len() > SLOT_INDEX_MAX as usize {
            return EntityId::INVALID;
        }
        let index = self.states.len() as u32;
        for column in &mut self.columns {
            column.push_default();
        }
        self.states.push(SlotState::FIRST);
        let id = EntityId::from_parts(index, SlotState::FIRST.version());
        self.record_change(id, ChangeKind::Created);
        id
    }

    fn reuse_slot(&mut self, index: u32) -> EntityId {
        let slot = index as usize;
        debug_assert!(self.states[slot].is_empty());
        let state = self.states[slot].reoccupied();
        self.states[slot] = state;
        for column in &mut self.columns {
            column.reset_slot(slot);
        }
        let id = EntityId::from_index_and_state(index, state);
        self.record_change(id, ChangeKind::Created);
        id
    }

    /// Creates one entity and wraps it in a handle, running every
    /// field's entity-assignment hook.
    ///
    /// Returns [`Handle::EMPTY`] when the archetype is full or
    /// compressible (compressible archetypes never issue handles,
    /// because compaction would silently invalidate them).
    pub fn create_handle(&mut self) -> Handle {
        if self.compressible {
            return Handle::EMPTY;
        }
        let id = self.create();
        if id.is_invalid() {
            return Handle::EMPTY;
        }
        let handle = Handle::new(self.id, id);
        let slot = id.index() as usize;
        for column in &mut self.columns {
            column.assign(slot, handle);
        }
        handle
    }

    /// Removes the slot at `index`.
    ///
    /// Silently returns if the slot is already empty or out of range,
    /// so double-removal is safe. The slot's version is incremented
    /// (wrapping 127 to 1, never 0) before the index is pushed onto the
    /// free list, then each field runs its pre-destroy hook (if opted
    /// in) and is reset to its default (unless opted out).
    pub fn remove(&mut self, index: u32) {
        let slot = index as usize;
        let Some(&state) = self.states.get(slot) else {
            return;
        };
        if state.is_empty() {
            return;
        }
        self.record_change(EntityId::from_index_and_state(index, state), ChangeKind::Removed);
        self.states[slot] = SlotState::vacant(state.next_version());
        self.free.push(index);
        for column in &mut self.columns {
            column.pre_destroy(slot);
        }
        for column in &mut self.columns {
            column.reset_slot(slot);
        }
    }

    /// Removes the slot a handle points at, then clears the handle.
    ///
    /// This is idempotent by construction, not by re-checking validity:
    /// a stale handle's index may coincide with a newer live slot, so
    /// callers who can hold stale handles must [`Archetype::validate`]
    /// first if removing the wrong occupant matters.
    pub fn remove_handle(&mut self, handle: &mut Handle) {
        if handle.archetype() == Some(self.id) {
            self.remove(handle.id().index());
        }
        handle.clear();
    }

    /// Duplicates the slot a handle points at into a fresh slot,
    /// copying every field value (bypassing defaults) and running
    /// assignment hooks on the copy.
    ///
    /// Returns [`Handle::EMPTY`] if the source is invalid or no
    /// capacity remains.
    pub fn duplicate(&mut self, source: &Handle) -> Handle {
        if self.compressible || source.archetype() != Some(self.id) {
            return Handle::EMPTY;
        }
        let Some(source_slot) = self.resolve(source.id()) else {
            return Handle::EMPTY;
        };
        let id = self.create();
        if id.is_invalid() {
            return Handle::EMPTY;
        }
        let target_slot = id.index() as usize;
        for column in &mut self.columns {
            column.copy_slot(target_slot, source_slot);
        }
        let handle = Handle::new(self.id, id);
        for column in &mut self.columns {
            column.assign(target_slot, handle);
        }
        handle
    }

    // ---------------------------------------------------------------
    // Handle resolution
    // ---------------------------------------------------------------

    /// Fully validates a handle: correct archetype, index in the live
    /// range, slot not empty, and carried version equal to the slot's
    /// current version. No side effects.
    #[must_use]
    pub fn validate(&self, handle: &Handle) -> bool {
        handle.archetype() == Some(self.id) && self.resolve(handle.id()).is_some()
    }

    pub(crate) fn resolve(&self, id: EntityId) -> Option<usize> {
        let slot = id.index() as usize;
        let state = self.states.get(slot)?;
        (!state.is_empty() && state.version() == id.version()).then_some(slot)
    }

    /// Returns the field value a handle points at, or `None` if the
    /// archetype lacks that field or the handle does not resolve.
    #[must_use]
    pub fn get<F: Field>(&self, handle: &Handle) -> Option<&F> {
        if handle.archetype() != Some(self.id) {
            return None;
        }
        let slot = self.resolve(handle.id())?;
        self.column_data::<F>()?.data.get(slot)
    }

    /// Mutable variant of [`Archetype::get`].
    #[must_use]
    pub fn get_mut<F: Field>(&mut self, handle: &Handle) -> Option<&mut F> {
        if handle.archetype() != Some(self.id) {
            return None;
        }
        let slot = self.resolve(handle.id())?;
        self.column_data_mut::<F>()?.data.get_mut(slot)
    }

    /// Like [`Archetype::get`], asserting the field exists.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not resolve or the archetype lacks `F`.
    #[must_use]
    pub fn fetch<F: Field>(&self, handle: &Handle) -> &F {
        self.get(handle)
            .unwrap_or_else(|| panic!("fetch of field `{}` failed", F::NAME))
    }

    /// Mutable variant of [`Archetype::fetch`].
    ///
    /// # Panics
    ///
    /// Panics if the handle does not resolve or the archetype lacks `F`.
    #[must_use]
    pub fn fetch_mut<F: Field>(&mut self, handle: &Handle) -> &mut F {
        self.get_mut(handle)
            .unwrap_or_else(|| panic!("fetch of field `{}` failed", F::NAME))
    }

    /// Direct slice access to one field's column (all slots, empty
    /// included). `None` if the archetype lacks the field.
    #[must_use]
    pub fn column<F: Field>(&self) -> Option<&[F]> {
        Some(self.column_data::<F>()?.data.as_slice())
    }

    /// Mutable variant of [`Archetype::column`].
    #[must_use]
    pub fn column_mut<F: Field>(&mut self) -> Option<&mut [F]> {
        Some(self.column_data_mut::<F>()?.data.as_mut_slice())
    }

    fn column_data<F: Field>(&self) -> Option<&ColumnData<F>> {
        self.columns
            .iter()
            .find(|column| column.info().mask == F::MASK)?
            .data_any()
            .downcast_ref()
    }

    fn column_data_mut<F: Field>(&mut self) -> Option<&mut ColumnData<F>> {
        self.columns
            .iter_mut()
            .find(|column| column.info().mask == F::MASK)?
            .data_any_mut()
            .downcast_mut()
    }

    // ---------------------------------------------------------------
    // Growth, compaction, maintenance
    // ---------------------------------------------------------------

    /// Raises capacity to at least `capacity` slots across every
    /// per-slot array. No-op for fixed storage. Must never be called
    /// while iterating or holding field references.
    pub fn reserve(&mut self, capacity: usize) {
        if !self.can_reallocate() || capacity <= self.capacity {
            return;
        }
        for column in &mut self.columns {
            column.reserve(capacity);
        }
        self.states.reserve_exact(capacity - self.states.len());
        self.free.reserve_exact(capacity.saturating_sub(self.free.len()));
        self.capacity = capacity;
    }

    /// Doubles capacity. No-op for fixed storage, and for archetypes
    /// that never reserved (zero capacity doubles to zero).
    pub fn enlarge(&mut self) {
        self.reserve(self.capacity * 2);
    }

    /// Eliminates free slots by relocating live tail data into the
    /// lowest-numbered holes, then re-running each moved slot's
    /// entity-assignment hook (some field types cache their own
    /// handle). Only compressible archetypes relocate; for others the
    /// single legal effect is clearing a fully-empty archetype.
    ///
    /// Live count is unchanged by this operation.
    pub fn compact(&mut self) {
        let live = self.len();
        if live == 0 {
            for column in &mut self.columns {
                column.clear();
            }
            self.states.clear();
            self.free.clear();
            return;
        }
        if !self.compressible || self.free.is_empty() {
            return;
        }

        self.free.sort_unstable();
        let mut next_hole = 0usize;
        let mut holes_end = self.free.len();

        while next_hole < holes_end {
            if self.free[holes_end - 1] as usize == self.states.len() - 1 {
                // Trailing hole: drop the tail without moving data.
                holes_end -= 1;
                self.states.pop();
                for column in &mut self.columns {
                    column.pop();
                }
                continue;
            }

            let hole = self.free[next_hole] as usize;
            next_hole += 1;
            let state = self.states[self.states.len() - 1];
            for column in &mut self.columns {
                column.move_tail_into(hole);
            }
            self.states[hole] = state;
            self.states.pop();
            let handle = Handle::new(
                self.id,
                EntityId::from_index_and_state(hole as u32, state),
            );
            for column in &mut self.columns {
                column.assign(hole, handle);
            }
        }

        self.free.clear();
        debug_assert_eq!(live, self.len());
    }

    /// Applies the configured maintenance heuristics once. Intended to
    /// be invoked by the caller once per tick, never concurrently with
    /// iteration.
    #[allow(clippy::cast_precision_loss)]
    pub fn perform_maintenance(&mut self) {
        let mut want_compact = false;
        if let Some(every) = self.policy.compact_every_calls {
            self.maintenance_calls += 1;
            if self.maintenance_calls >= every {
                self.maintenance_calls = 0;
                want_compact = true;
            }
        }
        if let Some(threshold) = self.policy.compact_free_ratio {
            if self.capacity > 0 && self.free.len() as f32 / self.capacity as f32 >= threshold {
                want_compact = true;
            }
        }
        if want_compact {
            self.compact();
        }

        let mut want_enlarge = false;
        if let Some(slots_left) = self.policy.enlarge_slots_left {
            if self.capacity.saturating_sub(self.len()) <= slots_left as usize {
                want_enlarge = true;
            }
        }
        if let Some(threshold) = self.policy.enlarge_full_ratio {
            if self.capacity > 0 && self.states.len() as f32 / self.capacity as f32 >= threshold {
                want_enlarge = true;
            }
        }
        if want_enlarge {
            self.enlarge();
        }
    }

    /// Throws away all slot data. Capacity is retained; outstanding
    /// handles become meaningless.
    pub fn reset(&mut self) {
        for column in &mut self.columns {
            column.clear();
        }
        self.states.clear();
        self.free.clear();
        self.clear_tracked_changes();
    }

    // ---------------------------------------------------------------
    // Iteration
    // ---------------------------------------------------------------

    /// Visits every occupied slot in slot-index order with mutable
    /// references to the requested fields. Does nothing if any
    /// requested field is absent from this archetype.
    pub fn for_each<S: FieldSet>(&mut self, mut visit: impl FnMut(S::Row<'_>)) {
        self.for_each_rows::<S, _>(&mut visit);
    }

    pub(crate) fn for_each_rows<S: FieldSet, V>(&mut self, visit: &mut V)
    where
        V: FnMut(S::Row<'_>),
    {
        let Some(mut slices) = S::slices(&mut self.columns) else {
            return;
        };
        for (index, state) in self.states.iter().enumerate() {
            if !state.is_empty() {
                visit(S::row(&mut slices, index));
            }
        }
    }

    /// Like [`Archetype::for_each`], also passing a freshly constructed
    /// handle for each slot.
    pub fn for_each_with_handle<S: FieldSet>(
        &mut self,
        mut visit: impl FnMut(Handle, S::Row<'_>),
    ) {
        self.for_each_rows_with_handle::<S, _>(&mut visit);
    }

    pub(crate) fn for_each_rows_with_handle<S: FieldSet, V>(&mut self, visit: &mut V)
    where
        V: FnMut(Handle, S::Row<'_>),
    {
        let archetype_id = self.id;
        let Some(mut slices) = S::slices(&mut self.columns) else {
            return;
        };
        for (index, state) in self.states.iter().enumerate() {
            if !state.is_empty() {
                let handle = Handle::new(
                    archetype_id,
                    EntityId::from_index_and_state(index as u32, *state),
                );
                visit(handle, S::row(&mut slices, index));
            }
        }
    }

    /// Visits every occupied slot's handle in slot-index order.
    pub fn for_each_handle(&self, mut visit: impl FnMut(Handle)) {
        for (index, state) in self.states.iter().enumerate() {
            if !state.is_empty() {
                visit(Handle::new(
                    self.id,
                    EntityId::from_index_and_state(index as u32, *state),
                ));
            }
        }
    }

    // ---------------------------------------------------------------
    // Change tracking
    // ---------------------------------------------------------------

    /// Tracked create/remove events since the last clear. Always empty
    /// for archetypes declared without tracking.
    #[must_use]
    pub fn tracked_changes(&self) -> &[ChangeEvent] {
        self.changes
            .as_ref()
            .map_or(&[], |log| log.events.as_slice())
    }

    /// Clears the tracked change list.
    pub fn clear_tracked_changes(&mut self) {
        if let Some(log) = &mut self.changes {
            log.events.clear();
        }
    }

    /// Pauses or resumes change tracking (tracking archetypes only).
    pub fn set_tracking(&mut self, enabled: bool) {
        if let Some(log) = &mut self.changes {
            log.enabled = enabled;
        }
    }

    fn record_change(&mut self, id: EntityId, kind: ChangeKind) {
        if let Some(log) = &mut self.changes {
            if log.enabled {
                log.events.push(ChangeEvent { id, kind });
            }
        }
    }
}

impl fmt::Debug for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Archetype({} id={} live={}/{} capacity={})",
            self.name,
            self.id,
            self.len(),
            self.slot_count(),
            self.capacity
        )
    }
}
