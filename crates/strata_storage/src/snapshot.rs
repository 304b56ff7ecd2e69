//! The versioned snapshot protocol.
//!
//! Wire layout (all integers little-endian, current format version 2):
//!
//! ```text
//! stream         := u32 formatVersion, u32 archetypeCount, archetypeBlock*
//! archetypeBlock := u8 archetypeId, u32 payloadBytes, payload
//! payload        := stateArray, freeIndexArray, fieldBlock*, u8(0)
//! stateArray     := u32 count, count raw state bytes
//! freeIndexArray := u32 count, count u32 indices
//! fieldBlock     := u8 nameLen, name, u8 fieldVersion, u32 payloadBytes, payload
//! ```
//!
//! Size prefixes cover payload bytes only and are backpatched after the
//! payload is written. They are what makes the format forward
//! compatible: a loader skips whole archetype blocks it does not
//! recognize and (on version >= 2 streams) individual field blocks whose
//! name matches nothing. Version 1 streams carried no field-level size,
//! so an unrecognized field there is a hard error.
//!
//! Loading is destructive, not merging: a recognized archetype's state
//! and free arrays are fully replaced and every column is resized to
//! the loaded slot count before field blocks are processed. A failed
//! load leaves partially-loaded archetypes inconsistent; callers must
//! [`Registry::reset`] before reuse.

use std::any::Any;

use strata_foundation::{EntityId, Error, Result, SlotState, Stream};

use crate::archetype::Archetype;
use crate::handle::Handle;
use crate::observer::{SerializationEvent, SerializationEventKind, StoreObserver};
use crate::registry::Registry;

/// The newest stream format version this build writes and understands.
pub const FORMAT_VERSION: u32 = 2;

/// Writes a `u32` size placeholder, returning the position to patch.
fn begin_sized_block(stream: &mut dyn Stream) -> Result<u64> {
    let patch_at = stream.position();
    stream.write_u32(0)?;
    Ok(patch_at)
}

/// Backpatches a size prefix with the bytes written since the block
/// began, leaving the stream positioned at the block's end.
fn end_sized_block(stream: &mut dyn Stream, patch_at: u64, name: &str) -> Result<()> {
    let end = stream.position();
    let size = u32::try_from(end - (patch_at + 4))
        .map_err(|_| Error::field_block_too_large(name))?;
    stream.set_position(patch_at)?;
    stream.write_u32(size)?;
    stream.set_position(end)
}

impl Archetype {
    /// Writes this archetype's block: id, payload size, payload.
    ///
    /// A never-serialize archetype still writes its header, with an
    /// empty payload, so readers stay aligned.
    ///
    /// # Errors
    ///
    /// Propagates stream and field serialization failures.
    pub fn save(&self, stream: &mut dyn Stream, ctx: &mut dyn Any) -> Result<()> {
        self.save_block(stream, ctx, None)
    }

    pub(crate) fn save_block(
        &self,
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
        observer: Option<&mut (dyn StoreObserver + 'static)>,
    ) -> Result<()> {
        stream.write_u8(self.id())?;
        let patch_at = begin_sized_block(stream)?;
        if !self.never_serialize {
            self.save_payload(stream, ctx, observer)
                .map_err(|e| e.with_context(format!("archetype {}", self.name())))?;
        }
        end_sized_block(stream, patch_at, self.name())
    }

    fn save_payload(
        &self,
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
        mut observer: Option<&mut (dyn StoreObserver + 'static)>,
    ) -> Result<()> {
        stream.write_u32(self.states.len() as u32)?;
        for state in &self.states {
            stream.write_u8(state.to_bits())?;
        }
        stream.write_u32(self.free.len() as u32)?;
        for &index in &self.free {
            stream.write_u32(index)?;
        }

        for column in &self.columns {
            let info = *column.info();
            if let Some(obs) = observer.as_deref_mut() {
                obs.serialization_event(&SerializationEvent::field(
                    SerializationEventKind::SaveField,
                    self.id(),
                    info.version,
                    self.states.len() as u32,
                    info.mask.to_bits(),
                    info.name,
                ));
            }
            stream.write_u8(info.name.len() as u8)?;
            stream.write(info.name.as_bytes())?;
            stream.write_u8(info.version)?;
            let patch_at = begin_sized_block(stream)?;
            column.save_block(&self.states, stream, ctx)?;
            end_sized_block(stream, patch_at, info.name)?;
        }

        // Zero-length name terminates the field list.
        stream.write_u8(0)
    }

    pub(crate) fn load_payload(
        &mut self,
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
        format_version: u32,
        payload_bytes: u32,
        mut observer: Option<&mut (dyn StoreObserver + 'static)>,
    ) -> Result<()> {
        let block_end = stream.position() + u64::from(payload_bytes);
        if self.never_serialize {
            return stream.set_position(block_end);
        }

        let slot_count = stream.read_u32()? as usize;
        self.states.clear();
        self.states.reserve(slot_count);
        for _ in 0..slot_count {
            self.states.push(SlotState::from_bits(stream.read_u8()?));
        }
        let free_count = stream.read_u32()? as usize;
        self.free.clear();
        self.free.reserve(free_count);
        for _ in 0..free_count {
            self.free.push(stream.read_u32()?);
        }

        // Full replacement: every column takes the loaded slot count
        // before any field block is read.
        for column in &mut self.columns {
            column.resize_default(slot_count);
        }
        if self.can_reallocate() {
            self.capacity = self.capacity.max(slot_count);
        }

        let mut loaded = vec![false; self.columns.len()];
        loop {
            let name_len = stream.read_u8()?;
            if name_len == 0 {
                break;
            }
            let mut name_buf = vec![0u8; name_len as usize];
            stream.read(&mut name_buf)?;
            let field_version = stream.read_u8()?;
            let declared = if format_version >= 2 {
                Some(u64::from(stream.read_u32()?))
            } else {
                None
            };

            let matched = self
                .columns
                .iter()
                .position(|column| column.info().name.as_bytes() == name_buf.as_slice());
            match matched {
                Some(index) => {
                    let name = self.columns[index].info().name;
                    if loaded[index] {
                        return Err(Error::duplicate_field_block(name)
                            .with_context(format!("archetype {}", self.name())));
                    }
                    loaded[index] = true;
                    if let Some(obs) = observer.as_deref_mut() {
                        obs.serialization_event(&SerializationEvent::field(
                            SerializationEventKind::LoadField,
                            self.id(),
                            field_version,
                            slot_count as u32,
                            self.columns[index].info().mask.to_bits(),
                            name,
                        ));
                    }
                    let start = stream.position();
                    self.columns[index].load_block(&self.states, stream, ctx, field_version)?;
                    let consumed = stream.position() - start;
                    if let Some(declared) = declared {
                        if consumed > declared {
                            return Err(Error::field_block_overrun(name, declared, consumed));
                        }
                        if consumed < declared {
                            stream.skip(declared - consumed)?;
                        }
                    }
                }
                None => {
                    let name = String::from_utf8_lossy(&name_buf).into_owned();
                    match declared {
                        Some(size) => stream.skip(size)?,
                        None => return Err(Error::cannot_skip_field(name)),
                    }
                }
            }
        }

        if stream.position() != block_end {
            stream.set_position(block_end)?;
        }

        // Loaded slots took fresh identities.
        if !self.compressible {
            let archetype_id = self.id();
            for (index, state) in self.states.iter().enumerate() {
                if !state.is_empty() {
                    let handle = Handle::new(
                        archetype_id,
                        EntityId::from_index_and_state(index as u32, *state),
                    );
                    for column in &mut self.columns {
                        column.assign(index, handle);
                    }
                }
            }
        }
        Ok(())
    }

    /// Writes one entity's slot index and field values, unframed. The
    /// counterpart of [`Archetype::load_entity`] for callers moving
    /// single entities rather than whole stores.
    ///
    /// # Errors
    ///
    /// Fails on an unresolvable handle or a stream/field failure.
    pub fn save_entity(
        &self,
        handle: &Handle,
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
    ) -> Result<()> {
        if handle.archetype() != Some(self.id()) {
            return Err(Error::internal("entity handle names a different archetype"));
        }
        let slot = self
            .resolve(handle.id())
            .ok_or_else(|| Error::internal("entity handle does not resolve"))?;
        stream.write_u32(slot as u32)?;
        for column in &self.columns {
            column.save_slot(slot, self.states[slot], stream, ctx)?;
        }
        Ok(())
    }

    /// Re-materializes one entity written by [`Archetype::save_entity`]
    /// at its original slot index, running assignment hooks.
    ///
    /// # Errors
    ///
    /// Fails if the index is neither appendable nor free, if capacity
    /// is exhausted, or on a stream/field failure.
    pub fn load_entity(&mut self, stream: &mut dyn Stream, ctx: &mut dyn Any) -> Result<Handle> {
        let index = stream.read_u32()?;
        let id = self.create_at(index)?;
        if id.is_invalid() {
            return Err(Error::internal(format!(
                "no capacity to load entity at index {index}"
            )));
        }
        let slot = index as usize;
        let state = self.states[slot];
        for column in &mut self.columns {
            column.load_slot(slot, state, stream, ctx)?;
        }
        let handle = Handle::new(self.id(), id);
        for column in &mut self.columns {
            column.assign(slot, handle);
        }
        Ok(handle)
    }
}

impl Registry {
    /// Writes every registered archetype's block, in registration
    /// order, preceded by the format version and archetype count.
    ///
    /// `ctx` is an opaque user context passed through unmodified to
    /// every field's save routine.
    ///
    /// # Errors
    ///
    /// Propagates stream and field serialization failures.
    pub fn save(&mut self, stream: &mut dyn Stream, ctx: &mut dyn Any) -> Result<()> {
        let mut observer = self.observer.take();
        let result = self.save_inner(stream, ctx, observer.as_deref_mut());
        self.observer = observer;
        result
    }

    fn save_inner(
        &self,
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
        mut observer: Option<&mut (dyn StoreObserver + 'static)>,
    ) -> Result<()> {
        if let Some(obs) = observer.as_deref_mut() {
            obs.serialization_event(&SerializationEvent::registry(
                SerializationEventKind::SaveStart,
                FORMAT_VERSION,
                &self.name,
            ));
        }
        stream.write_u32(FORMAT_VERSION)?;
        stream.write_u32(self.archetypes.len() as u32)?;
        for archetype in &self.archetypes {
            archetype.save_block(stream, ctx, observer.as_deref_mut())?;
        }
        if let Some(obs) = observer.as_deref_mut() {
            obs.serialization_event(&SerializationEvent::registry(
                SerializationEventKind::SaveFinished,
                FORMAT_VERSION,
                &self.name,
            ));
        }
        Ok(())
    }

    /// Reads a stream written by [`Registry::save`]: resets every
    /// registered archetype to empty, loads recognized archetype blocks
    /// (skipping unrecognized ids by size), then runs maintenance on
    /// every archetype to pre-grow capacity for subsequent use.
    ///
    /// # Errors
    ///
    /// Fails on a newer-than-supported format version and on the
    /// format errors described at module level. A failed load leaves
    /// partially-loaded archetypes inconsistent; reset before reuse.
    pub fn load(&mut self, stream: &mut dyn Stream, ctx: &mut dyn Any) -> Result<()> {
        let mut observer = self.observer.take();
        let result = self.load_inner(stream, ctx, observer.as_deref_mut());
        self.observer = observer;
        result
    }

    fn load_inner(
        &mut self,
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
        mut observer: Option<&mut (dyn StoreObserver + 'static)>,
    ) -> Result<()> {
        let format_version = stream.read_u32()?;
        if format_version == 0 || format_version > FORMAT_VERSION {
            return Err(Error::unsupported_format_version(
                format_version,
                FORMAT_VERSION,
            ));
        }
        if let Some(obs) = observer.as_deref_mut() {
            obs.serialization_event(&SerializationEvent::registry(
                SerializationEventKind::LoadStart,
                format_version,
                &self.name,
            ));
        }

        for archetype in &mut self.archetypes {
            archetype.reset();
        }

        let archetype_count = stream.read_u32()?;
        for _ in 0..archetype_count {
            let id = stream.read_u8()?;
            let payload_bytes = stream.read_u32()?;
            let Some(archetype) = self.find_by_id_mut(id) else {
                stream.skip(u64::from(payload_bytes))?;
                continue;
            };
            if let Some(obs) = observer.as_deref_mut() {
                obs.serialization_event(&SerializationEvent::archetype(
                    SerializationEventKind::ArchetypeStart,
                    id,
                ));
            }
            archetype.load_payload(
                stream,
                ctx,
                format_version,
                payload_bytes,
                observer.as_deref_mut(),
            )?;
            if let Some(obs) = observer.as_deref_mut() {
                obs.serialization_event(&SerializationEvent::archetype(
                    SerializationEventKind::ArchetypeFinished,
                    id,
                ));
            }
        }

        self.perform_maintenance();
        if let Some(obs) = observer.as_deref_mut() {
            obs.serialization_event(&SerializationEvent::registry(
                SerializationEventKind::LoadFinished,
                format_version,
                &self.name,
            ));
        }
        Ok(())
    }
}
