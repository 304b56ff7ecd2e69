//! The field-type contract.
//!
//! Every typed column an archetype stores is declared by implementing
//! [`Field`]. The contract is a closed capability interface: a unique
//! name, a unique single-bit mask, a schema version byte, behavior
//! flags, and (unless opted out) symmetric save/load routines against
//! the [`Stream`] boundary. Hooks for entity assignment and pre-destroy
//! are optional and default to no-ops.

use std::any::Any;

use strata_foundation::{Error, FieldFlags, FieldMask, Result, SlotState, Stream};

use crate::handle::Handle;

/// A typed column participating in an archetype.
///
/// Implementations must be `Clone` so slots can be initialized from the
/// archetype's configured default value and copied on duplication.
///
/// The save/load routines receive an opaque user context passed through
/// the registry's save/load entry points unmodified; the engine never
/// interprets it.
pub trait Field: Clone + Sized + 'static {
    /// Unique human-readable name, 1..=255 bytes. This is the schema
    /// matching key on the wire.
    const NAME: &'static str;

    /// Unique single-bit mask. Fields composed into one archetype must
    /// carry mutually exclusive bits.
    const MASK: FieldMask;

    /// Small integer schema version written next to every field block.
    const VERSION: u8 = 0;

    /// Behavior flags; see [`FieldFlags`].
    const FLAGS: FieldFlags = FieldFlags::NONE;

    /// Serializes one slot's value.
    ///
    /// Required unless the field is flagged `NEVER_SERIALIZE` or
    /// overrides [`Field::save_column`] with the POD fast path.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream rejects the write.
    fn save_slot(&self, _stream: &mut dyn Stream, _ctx: &mut dyn Any) -> Result<()> {
        Err(Error::internal(format!(
            "field `{}` has no save routine",
            Self::NAME
        )))
    }

    /// Deserializes one slot's value. `version` is the schema version
    /// the data was written with; implementations decide how to read
    /// older shapes.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream data is malformed or exhausted.
    fn load_slot(&mut self, _stream: &mut dyn Stream, _ctx: &mut dyn Any, _version: u8) -> Result<()> {
        Err(Error::internal(format!(
            "field `{}` has no load routine",
            Self::NAME
        )))
    }

    /// Called once per slot right after creation, duplication,
    /// deserialization, or compaction relocation, so the field can
    /// remember which entity it belongs to.
    fn assigned(&mut self, _handle: Handle) {}

    /// Called once right before a slot's data is reset on removal.
    /// Only invoked when the field is flagged `PRE_DESTROY`.
    fn pre_destroy(&mut self) {}

    /// Serializes a whole column: by default, every occupied slot in
    /// slot order via [`Field::save_slot`], skipping empty slots.
    ///
    /// POD fields override this with [`save_pod_column`].
    ///
    /// # Errors
    ///
    /// Propagates slot-level failures.
    fn save_column(
        column: &[Self],
        states: &[SlotState],
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
    ) -> Result<()> {
        for (slot, state) in column.iter().zip(states) {
            if !state.is_empty() {
                slot.save_slot(stream, ctx)?;
            }
        }
        Ok(())
    }

    /// Deserializes a whole column: by default, every occupied slot in
    /// slot order via [`Field::load_slot`], skipping empty slots.
    ///
    /// POD fields override this with [`load_pod_column`].
    ///
    /// # Errors
    ///
    /// Propagates slot-level failures.
    fn load_column(
        column: &mut [Self],
        states: &[SlotState],
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
        version: u8,
    ) -> Result<()> {
        for (slot, state) in column.iter_mut().zip(states) {
            if !state.is_empty() {
                slot.load_slot(stream, ctx, version)?;
            }
        }
        Ok(())
    }
}

/// Writes a whole column as raw bytes in one write, empty slots
/// included. This is the `SERIALIZE_POD` fast path; fields using it
/// delegate their [`Field::save_column`] override here.
///
/// # Errors
///
/// Returns an error if the stream rejects the write.
pub fn save_pod_column<F>(column: &[F], stream: &mut dyn Stream) -> Result<()>
where
    F: Field + bytemuck::Pod,
{
    stream.write(bytemuck::cast_slice(column))
}

/// Reads a whole column as raw bytes in one read.
///
/// The POD path has no per-slot framing, so a schema version change
/// cannot be converted on the fly; the declared version must match
/// exactly.
///
/// # Errors
///
/// Returns [`ErrorKind::PodVersionMismatch`](strata_foundation::ErrorKind::PodVersionMismatch)
/// on a version difference, or a stream error on short data.
pub fn load_pod_column<F>(column: &mut [F], stream: &mut dyn Stream, version: u8) -> Result<()>
where
    F: Field + bytemuck::Pod,
{
    if version != F::VERSION {
        return Err(Error::pod_version_mismatch(F::NAME, F::VERSION, version));
    }
    stream.read(bytemuck::cast_slice_mut(column))
}

/// Static description of one field within an archetype, captured at
/// registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// The field's unique name.
    pub name: &'static str,
    /// The field's single-bit mask.
    pub mask: FieldMask,
    /// The field's schema version.
    pub version: u8,
    /// The field's behavior flags.
    pub flags: FieldFlags,
    /// Size in bytes of one slot's value.
    pub slot_size: usize,
}

impl FieldInfo {
    /// Captures the info for a field type.
    #[must_use]
    pub fn of<F: Field>() -> Self {
        Self {
            name: F::NAME,
            mask: F::MASK,
            version: F::VERSION,
            flags: F::FLAGS,
            slot_size: std::mem::size_of::<F>(),
        }
    }
}

/// Validates a composed field list at registration time.
///
/// Checks: non-empty list, names present with wire-encodable length and
/// unique, masks single-bit and mutually exclusive.
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidFieldConfig`](strata_foundation::ErrorKind::InvalidFieldConfig)
/// describing the first violation found.
pub fn validate_field_infos(infos: &[FieldInfo]) -> Result<()> {
    if infos.is_empty() {
        return Err(Error::invalid_field_config("archetype declares no fields"));
    }

    let mut combined = 0u64;
    for (i, info) in infos.iter().enumerate() {
        if !info.mask.is_single_bit() {
            return Err(Error::invalid_field_config(format!(
                "field `{}` mask {:?} is not a single bit",
                info.name, info.mask
            )));
        }
        let bits = info.mask.to_bits();
        if combined & bits != 0 {
            return Err(Error::invalid_field_config(format!(
                "field `{}` mask {:?} collides with another field",
                info.name, info.mask
            )));
        }
        combined |= bits;

        if info.name.is_empty() || info.name.len() > 255 {
            return Err(Error::invalid_field_config(format!(
                "field name `{}` must be 1..=255 bytes",
                info.name
            )));
        }
        for other in &infos[i + 1..] {
            if other.name == info.name {
                return Err(Error::invalid_field_config(format!(
                    "duplicate field name `{}`",
                    info.name
                )));
            }
        }
    }
    Ok(())
}
