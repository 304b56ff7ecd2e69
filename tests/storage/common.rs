//! Field types shared by the storage integration tests.

use std::any::Any;

use strata_foundation::{FieldFlags, FieldMask, Result, SlotState, Stream};
use strata_storage::{load_pod_column, save_pod_column, Field, Handle};

/// Plain-old-data field using the bulk byte-cast serialization path.
#[derive(Clone, Copy, Debug, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Field for Position {
    const NAME: &'static str = "position";
    const MASK: FieldMask = FieldMask::from_bit(0);
    const FLAGS: FieldFlags = FieldFlags::SERIALIZE_POD;

    fn save_column(
        column: &[Self],
        _states: &[SlotState],
        stream: &mut dyn Stream,
        _ctx: &mut dyn Any,
    ) -> Result<()> {
        save_pod_column(column, stream)
    }

    fn load_column(
        column: &mut [Self],
        _states: &[SlotState],
        stream: &mut dyn Stream,
        _ctx: &mut dyn Any,
        version: u8,
    ) -> Result<()> {
        load_pod_column(column, stream, version)
    }
}

/// Heap-owning field with per-slot custom serialization.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Label(pub String);

impl Field for Label {
    const NAME: &'static str = "label";
    const MASK: FieldMask = FieldMask::from_bit(1);

    fn save_slot(&self, stream: &mut dyn Stream, _ctx: &mut dyn Any) -> Result<()> {
        stream.write_u32(self.0.len() as u32)?;
        stream.write(self.0.as_bytes())
    }

    fn load_slot(&mut self, stream: &mut dyn Stream, _ctx: &mut dyn Any, _version: u8) -> Result<()> {
        let len = stream.read_u32()? as usize;
        let mut buf = vec![0u8; len];
        stream.read(&mut buf)?;
        self.0 = String::from_utf8_lossy(&buf).into_owned();
        Ok(())
    }
}

/// Field that caches its own handle via the assignment hook. Excluded
/// from serialization; the hook repopulates it after load, duplication,
/// and compaction moves.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SelfRef {
    pub me: Handle,
}

impl Field for SelfRef {
    const NAME: &'static str = "self_ref";
    const MASK: FieldMask = FieldMask::from_bit(2);
    const FLAGS: FieldFlags = FieldFlags::NEVER_SERIALIZE;

    fn assigned(&mut self, handle: Handle) {
        self.me = handle;
    }
}
