//! Homogeneous per-field storage containers.
//!
//! Each archetype owns one container per declared field type. Exactly
//! two container kinds exist, selected at archetype declaration time:
//! [`DynamicColumn`] (growable) and [`FixedColumn`] (capacity fixed for
//! the archetype's lifetime). Whether a container can reallocate is a
//! capability flag read by the growth and compaction policies, never a
//! branch in slot operations.

use std::any::Any;

use strata_foundation::{FieldFlags, Result, SlotState, Stream};

use crate::field::{Field, FieldInfo};
use crate::handle::Handle;

/// Typed slot data plus the archetype-configured default value.
///
/// Iteration resolves columns down to this concrete type via
/// [`AnyColumn::data_any_mut`].
pub struct ColumnData<F: Field> {
    pub(crate) data: Vec<F>,
    default: F,
}

impl<F: Field> ColumnData<F> {
    fn new(default: F) -> Self {
        Self {
            data: Vec::new(),
            default,
        }
    }

    fn with_capacity(default: F, capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            default,
        }
    }

    fn push_default(&mut self) {
        self.data.push(self.default.clone());
    }

    fn reset_slot(&mut self, index: usize) {
        if !F::FLAGS.contains(FieldFlags::NO_RESET) {
            self.data[index] = self.default.clone();
        }
    }

    fn pre_destroy(&mut self, index: usize) {
        if F::FLAGS.contains(FieldFlags::PRE_DESTROY) {
            self.data[index].pre_destroy();
        }
    }

    fn copy_slot(&mut self, target: usize, source: usize) {
        let value = self.data[source].clone();
        self.data[target] = value;
    }

    fn move_tail_into(&mut self, hole: usize) {
        // The tail element keeps its identity; callers re-run the
        // assignment hook afterwards.
        if let Some(tail) = self.data.pop() {
            self.data[hole] = tail;
        }
    }

    fn resize_default(&mut self, length: usize) {
        self.data.clear();
        self.data.resize(length, self.default.clone());
    }

    fn save_block(
        &self,
        states: &[SlotState],
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
    ) -> Result<()> {
        if F::FLAGS.contains(FieldFlags::NEVER_SERIALIZE) {
            return Ok(());
        }
        F::save_column(&self.data, states, stream, ctx)
    }

    fn load_block(
        &mut self,
        states: &[SlotState],
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
        version: u8,
    ) -> Result<()> {
        if F::FLAGS.contains(FieldFlags::NEVER_SERIALIZE) {
            return Ok(());
        }
        F::load_column(&mut self.data, states, stream, ctx, version)
    }

    fn save_slot(
        &self,
        index: usize,
        state: SlotState,
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
    ) -> Result<()> {
        if F::FLAGS.contains(FieldFlags::NEVER_SERIALIZE) {
            return Ok(());
        }
        F::save_column(&self.data[index..=index], &[state], stream, ctx)
    }

    fn load_slot(
        &mut self,
        index: usize,
        state: SlotState,
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
    ) -> Result<()> {
        if F::FLAGS.contains(FieldFlags::NEVER_SERIALIZE) {
            return Ok(());
        }
        F::load_column(
            &mut self.data[index..=index],
            &[state],
            stream,
            ctx,
            F::VERSION,
        )
    }
}

/// Object-safe view of one field's storage container.
///
/// All slot indices passed in are trusted to be in range; the archetype
/// maintains the uniform-length invariant across its columns.
pub trait AnyColumn {
    /// Static field description captured at construction.
    fn info(&self) -> &FieldInfo;

    /// Number of slots currently held (uniform across an archetype).
    fn len(&self) -> usize;

    /// Whether this container kind can grow after construction.
    fn can_reallocate(&self) -> bool;

    /// Pre-allocates room for `capacity` slots. No-op for fixed columns.
    fn reserve(&mut self, capacity: usize);

    /// Appends one slot initialized to the default value.
    fn push_default(&mut self);

    /// Drops the tail slot.
    fn pop(&mut self);

    /// Resets a slot to the default value, unless the field opted out.
    fn reset_slot(&mut self, index: usize);

    /// Runs the pre-destroy hook if the field opted in.
    fn pre_destroy(&mut self, index: usize);

    /// Copies one slot's value over another.
    fn copy_slot(&mut self, target: usize, source: usize);

    /// Moves the tail slot's value into `hole` and drops the tail.
    fn move_tail_into(&mut self, hole: usize);

    /// Runs the entity-assignment hook for a slot.
    fn assign(&mut self, index: usize, handle: Handle);

    /// Drops all slots, keeping allocated capacity.
    fn clear(&mut self);

    /// Replaces all content with `length` default-valued slots.
    fn resize_default(&mut self, length: usize);

    /// Writes this column's field payload.
    fn save_block(
        &self,
        states: &[SlotState],
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
    ) -> Result<()>;

    /// Reads this column's field payload written at `version`.
    fn load_block(
        &mut self,
        states: &[SlotState],
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
        version: u8,
    ) -> Result<()>;

    /// Writes a single slot's payload, unframed.
    fn save_slot(
        &self,
        index: usize,
        state: SlotState,
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
    ) -> Result<()>;

    /// Reads a single slot's payload, unframed, at the field's own version.
    fn load_slot(
        &mut self,
        index: usize,
        state: SlotState,
        stream: &mut dyn Stream,
        ctx: &mut dyn Any,
    ) -> Result<()>;

    /// Downcast access to the typed [`ColumnData`].
    fn data_any(&self) -> &dyn Any;

    /// Mutable downcast access to the typed [`ColumnData`].
    fn data_any_mut(&mut self) -> &mut dyn Any;
}

/// A growable container backed by a `Vec`; reports
/// `can_reallocate() == true`.
pub struct DynamicColumn<F: Field> {
    info: FieldInfo,
    slots: ColumnData<F>,
}

impl<F: Field> DynamicColumn<F> {
    /// Creates an empty growable column with the given default value.
    #[must_use]
    pub fn new(default: F) -> Self {
        Self {
            info: FieldInfo::of::<F>(),
            slots: ColumnData::new(default),
        }
    }
}

/// A fixed-capacity container; `reserve` is a no-op and
/// `can_reallocate() == false`, which pins the owning archetype's
/// capacity forever.
pub struct FixedColumn<F: Field> {
    info: FieldInfo,
    slots: ColumnData<F>,
}

impl<F: Field> FixedColumn<F> {
    /// Creates a column whose capacity is fixed at construction.
    #[must_use]
    pub fn new(default: F, capacity: usize) -> Self {
        Self {
            info: FieldInfo::of::<F>(),
            slots: ColumnData::with_capacity(default, capacity),
        }
    }
}

macro_rules! delegate_column_impl {
    ($kind:ident, $can_reallocate:expr, |$self_:ident, $capacity:ident| $reserve:expr) => {
        impl<F: Field> AnyColumn for $kind<F> {
            fn info(&self) -> &FieldInfo {
                &self.info
            }

            fn len(&self) -> usize {
                self.slots.data.len()
            }

            fn can_reallocate(&self) -> bool {
                $can_reallocate
            }

            fn reserve(&mut self, capacity: usize) {
                let $self_ = self;
                let $capacity = capacity;
                $reserve
            }

            fn push_default(&mut self) {
                self.slots.push_default();
            }

            fn pop(&mut self) {
                self.slots.data.pop();
            }

            fn reset_slot(&mut self, index: usize) {
                self.slots.reset_slot(index);
            }

            fn pre_destroy(&mut self, index: usize) {
                self.slots.pre_destroy(index);
            }

            fn copy_slot(&mut self, target: usize, source: usize) {
                self.slots.copy_slot(target, source);
            }

            fn move_tail_into(&mut self, hole: usize) {
                self.slots.move_tail_into(hole);
            }

            fn assign(&mut self, index: usize, handle: Handle) {
                self.slots.data[index].assigned(handle);
            }

            fn clear(&mut self) {
                self.slots.data.clear();
            }

            fn resize_default(&mut self, length: usize) {
                self.slots.resize_default(length);
            }

            fn save_block(
                &self,
                states: &[SlotState],
                stream: &mut dyn Stream,
                ctx: &mut dyn Any,
            ) -> Result<()> {
                self.slots.save_block(states, stream, ctx)
            }

            fn load_block(
                &mut self,
                states: &[SlotState],
                stream: &mut dyn Stream,
                ctx: &mut dyn Any,
                version: u8,
            ) -> Result<()> {
                self.slots.load_block(states, stream, ctx, version)
            }

            fn save_slot(
                &self,
                index: usize,
                state: SlotState,
                stream: &mut dyn Stream,
                ctx: &mut dyn Any,
            ) -> Result<()> {
                self.slots.save_slot(index, state, stream, ctx)
            }

            fn load_slot(
                &mut self,
                index: usize,
                state: SlotState,
                stream: &mut dyn Stream,
                ctx: &mut dyn Any,
            ) -> Result<()> {
                self.slots.load_slot(index, state, stream, ctx)
            }

            fn data_any(&self) -> &dyn Any {
                &self.slots
            }

            fn data_any_mut(&mut self) -> &mut dyn Any {
                &mut self.slots
            }
        }
    };
}

delegate_column_impl!(DynamicColumn, true, |column, capacity| {
    let current = column.slots.data.len();
    if capacity > current {
        column.slots.data.reserve_exact(capacity - current);
    }
});

delegate_column_impl!(FixedColumn, false, |_column, _capacity| {});
