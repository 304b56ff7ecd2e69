//! Typed field tuples for lockstep iteration.
//!
//! A [`FieldSet`] is a tuple of [`Field`] types requested from an
//! archetype or across the registry. Iteration resolves one slice per
//! requested field inside each matching archetype and walks the shared
//! slot-state array in lockstep, yielding mutable references for every
//! occupied slot. The only filtering available is the mask-superset
//! archetype match; field values are the per-entity predicate.

use strata_foundation::Signature;

use crate::column::{AnyColumn, ColumnData};
use crate::field::Field;

/// A tuple of field types that can be fetched together from one
/// archetype. Implemented for tuples of one to four fields.
pub trait FieldSet {
    /// Combined signature of every requested field.
    const SIGNATURE: Signature;

    /// One mutable slice per requested field, borrowed from the
    /// archetype's columns.
    type Slices<'a>;

    /// One mutable reference per requested field, for a single slot.
    type Row<'a>;

    /// Resolves the requested slices from an archetype's columns, or
    /// `None` if any requested field is absent.
    fn slices(columns: &mut [Box<dyn AnyColumn>]) -> Option<Self::Slices<'_>>;

    /// Borrows one slot's row out of resolved slices.
    fn row<'r>(slices: &'r mut Self::Slices<'_>, index: usize) -> Self::Row<'r>;
}

macro_rules! impl_field_set {
    ($(($field:ident, $slot:ident, $idx:tt)),+) => {
        impl<$($field: Field),+> FieldSet for ($($field,)+) {
            const SIGNATURE: Signature = Signature::EMPTY$(.with($field::MASK))+;

            type Slices<'a> = ($(&'a mut [$field],)+);
            type Row<'a> = ($(&'a mut $field,)+);

            fn slices(columns: &mut [Box<dyn AnyColumn>]) -> Option<Self::Slices<'_>> {
                $(let mut $slot: Option<&mut [$field]> = None;)+
                for column in columns.iter_mut() {
                    let mask = column.info().mask;
                    $(
                        if mask == $field::MASK {
                            $slot = column
                                .data_any_mut()
                                .downcast_mut::<ColumnData<$field>>()
                                .map(|data| data.data.as_mut_slice());
                            continue;
                        }
                    )+
                }
                Some(($($slot?,)+))
            }

            fn row<'r>(slices: &'r mut Self::Slices<'_>, index: usize) -> Self::Row<'r> {
                ($(&mut slices.$idx[index],)+)
            }
        }
    };
}

impl_field_set!((A, slot_a, 0));
impl_field_set!((A, slot_a, 0), (B, slot_b, 1));
impl_field_set!((A, slot_a, 0), (B, slot_b, 1), (C, slot_c, 2));
impl_field_set!((A, slot_a, 0), (B, slot_b, 1), (C, slot_c, 2), (D, slot_d, 3));
