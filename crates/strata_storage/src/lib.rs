//! Archetype-based entity storage.
//!
//! Entities live in archetypes: fixed combinations of field types laid
//! out as parallel typed columns sharing one slot-state array. Callers
//! register archetypes with a [`Registry`], create and remove entities
//! through generational [`Handle`]s, iterate matching archetypes with
//! typed field tuples, and snapshot whole stores through the versioned
//! stream protocol in [`snapshot`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]

pub mod archetype;
pub mod column;
pub mod field;
pub mod handle;
pub mod observer;
pub mod query;
pub mod registry;
pub mod snapshot;

pub use archetype::{
    Archetype, ArchetypeSpec, ChangeEvent, ChangeKind, MaintenancePolicy, StorageKind,
};
pub use column::{AnyColumn, ColumnData, DynamicColumn, FixedColumn};
pub use field::{load_pod_column, save_pod_column, Field, FieldInfo};
pub use handle::Handle;
pub use observer::{
    ArchetypeSummary, SerializationEvent, SerializationEventKind, StoreObserver,
};
pub use query::FieldSet;
pub use registry::{DumpMode, Registry};
pub use snapshot::FORMAT_VERSION;
