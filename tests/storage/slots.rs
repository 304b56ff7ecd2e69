//! Slot allocation, removal, and the capacity contract.

use strata_foundation::{EntityId, ErrorKind, FieldFlags, FieldMask};
use strata_storage::{ArchetypeSpec, Field, Registry, StorageKind};

use crate::common::{Label, Position};

fn fixed_registry(capacity: usize) -> Registry {
    let mut registry = Registry::new("slots");
    registry
        .register(
            "labeled",
            1,
            ArchetypeSpec::new()
                .field::<Position>()
                .field::<Label>()
                .storage(StorageKind::Fixed(capacity)),
        )
        .unwrap();
    registry
}

#[test]
fn live_count_equals_slots_minus_free_at_every_step() {
    let mut registry = fixed_registry(16);
    let archetype = registry.find_by_id_mut(1).unwrap();
    let mut live: Vec<EntityId> = Vec::new();

    // Deterministic churn: create two, remove one, repeat.
    for round in 0..40 {
        let id = archetype.create();
        if !id.is_invalid() {
            live.push(id);
        }
        let id = archetype.create();
        if !id.is_invalid() {
            live.push(id);
        }
        if !live.is_empty() {
            let victim = live.remove(round % live.len());
            archetype.remove(victim.index());
        }
        assert_eq!(archetype.len(), live.len());
    }
}

#[test]
fn capacity_four_scenario() {
    let mut registry = fixed_registry(4);
    let archetype = registry.find_by_id_mut(1).unwrap();

    let mut issued = Vec::new();
    for _ in 0..4 {
        let handle = archetype.create_handle();
        assert!(!handle.is_empty());
        issued.push(handle);
    }
    // Fifth create fails closed; no reallocation.
    assert!(archetype.create_handle().is_empty());
    assert_eq!(archetype.capacity(), 4);

    let mut doomed = issued[1];
    archetype.remove_handle(&mut doomed);
    let replacement = archetype.create_handle();
    assert!(!replacement.is_empty());
    assert_eq!(replacement.id().index(), issued[1].id().index());
    // The new version differs from every handle previously issued for
    // that slot index.
    for old in &issued {
        if old.id().index() == replacement.id().index() {
            assert_ne!(old.id().version(), replacement.id().version());
        }
    }
}

#[test]
fn fixed_storage_never_exceeds_capacity_under_pressure() {
    let mut registry = fixed_registry(8);
    let archetype = registry.find_by_id_mut(1).unwrap();
    let mut live: Vec<EntityId> = Vec::new();

    for round in 0..200 {
        if round % 3 == 0 && !live.is_empty() {
            let victim = live.remove(round % live.len());
            archetype.remove(victim.index());
        } else {
            let id = archetype.create();
            if !id.is_invalid() {
                live.push(id);
            }
        }
        assert!(archetype.len() <= 8);
        assert!(archetype.slot_count() <= 8);
        assert_eq!(archetype.capacity(), 8);
    }
}

#[test]
fn create_at_preserves_requested_indices() {
    let mut registry = fixed_registry(8);
    let archetype = registry.find_by_id_mut(1).unwrap();

    let a = archetype.create();
    let b = archetype.create();
    let _c = archetype.create();
    archetype.remove(a.index());
    archetype.remove(b.index());

    // Free index in any position, plus the append position.
    assert_eq!(archetype.create_at(a.index()).unwrap().index(), 0);
    assert_eq!(archetype.create_at(3).unwrap().index(), 3);

    // Occupied and out-of-range indices are invalid operations.
    let err = archetype.create_at(0).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidRequestedIndex(0)));
    assert!(archetype.create_at(7).is_err());
}

#[test]
fn removed_slots_reset_to_archetype_defaults() {
    let mut registry = Registry::new("defaults");
    registry
        .register(
            "labeled",
            1,
            ArchetypeSpec::new()
                .field_with_default(Position { x: -1.0, y: -1.0 })
                .field_with_default(Label("unnamed".to_string()))
                .storage(StorageKind::Fixed(4)),
        )
        .unwrap();
    let archetype = registry.find_by_id_mut(1).unwrap();

    let handle = archetype.create_handle();
    assert_eq!(
        archetype.fetch::<Position>(&handle),
        &Position { x: -1.0, y: -1.0 }
    );
    *archetype.fetch_mut::<Label>(&handle) = Label("named".to_string());
    let index = handle.id().index();
    archetype.remove(index);

    let reborn = archetype.create_handle();
    assert_eq!(reborn.id().index(), index);
    assert_eq!(archetype.fetch::<Label>(&reborn), &Label("unnamed".to_string()));
}

#[test]
fn pre_destroy_runs_and_no_reset_preserves_bytes() {
    #[derive(Clone, Debug, PartialEq, Default)]
    struct Tombstone(u32);

    impl Field for Tombstone {
        const NAME: &'static str = "tombstone";
        const MASK: FieldMask = FieldMask::from_bit(3);
        const FLAGS: FieldFlags = FieldFlags::NO_RESET.union(FieldFlags::PRE_DESTROY);

        fn pre_destroy(&mut self) {
            self.0 = 0xdead;
        }
    }

    let mut registry = Registry::new("hooks");
    registry
        .register(
            "tombstones",
            1,
            ArchetypeSpec::new()
                .field::<Tombstone>()
                .storage(StorageKind::Fixed(2)),
        )
        .unwrap();
    let archetype = registry.find_by_id_mut(1).unwrap();

    let id = archetype.create();
    archetype.column_mut::<Tombstone>().unwrap()[0] = Tombstone(7);
    archetype.remove(id.index());

    // The hook fired, and the no-reset opt-out left its write in place.
    assert_eq!(archetype.column::<Tombstone>().unwrap()[0], Tombstone(0xdead));
}

#[test]
fn dynamic_storage_grows_only_through_reserve_and_enlarge() {
    let mut registry = Registry::new("dynamic");
    registry
        .register("labeled", 1, ArchetypeSpec::new().field::<Label>())
        .unwrap();
    let archetype = registry.find_by_id_mut(1).unwrap();

    assert_eq!(archetype.capacity(), 0);
    assert!(archetype.create().is_invalid());

    archetype.reserve(3);
    for _ in 0..3 {
        assert!(!archetype.create().is_invalid());
    }
    assert!(archetype.create().is_invalid());

    archetype.enlarge();
    assert_eq!(archetype.capacity(), 6);
    assert!(!archetype.create().is_invalid());
}

#[test]
fn registration_rejects_mask_collisions() {
    #[derive(Clone, Debug, PartialEq, Default)]
    struct Clash(u8);

    impl Field for Clash {
        const NAME: &'static str = "clash";
        // Same bit as Position.
        const MASK: FieldMask = FieldMask::from_bit(0);
    }

    let mut registry = Registry::new("bad");
    let err = registry
        .register(
            "broken",
            1,
            ArchetypeSpec::new().field::<Position>().field::<Clash>(),
        )
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidFieldConfig(_)));
    assert!(registry.is_empty());
}
