//! Create/remove change tracking.

use strata_storage::{ArchetypeSpec, ChangeKind, Registry, StorageKind};

use crate::common::Position;

fn tracked_registry() -> Registry {
    let mut registry = Registry::new("tracked");
    registry
        .register(
            "watched",
            1,
            ArchetypeSpec::new()
                .field::<Position>()
                .storage(StorageKind::Fixed(8))
                .track_changes(),
        )
        .unwrap();
    registry
}

#[test]
fn records_creates_and_removes_in_order() {
    let mut registry = tracked_registry();
    let archetype = registry.find_by_id_mut(1).unwrap();

    let a = archetype.create();
    let b = archetype.create();
    archetype.remove(a.index());

    let events = archetype.tracked_changes();
    assert_eq!(events.len(), 3);
    assert_eq!((events[0].id, events[0].kind), (a, ChangeKind::Created));
    assert_eq!((events[1].id, events[1].kind), (b, ChangeKind::Created));
    assert_eq!((events[2].id, events[2].kind), (a, ChangeKind::Removed));
}

#[test]
fn removal_event_carries_the_pre_removal_id() {
    let mut registry = tracked_registry();
    let archetype = registry.find_by_id_mut(1).unwrap();

    let first = archetype.create();
    archetype.remove(first.index());
    let second = archetype.create();

    let events = archetype.tracked_changes();
    // The removal names the version that was live, the re-creation the
    // bumped one.
    assert_eq!(events[1].id, first);
    assert_eq!(events[2].id, second);
    assert_ne!(first.version(), second.version());
}

#[test]
fn clearing_and_pausing_tracking() {
    let mut registry = tracked_registry();
    let archetype = registry.find_by_id_mut(1).unwrap();

    archetype.create();
    archetype.clear_tracked_changes();
    assert!(archetype.tracked_changes().is_empty());

    archetype.set_tracking(false);
    archetype.create();
    assert!(archetype.tracked_changes().is_empty());

    archetype.set_tracking(true);
    let id = archetype.create();
    assert_eq!(archetype.tracked_changes().len(), 1);
    assert_eq!(archetype.tracked_changes()[0].id, id);
}

#[test]
fn untracked_archetypes_record_nothing() {
    let mut registry = Registry::new("quiet");
    registry
        .register(
            "plain",
            1,
            ArchetypeSpec::new().field::<Position>().storage(StorageKind::Fixed(4)),
        )
        .unwrap();
    let archetype = registry.find_by_id_mut(1).unwrap();
    let id = archetype.create();
    archetype.remove(id.index());
    assert!(archetype.tracked_changes().is_empty());
    // Toggling is a no-op rather than a panic.
    archetype.set_tracking(true);
    archetype.clear_tracked_changes();
}
