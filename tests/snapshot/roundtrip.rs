//! Whole-store save/load round trips.

use strata_foundation::MemoryStream;
use strata_storage::Handle;

use crate::common::{world, Label, Position, SelfRef};

#[test]
fn two_archetype_round_trip_is_entity_for_entity_identical() {
    let mut source = world();

    let labeled = source.find_by_id_mut(1).unwrap();
    let mut labeled_handles = Vec::new();
    for i in 0..5 {
        let h = labeled.create_handle();
        *labeled.fetch_mut::<Position>(&h) = Position { x: i as f32, y: -(i as f32) };
        *labeled.fetch_mut::<Label>(&h) = Label(format!("entity-{i}"));
        labeled_handles.push(h);
    }
    // A hole so states and free list both carry content.
    let mut doomed = labeled_handles[2];
    labeled.remove_handle(&mut doomed);

    let points = source.find_by_id_mut(2).unwrap();
    points.reserve(4);
    for i in 0..3 {
        let h = points.create_handle();
        *points.fetch_mut::<Position>(&h) = Position { x: 100.0 + i as f32, y: 0.0 };
    }

    let mut stream = MemoryStream::new();
    source.save(&mut stream, &mut ()).unwrap();

    let mut target = world();
    stream.rewind();
    target.load(&mut stream, &mut ()).unwrap();

    // Parallel iteration yields identical field data.
    let mut source_rows: Vec<(Handle, Position)> = Vec::new();
    source.for_each_with_handle::<(Position,)>(|h, (p,): (&mut Position,)| {
        source_rows.push((h, *p));
    });
    let mut target_rows: Vec<(Handle, Position)> = Vec::new();
    target.for_each_with_handle::<(Position,)>(|h, (p,): (&mut Position,)| {
        target_rows.push((h, *p));
    });
    assert_eq!(source_rows, target_rows);

    for (i, h) in labeled_handles.iter().enumerate() {
        if i == 2 {
            assert!(!target.validate(h));
            continue;
        }
        assert!(target.validate(h));
        assert_eq!(target.get::<Label>(h).unwrap(), &Label(format!("entity-{i}")));
    }
    assert_eq!(target.count_entities(), source.count_entities());

    // Distinct underlying storage: mutating the target leaves the
    // source untouched.
    target.get_mut::<Position>(&labeled_handles[0]).unwrap().x = 999.0;
    assert_eq!(source.get::<Position>(&labeled_handles[0]).unwrap().x, 0.0);
}

#[test]
fn holes_round_trip_and_stay_reusable() {
    let mut source = world();
    let labeled = source.find_by_id_mut(1).unwrap();
    let a = labeled.create_handle();
    let b = labeled.create_handle();
    let c = labeled.create_handle();
    let mut doomed = b;
    labeled.remove_handle(&mut doomed);

    let mut stream = MemoryStream::new();
    source.save(&mut stream, &mut ()).unwrap();

    let mut target = world();
    stream.rewind();
    target.load(&mut stream, &mut ()).unwrap();

    let archetype = target.find_by_id_mut(1).unwrap();
    assert_eq!(archetype.len(), 2);
    assert_eq!(archetype.slot_count(), 3);
    assert!(archetype.validate(&a));
    assert!(archetype.validate(&c));
    assert!(!archetype.validate(&b));

    // The hole is the next slot reused, with a version unlike b's.
    let reused = archetype.create_handle();
    assert_eq!(reused.id().index(), b.id().index());
    assert_ne!(reused.id().version(), b.id().version());
}

#[test]
fn never_serialized_field_is_rebuilt_by_the_assignment_hook() {
    let mut source = world();
    let labeled = source.find_by_id_mut(1).unwrap();
    let h = labeled.create_handle();
    assert_eq!(labeled.fetch::<SelfRef>(&h).me, h);

    let mut stream = MemoryStream::new();
    source.save(&mut stream, &mut ()).unwrap();

    let mut target = world();
    stream.rewind();
    target.load(&mut stream, &mut ()).unwrap();

    // Nothing for SelfRef crossed the wire, but the identity hook ran
    // for every loaded slot.
    assert_eq!(target.get::<SelfRef>(&h).unwrap().me, h);
}

#[test]
fn load_replaces_existing_content() {
    let mut source = world();
    let h = source.find_by_id_mut(1).unwrap().create_handle();

    let mut stream = MemoryStream::new();
    source.save(&mut stream, &mut ()).unwrap();

    // The target has unrelated pre-existing entities; load is
    // destructive, not merging.
    let mut target = world();
    let labeled = target.find_by_id_mut(1).unwrap();
    for _ in 0..4 {
        labeled.create_handle();
    }
    stream.rewind();
    target.load(&mut stream, &mut ()).unwrap();
    assert_eq!(target.count_entities(), 1);
    assert!(target.validate(&h));
}

#[test]
fn dynamic_archetype_capacity_follows_the_loaded_slots() {
    let mut source = world();
    let points = source.find_by_id_mut(2).unwrap();
    points.reserve(4);
    for _ in 0..4 {
        points.create_handle();
    }

    let mut stream = MemoryStream::new();
    source.save(&mut stream, &mut ()).unwrap();

    // Target never reserved; loading must still leave it usable.
    let mut target = world();
    stream.rewind();
    target.load(&mut stream, &mut ()).unwrap();

    let loaded = target.find_by_id_mut(2).unwrap();
    assert_eq!(loaded.len(), 4);
    assert!(loaded.capacity() >= 4);
}

#[test]
fn empty_registry_round_trips() {
    let mut source = world();
    let mut stream = MemoryStream::new();
    source.save(&mut stream, &mut ()).unwrap();

    let mut target = world();
    stream.rewind();
    target.load(&mut stream, &mut ()).unwrap();
    assert_eq!(target.count_entities(), 0);
}
