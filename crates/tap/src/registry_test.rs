//! Tests for ViewerRegistry

use super::*;

use std::thread;

fn registry(n: usize) -> (ViewerRegistry, Vec<Uuid>) {
    let ids: Vec<_> = (0..n).map(|_| Uuid::new_v4()).collect();
    let registry = ViewerRegistry::new(&AllowList::from_ids(ids.clone()), MAX_VIEWERS).unwrap();
    (registry, ids)
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_slots_follow_allow_list_order() {
    let (registry, ids) = registry(4);

    assert_eq!(registry.len(), 4);
    for (slot, id) in ids.iter().enumerate() {
        assert_eq!(registry.lookup(id), Some(slot));
        assert_eq!(registry.snapshot().get(slot).unwrap().bit, 1 << slot);
    }
    assert_eq!(registry.lookup(&Uuid::new_v4()), None);
}

#[test]
fn test_too_many_viewers() {
    let ids: Vec<_> = (0..5).map(|_| Uuid::new_v4()).collect();
    let err = ViewerRegistry::new(&AllowList::from_ids(ids), 4).unwrap_err();
    assert!(matches!(err, TapError::TooManyViewers { count: 5, max: 4 }));
}

#[test]
fn test_capacity_capped_by_mask_width() {
    let ids: Vec<_> = (0..65).map(|_| Uuid::new_v4()).collect();
    let err = ViewerRegistry::new(&AllowList::from_ids(ids), 1000).unwrap_err();
    assert!(matches!(err, TapError::TooManyViewers { max: 64, .. }));
}

#[test]
fn test_sixty_four_viewers_use_every_bit() {
    let (registry, ids) = registry(64);
    assert_eq!(registry.snapshot().get(63).unwrap().bit, 1 << 63);
    assert_eq!(registry.lookup(&ids[63]), Some(63));
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_set_and_get_filter() {
    let (registry, ids) = registry(2);
    let spec = FilterSpec::on().with_max_level(3);

    registry.set_filter(&ids[1], vec![spec.clone()]).unwrap();

    assert_eq!(registry.filters(&ids[1]).unwrap(), vec![spec]);
    assert!(registry.filters(&ids[0]).unwrap().is_empty());
    assert_eq!(registry.generation(), 1);
}

#[test]
fn test_empty_set_clears() {
    let (registry, ids) = registry(1);
    registry.set_filter(&ids[0], vec![FilterSpec::on()]).unwrap();
    registry.set_filter(&ids[0], vec![]).unwrap();

    assert!(registry.snapshot().get(0).unwrap().filters.is_none());
}

#[test]
fn test_clear_filter() {
    let (registry, ids) = registry(1);
    registry.set_filter(&ids[0], vec![FilterSpec::on()]).unwrap();
    registry.clear_filter(&ids[0]).unwrap();

    assert!(registry.filters(&ids[0]).unwrap().is_empty());
    assert_eq!(registry.snapshot().active_count(), 0);
}

#[test]
fn test_unknown_viewer() {
    let (registry, _) = registry(1);
    let stranger = Uuid::new_v4();

    assert!(matches!(
        registry.set_filter(&stranger, vec![FilterSpec::on()]),
        Err(TapError::UnknownViewer { .. })
    ));
    assert!(matches!(
        registry.filters(&stranger),
        Err(TapError::UnknownViewer { .. })
    ));
    assert_eq!(registry.generation(), 0);
}

#[test]
fn test_bits_stable_across_updates() {
    let (registry, ids) = registry(8);
    let before: Vec<_> = registry.snapshot().entries().iter().map(|e| (e.id, e.bit)).collect();

    for (i, id) in ids.iter().enumerate() {
        registry
            .set_filter(id, vec![FilterSpec::on().with_max_level(i as i32)])
            .unwrap();
        if i % 2 == 0 {
            registry.clear_filter(id).unwrap();
        }
    }

    let after: Vec<_> = registry.snapshot().entries().iter().map(|e| (e.id, e.bit)).collect();
    assert_eq!(before, after);
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_snapshot_unaffected_by_later_update() {
    let (registry, ids) = registry(2);
    registry.set_filter(&ids[1], vec![FilterSpec::on()]).unwrap();

    let old = registry.snapshot();
    registry
        .set_filter(&ids[0], vec![FilterSpec::on().with_max_level(1)])
        .unwrap();

    assert!(old.get(0).unwrap().filters.is_none());
    assert!(old.get(1).unwrap().filters.is_some());
    assert_eq!(old.generation() + 1, registry.generation());
}

#[test]
fn test_concurrent_updates_publish_whole_generations() {
    let (registry, ids) = registry(2);
    let registry = Arc::new(registry);

    // Viewer 1 keeps a constant filter for the whole test
    registry.set_filter(&ids[1], vec![FilterSpec::on()]).unwrap();

    let writer = {
        let registry = Arc::clone(&registry);
        let id = ids[0];
        thread::spawn(move || {
            for level in 0..2_000 {
                registry
                    .set_filter(&id, vec![FilterSpec::on().with_max_level(level)])
                    .unwrap();
            }
        })
    };

    for _ in 0..2_000 {
        let table = registry.snapshot();
        assert_eq!(table.entries().len(), 2);
        assert!(table.get(1).unwrap().filters.is_some());
    }

    writer.join().unwrap();
    assert_eq!(registry.generation(), 2_001);
}
