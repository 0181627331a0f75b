//! Integration test: ordered slot map scenarios.
//!
//! Covers the sorted round trip of four records, ownership held by the
//! container, duplication, and handle expiry under churn.

use moonslot_ordered::{Handle, OrderedSlotMap};
use moonslot_test_utils::{sample_data, DropCounter, SlotData};

fn contents<T: Clone>(map: &OrderedSlotMap<T>) -> Vec<T> {
    map.view().iter().cloned().collect()
}

// ── Round trip ───────────────────────────────────────────────────────

#[test]
fn four_records_round_trip_sorted() {
    let map = OrderedSlotMap::new();
    let data = sample_data();
    let handles: Vec<Handle<SlotData>> = [data[3], data[1], data[0], data[2]]
        .into_iter()
        .map(|d| map.insert(d))
        .collect();

    assert_eq!(contents(&map), data.to_vec());
    let reversed: Vec<SlotData> = map.view().iter().rev().copied().collect();
    assert_eq!(reversed, data.iter().rev().copied().collect::<Vec<_>>());

    for handle in &handles {
        let value = map.with(handle, |d| *d);
        let rank = map.position(handle);
        assert_eq!(rank.map(|r| data[r]), value);
    }

    // handles[2] holds data[0], the front of the sorted order.
    let mut handles = handles;
    let front = handles[2].downgrade();
    assert!(map.erase(&mut handles[2]));
    assert!(!map.is_valid(&handles[2]));
    assert!(!map.is_valid_weak(&front));
    assert_eq!(map.len(), 3);
    assert_eq!(contents(&map), data[1..].to_vec());
    let survivors = [
        (&handles[0], data[3]),
        (&handles[1], data[1]),
        (&handles[3], data[2]),
    ];
    for (handle, expected) in survivors {
        assert!(map.is_valid(handle));
        assert_eq!(map.with(handle, |d| *d), Some(expected));
    }
    assert_eq!(map.position(&handles[1]), Some(0));

    drop(handles);
    assert!(map.is_empty());
}

#[test]
fn erase_keeps_remaining_sorted() {
    let map = OrderedSlotMap::new();
    let mut handles = map.insert_all(sample_data());
    let data = sample_data();
    assert!(map.erase(&mut handles[1]));
    assert!(map.erase(&mut handles[2]));
    assert_eq!(map.len(), 2);
    assert!(!map.is_valid(&handles[1]));
    assert!(!map.is_valid(&handles[2]));

    let remaining: Vec<i32> = contents(&map).iter().map(|d| d.a).collect();
    assert_eq!(remaining, vec![50, 200]);
    assert_eq!(map.with(&handles[0], |d| *d), Some(data[0]));
    assert_eq!(map.with(&handles[3], |d| *d), Some(data[3]));
    assert_eq!(map.position(&handles[0]), Some(0));
    assert_eq!(map.position(&handles[3]), Some(1));
}

#[test]
fn weak_handle_expires_with_last_strong() {
    let map = OrderedSlotMap::new();
    let strong = map.insert(SlotData::new(100, 90));
    let weak = strong.downgrade();
    assert!(map.is_valid_weak(&weak));
    drop(strong);
    assert!(!map.is_valid_weak(&weak));
    assert!(weak.upgrade().is_empty());
}

#[test]
fn capacity_two_grows_for_five_inserts() {
    let map = OrderedSlotMap::with_capacity(2);
    let handles = map.insert_all((0..5).rev());
    assert_eq!(map.capacity(), 8);
    assert_eq!(contents(&map), vec![0, 1, 2, 3, 4]);
    assert_eq!(map.position(&handles[0]), Some(4));
}

// ── Ownership ────────────────────────────────────────────────────────

#[test]
fn owned_objects_survive_until_released() {
    let drops = DropCounter::new();
    let map = OrderedSlotMap::new();
    let kept = map.insert_owned(drops.track(2));
    let loose = map.insert(drops.track(1));
    let watch = kept.downgrade();
    drop(kept);
    drop(loose);
    assert_eq!(drops.count(), 1);
    assert_eq!(map.len(), 1);

    let revived = watch.upgrade();
    assert!(map.owns(&revived));
    assert!(map.release(&revived));
    drop(revived);
    assert_eq!(drops.count(), 2);
    assert!(map.is_empty());
}

#[test]
fn dropping_map_destroys_owned_objects() {
    let drops = DropCounter::new();
    let map = OrderedSlotMap::new();
    let weak = map.insert_owned(drops.track(0)).into_weak();
    drop(map);
    assert_eq!(drops.count(), 1);
    assert!(!weak.is_valid());
}

#[test]
fn duplicate_is_independent() {
    let map = OrderedSlotMap::new();
    let _a = map.insert(String::from("b"));
    let owned = map.insert_owned(String::from("a"));
    drop(owned);

    let (copy, mut handles) = map.duplicate();
    assert_eq!(contents(&copy), vec!["a", "b"]);
    assert!(copy.with_mut(&handles[1], |s| s.push('!')).is_some());
    assert_eq!(contents(&map), vec!["a", "b"]);
    assert_eq!(contents(&copy), vec!["a", "b!"]);

    assert!(copy.erase(&mut handles[0]));
    assert_eq!(copy.len(), 2, "owned copy survives its handle");
    copy.clear();
    assert!(copy.is_empty());
    assert_eq!(map.len(), 2);
}

// ── Churn ────────────────────────────────────────────────────────────

#[test]
fn slot_reuse_does_not_confuse_positions() {
    let map = OrderedSlotMap::with_capacity(2);
    let mut stale = Vec::new();
    for round in 0..10 {
        let h = map.insert(round);
        stale.push(h.downgrade());
        drop(h);
    }
    let survivor = map.insert(99);
    for weak in &stale {
        assert!(!weak.is_valid());
    }
    assert_eq!(map.position(&survivor), Some(0));
    assert_eq!(map.capacity(), 2);
}
