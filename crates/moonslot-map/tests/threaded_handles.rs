//! Integration test: handle traffic across threads.
//!
//! Handles into a `SyncSlotMap` are sent over channels, cloned, and
//! dropped on worker threads. Reference counts must balance and every
//! object must be destroyed exactly when its last strong handle goes.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, unbounded};
use moonslot_core::SyncLock;
use moonslot_map::{Handle, SyncSlotMap};

#[test]
fn handles_released_on_consumer_threads() {
    let map: Arc<SyncSlotMap<u64>> = Arc::new(SyncSlotMap::default());
    let (tx, rx) = unbounded::<Handle<u64, SyncLock>>();

    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let rx = rx.clone();
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let mut sum = 0u64;
                for handle in rx.iter() {
                    let value = map.with(&handle, |v| *v);
                    assert!(value.is_some(), "received a stale handle");
                    sum += value.unwrap_or(0);
                }
                sum
            })
        })
        .collect();
    drop(rx);

    for i in 1..=1000u64 {
        tx.send(map.insert(i)).unwrap();
    }
    drop(tx);

    let total: u64 = consumers.into_iter().map(|c| c.join().unwrap()).sum();
    assert_eq!(total, 1000 * 1001 / 2);
    assert!(map.is_empty());
    assert_eq!(map.outstanding_handles(), 0);
}

#[test]
fn concurrent_clones_balance_counts() {
    let map: SyncSlotMap<String> = SyncSlotMap::default();
    let handle = map.insert(String::from("shared"));
    let weak = handle.downgrade();

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let handle = handle.clone();
            let weak = weak.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    let copy = handle.clone();
                    let observer = copy.downgrade();
                    assert!(observer.is_valid());
                    drop(copy);
                    let upgraded = weak.upgrade();
                    assert!(upgraded.is_valid());
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(map.len(), 1);
    assert_eq!(map.outstanding_handles(), 2);
    drop(handle);
    assert!(!weak.is_valid());
    assert!(map.is_empty());
}

#[test]
fn handles_outlive_map_on_another_thread() {
    let map: SyncSlotMap<u32> = SyncSlotMap::default();
    let (tx, rx) = bounded(16);
    for handle in map.insert_all(0..16) {
        tx.send(handle).unwrap();
    }
    drop(tx);
    drop(map);

    let stale = thread::spawn(move || rx.iter().filter(|h| !h.is_valid()).count())
        .join()
        .unwrap();
    assert_eq!(stale, 16);
}
