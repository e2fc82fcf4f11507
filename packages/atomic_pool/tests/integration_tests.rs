//! Integration tests for the `atomic_pool` package.
//!
//! These tests exercise the pool across threads: concurrent claim/release
//! churn, ownership transfer between threads, and teardown ordering.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use atomic_pool::{AtomicPool, Pooled};
use new_zealand::nz;

const THREADS: u64 = 8;

const CYCLES: u64 = if cfg!(miri) { 50 } else { 2_000 };

#[test]
fn concurrent_churn_never_issues_a_slot_twice() {
    // Far fewer slots than demand, so exhaustion and reuse both happen a lot.
    let pool = AtomicPool::<u64>::builder().capacity(nz!(4)).build();

    // Addresses of currently-live values. An insert that produces an address
    // already present means one slot backs two live handles.
    let live_addresses = Mutex::new(HashSet::new());

    let successes = AtomicUsize::new(0);
    let failures = AtomicUsize::new(0);

    thread::scope(|s| {
        for worker in 0..THREADS {
            let pool = &pool;
            let live_addresses = &live_addresses;
            let successes = &successes;
            let failures = &failures;

            s.spawn(move || {
                for cycle in 0..CYCLES {
                    let value = (worker << 32) | cycle;

                    match pool.insert(value) {
                        Ok(item) => {
                            let address = item.ptr().as_ptr() as usize;

                            let newly_live =
                                live_addresses.lock().unwrap().insert(address);
                            assert!(newly_live, "one slot backs two live handles");

                            // No other thread may have scribbled over our value.
                            assert_eq!(*item, value);

                            // Unregister before the drop makes the slot
                            // claimable again.
                            live_addresses.lock().unwrap().remove(&address);
                            drop(item);

                            successes.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(rejected) => {
                            assert_eq!(rejected.into_inner(), value);
                            failures.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            });
        }
    });

    let successes = successes.load(Ordering::Relaxed);
    let failures = failures.load(Ordering::Relaxed);

    let attempts = usize::try_from(THREADS * CYCLES).unwrap();
    assert_eq!(successes + failures, attempts);
    assert!(successes > 0, "at least some inserts must have found a slot");

    // Every claimed slot went back.
    assert_eq!(pool.available(), 4);
    assert!(pool.is_empty());
}

#[test]
fn every_insert_succeeds_when_capacity_covers_all_threads() {
    // One slot per thread and each thread holds at most one value at a time,
    // so exhaustion is impossible.
    let pool = AtomicPool::<u64>::builder().capacity(nz!(8)).build();

    thread::scope(|s| {
        for worker in 0..THREADS {
            let pool = &pool;

            s.spawn(move || {
                for cycle in 0..CYCLES {
                    let value = (worker << 32) | cycle;

                    let item = pool
                        .insert(value)
                        .unwrap_or_else(|_| panic!("pool reported exhaustion below capacity"));

                    assert_eq!(*item, value);
                }
            });
        }
    });

    assert_eq!(pool.available(), 8);
}

#[test]
fn concurrent_churn_with_owned_heap_values() {
    // String has a real destructor and its own allocation, so corruption or
    // double-teardown of a slot shows up loudly here.
    let pool = AtomicPool::<String>::builder().capacity(nz!(2)).build();

    thread::scope(|s| {
        for worker in 0..4_u64 {
            let pool = &pool;

            s.spawn(move || {
                for cycle in 0..CYCLES {
                    if let Ok(item) = pool.insert(format!("{worker}:{cycle}")) {
                        assert_eq!(*item, format!("{worker}:{cycle}"));
                    }
                }
            });
        }
    });

    assert_eq!(pool.available(), 2);
}

#[test]
fn handles_transfer_ownership_across_threads() {
    let pool = AtomicPool::<Vec<u8>>::builder().capacity(nz!(1)).build();

    let item = pool.insert(vec![1, 2, 3]).unwrap();
    assert_eq!(pool.available(), 0);

    thread::scope(|s| {
        s.spawn(move || {
            // The handle was moved here; releasing it from this thread
            // returns the slot all the same.
            assert_eq!(*item, [1, 2, 3]);
            drop(item);
        });
    });

    assert_eq!(pool.available(), 1);
}

#[test]
fn releasing_every_handle_then_dropping_the_pool_leaks_nothing() {
    /// Counts drops so leaks and double drops are both visible.
    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    let drops = Arc::new(AtomicUsize::new(0));

    let pool = AtomicPool::<DropCounter>::builder().capacity(nz!(8)).build();

    let handles: Vec<Pooled<DropCounter>> = (0..8)
        .map(|_| pool.insert(DropCounter(Arc::clone(&drops))).unwrap())
        .collect();

    assert_eq!(pool.available(), 0);

    drop(handles);
    assert_eq!(pool.available(), 8);
    assert_eq!(drops.load(Ordering::Relaxed), 8);

    drop(pool);
    assert_eq!(drops.load(Ordering::Relaxed), 8);
}

#[test]
fn available_count_is_exact_single_threaded() {
    let pool = AtomicPool::<usize>::builder().capacity(nz!(5)).build();

    let mut held = Vec::new();

    for inserted in 1..=5_usize {
        held.push(pool.insert(inserted).unwrap());
        assert_eq!(pool.available(), 5 - inserted);
        assert_eq!(pool.len(), inserted);
    }

    held.pop();
    assert_eq!(pool.available(), 1);

    held.clear();
    assert_eq!(pool.available(), 5);
}

#[test]
fn slots_cycle_free_live_free_indefinitely() {
    let pool = AtomicPool::<u64>::builder().capacity(nz!(1)).build();

    for round in 0..1_000_u64 {
        let item = pool.insert(round).unwrap();
        assert_eq!(*item, round);
        drop(item);

        assert_eq!(pool.available(), 1, "round {round} did not return the slot");
    }
}
