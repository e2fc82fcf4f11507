//! Example demonstrating basic usage of `AtomicPool`.
//!
//! Shows insertion, automatic release on drop, explicit removal and how
//! exhaustion is reported.

use std::num::NonZero;

use atomic_pool::AtomicPool;

fn main() {
    println!("=== AtomicPool: Fixed Capacity, Automatic Release ===");

    // All storage is allocated here; the pool never grows.
    let pool = AtomicPool::<String>::builder()
        .capacity(NonZero::new(2).expect("capacity is nonzero"))
        .build();

    println!("Capacity: {}, available: {}", pool.capacity(), pool.available());

    // Insert values and access them through automatic dereferencing.
    let first = pool.insert("first".to_string()).expect("pool has room");
    let second = pool.insert("second".to_string()).expect("pool has room");
    println!("Pooled: {} / {}", *first, *second);

    // The pool is full now; the rejected value comes back to us.
    match pool.insert("third".to_string()) {
        Ok(_) => unreachable!("the pool only has two slots"),
        Err(rejected) => {
            println!("Pool exhausted, got back: {:?}", rejected.into_inner());
        }
    }

    // Dropping a handle returns its slot...
    drop(first);
    println!("After drop, available: {}", pool.available());

    // ...and explicit removal does the same, with a wrong-pool check.
    pool.remove(second);
    println!("After remove, available: {}", pool.available());

    // The freed slots are immediately reusable.
    let reused = pool.insert("third, finally".to_string()).expect("room again");
    println!("Reused slot holds: {}", *reused);
}
