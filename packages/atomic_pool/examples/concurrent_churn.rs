//! Example demonstrating concurrent use of `AtomicPool` from many threads.
//!
//! The pool is deliberately smaller than the demand, so workers race on the
//! lock-free free list and regularly observe exhaustion.

use std::num::NonZero;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use atomic_pool::AtomicPool;

const WORKERS: u64 = 4;
const ATTEMPTS_PER_WORKER: u64 = 100_000;

fn main() {
    println!("=== AtomicPool: Lock-free Churn Across Threads ===");

    let pool = AtomicPool::<u64>::builder()
        .capacity(NonZero::new(8).expect("capacity is nonzero"))
        .build();

    let exhausted = AtomicUsize::new(0);

    thread::scope(|s| {
        for worker in 0..WORKERS {
            let pool = &pool;
            let exhausted = &exhausted;

            s.spawn(move || {
                for attempt in 0..ATTEMPTS_PER_WORKER {
                    let value = worker * ATTEMPTS_PER_WORKER + attempt;

                    match pool.insert(value) {
                        Ok(item) => {
                            // The handle owns the value; dropping it at the
                            // end of this iteration frees the slot for the
                            // other workers.
                            assert_eq!(*item, value);
                        }
                        Err(_rejected) => {
                            exhausted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            });
        }
    });

    println!(
        "{} attempts, {} hit a momentarily full pool",
        WORKERS * ATTEMPTS_PER_WORKER,
        exhausted.load(Ordering::Relaxed)
    );
    println!("All slots back home: available = {}", pool.available());
}
