//! A fixed-capacity typed object pool with lock-free allocation and owning
//! handles that return their value to the pool automatically.
//!
//! This crate provides [`AtomicPool<T>`], a pool that preallocates storage
//! for a fixed number of `T` values and threads a lock-free free list through
//! the unused slots. Inserting a value claims a slot with a compare-exchange
//! on the list head; dropping the returned [`Pooled<T>`] handle tears the
//! value down and pushes the slot back. Neither path touches the
//! general-purpose allocator.
//!
//! # Key features
//!
//! - **Fixed capacity**: storage is one contiguous array, allocated at
//!   construction and never resized
//! - **Lock-free hot path**: insertion and release are short atomic
//!   compare-exchange retry loops; nothing blocks, sleeps or spins for long
//! - **Owning handles**: [`Pooled<T>`] is a unique, movable, non-clonable
//!   owner with [`Deref`][std::ops::Deref]/[`DerefMut`][std::ops::DerefMut]
//!   access that releases its slot on drop
//! - **Exhaustion as a value**: a full pool returns [`Exhausted`] carrying
//!   the rejected payload, so callers decide what to do next
//! - **Weak back-references**: handles reach their pool through
//!   [`Weak<dyn Reclaimer>`][std::sync::Weak], so they never extend the
//!   pool's lifetime and a release after pool death degrades to a no-op
//! - **Configurable teardown**: [`DropPolicy`] decides whether a pool
//!   dropped with live values cleans them up or panics
//!
//! # Example
//!
//! ```rust
//! use std::num::NonZero;
//!
//! use atomic_pool::AtomicPool;
//!
//! let pool = AtomicPool::<String>::builder()
//!     .capacity(NonZero::new(2).unwrap())
//!     .build();
//!
//! let greeting = pool.insert("Hello, World!".to_string()).unwrap();
//! assert_eq!(&*greeting, "Hello, World!");
//! assert_eq!(pool.available(), 1);
//!
//! // Dropping the handle returns the slot to the pool.
//! drop(greeting);
//! assert_eq!(pool.available(), 2);
//! ```
//!
//! # Concurrent use
//!
//! The pool is a passive data structure: it starts no threads and is meant to
//! be shared by reference across caller-managed threads.
//!
//! ```rust
//! use std::num::NonZero;
//! use std::thread;
//!
//! use atomic_pool::AtomicPool;
//!
//! let pool = AtomicPool::<u64>::builder()
//!     .capacity(NonZero::new(64).unwrap())
//!     .build();
//!
//! thread::scope(|s| {
//!     for _worker in 0..4 {
//!         s.spawn(|| {
//!             for i in 0..100 {
//!                 if let Ok(item) = pool.insert(i) {
//!                     assert_eq!(*item, i);
//!                     // Dropping from this thread is fine too.
//!                 }
//!             }
//!         });
//!     }
//! });
//!
//! assert_eq!(pool.available(), 64);
//! ```
//!
//! # Destruction ordering
//!
//! Release every handle before dropping the pool; that is the only teardown
//! sequence with guaranteed semantics. Handles that do outlive the pool stay
//! safe to drop (the release becomes a no-op) but must not be dereferenced,
//! and the pool applies its [`DropPolicy`] to the values they abandoned.

mod builder;
mod drop_policy;
mod errors;
mod pool;
mod pooled;
mod reclaimer;
mod shared;
mod slot;

pub use builder::*;
pub use drop_policy::*;
pub use errors::*;
pub use pool::AtomicPool;
pub use pooled::Pooled;
pub use reclaimer::*;
pub(crate) use shared::*;
pub(crate) use slot::*;
