use std::cell::Cell;
use std::marker::PhantomData;
use std::num::NonZero;

use crate::{AtomicPool, DropPolicy};

/// Builder for creating an instance of [`AtomicPool<T>`].
///
/// The capacity is mandatory and must be set with
/// [`capacity()`](Self::capacity) before calling [`build()`](Self::build);
/// other settings are optional.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use atomic_pool::AtomicPool;
///
/// let pool = AtomicPool::<String>::builder()
///     .capacity(NonZero::new(64).unwrap())
///     .build();
///
/// assert_eq!(pool.available(), 64);
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) and can be safely transferred
/// between threads, allowing pool configuration to happen on a different
/// thread than where the pool is used. However, it is not thread-safe
/// ([`Sync`]) as it contains mutable configuration state.
#[derive(Debug)]
#[must_use]
pub struct AtomicPoolBuilder<T> {
    capacity: Option<NonZero<usize>>,
    drop_policy: DropPolicy,

    /// The element type is fixed at build time but carried here so the
    /// builder can be produced by `AtomicPool::<T>::builder()`.
    _element: PhantomData<fn() -> T>,

    // Prevents Sync while allowing Send - builders are thread-mobile but not thread-safe
    _not_sync: PhantomData<Cell<()>>,
}

impl<T> AtomicPoolBuilder<T> {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            capacity: None,
            drop_policy: DropPolicy::default(),
            _element: PhantomData,
            _not_sync: PhantomData,
        }
    }

    /// Sets the number of slots the pool preallocates.
    ///
    /// The capacity is fixed for the pool's lifetime; the pool never grows or
    /// shrinks.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use atomic_pool::AtomicPool;
    ///
    /// let pool = AtomicPool::<u64>::builder()
    ///     .capacity(NonZero::new(1024).unwrap())
    ///     .build();
    /// ```
    #[inline]
    pub fn capacity(mut self, capacity: NonZero<usize>) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how to
    /// treat still-live values when the pool is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use atomic_pool::{AtomicPool, DropPolicy};
    ///
    /// let pool = AtomicPool::<u32>::builder()
    ///     .capacity(NonZero::new(8).unwrap())
    ///     .drop_policy(DropPolicy::MustNotDropItems)
    ///     .build();
    /// ```
    #[inline]
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if no capacity has been set using [`capacity()`](Self::capacity).
    #[must_use]
    #[inline]
    pub fn build(self) -> AtomicPool<T>
    where
        T: Send + 'static,
    {
        let capacity = self
            .capacity
            .expect("capacity must be set using .capacity() before calling .build()");

        AtomicPool::new_inner(capacity, self.drop_policy)
    }
}
