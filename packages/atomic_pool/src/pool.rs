use std::fmt;
use std::mem::MaybeUninit;
use std::num::NonZero;
use std::ptr::NonNull;
use std::sync::{Arc, Weak};

use scopeguard::ScopeGuard;

use crate::{
    AtomicPoolBuilder, DropPolicy, Exhausted, PoolShared, Pooled, Reclaimer, TryInsertError,
};

/// A fixed-capacity typed object pool with lock-free allocation.
///
/// `AtomicPool<T>` preallocates storage for a fixed number of `T` values in
/// one contiguous array and hands out [`Pooled<T>`] owning handles. Inserting
/// a value claims a slot from a lock-free free list; dropping the handle
/// tears the value down and returns the slot - no general-purpose allocation
/// happens on either path.
///
/// # Key features
///
/// - **Fixed capacity**: all storage is allocated at construction; the pool
///   never grows or shrinks.
/// - **Lock-free**: insertion and release are compare-exchange retry loops
///   that never block, from any number of threads concurrently.
/// - **Owning handles**: each live value has exactly one [`Pooled<T>`];
///   dropping it returns the slot automatically.
/// - **Exhaustion as a result**: inserting into a full pool returns
///   [`Exhausted`] with the rejected value, never panics or blocks.
/// - **Stable addresses**: values never move while pooled.
/// - **Weak back-references**: handles never keep the pool alive; the
///   [`DropPolicy`] governs values still live when the pool drops.
///
/// # Example
///
/// ```rust
/// use std::num::NonZero;
///
/// use atomic_pool::AtomicPool;
///
/// let pool = AtomicPool::<u32>::builder()
///     .capacity(NonZero::new(2).unwrap())
///     .build();
///
/// let first = pool.insert(5).unwrap();
/// let second = pool.insert(7).unwrap();
/// assert_eq!(pool.available(), 0);
///
/// // The pool is full; the rejected value comes back.
/// let rejected = pool.insert(9).unwrap_err().into_inner();
/// assert_eq!(rejected, 9);
///
/// // Releasing a handle makes room again.
/// drop(first);
/// let third = pool.insert(9).unwrap();
/// assert_eq!(*third, 9);
/// assert_eq!(*second, 7);
/// ```
///
/// # Thread safety
///
/// The pool is thread-safe ([`Send`] + [`Sync`]): share `&AtomicPool<T>`
/// freely across threads and insert from all of them concurrently. Handles
/// inherit the thread safety properties of `T` and may be released from any
/// thread.
pub struct AtomicPool<T>
where
    T: Send + 'static,
{
    /// Shared with issued handles via weak references; holds the slot array,
    /// the free list and the counters. This is the only strong reference, so
    /// dropping the pool drops the shared state regardless of outstanding
    /// handles.
    shared: Arc<PoolShared<T>>,
}

impl<T> AtomicPool<T>
where
    T: Send + 'static,
{
    /// Creates a builder for configuring and constructing an [`AtomicPool<T>`].
    ///
    /// You must specify a capacity using `.capacity()` before calling
    /// `.build()`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use atomic_pool::AtomicPool;
    ///
    /// let pool = AtomicPool::<String>::builder()
    ///     .capacity(NonZero::new(16).unwrap())
    ///     .build();
    /// ```
    pub fn builder() -> AtomicPoolBuilder<T> {
        AtomicPoolBuilder::new()
    }

    pub(crate) fn new_inner(capacity: NonZero<usize>, drop_policy: DropPolicy) -> Self {
        Self {
            shared: Arc::new(PoolShared::new(capacity, drop_policy)),
        }
    }

    /// Moves `value` into a free slot and returns the owning handle.
    ///
    /// On exhaustion the value is handed back inside [`Exhausted`]; nothing
    /// blocks, nothing is retried.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use atomic_pool::AtomicPool;
    ///
    /// let pool = AtomicPool::<String>::builder()
    ///     .capacity(NonZero::new(1).unwrap())
    ///     .build();
    ///
    /// let item = pool.insert("only one".to_string()).unwrap();
    ///
    /// let rejected = pool.insert("no room".to_string()).unwrap_err();
    /// assert_eq!(rejected.into_inner(), "no room");
    /// # drop(item);
    /// ```
    pub fn insert(&self, value: T) -> Result<Pooled<T>, Exhausted<T>> {
        let Some(ptr) = self.shared.claim() else {
            return Err(Exhausted::new(value));
        };

        // SAFETY: claim() handed us exclusive, properly aligned storage.
        unsafe {
            ptr.write(value);
        }

        Ok(self.wrap(ptr))
    }

    /// Initializes a value directly inside a free slot and returns the owning
    /// handle.
    ///
    /// This can be more efficient than constructing the value separately and
    /// moving it in, especially for large types. On exhaustion the
    /// initializer is handed back uninvoked inside [`Exhausted`]. If the
    /// initializer panics, the slot returns to the free list and the panic
    /// propagates.
    ///
    /// # Safety
    ///
    /// The initializer must fully initialize the `MaybeUninit<T>` before
    /// returning.
    pub unsafe fn insert_with<F>(&self, init: F) -> Result<Pooled<T>, Exhausted<F>>
    where
        F: FnOnce(&mut MaybeUninit<T>),
    {
        let Some(ptr) = self.shared.claim() else {
            return Err(Exhausted::new(init));
        };

        // If init panics, the slot goes back on the free list untouched.
        let guard = scopeguard::guard(ptr, |ptr| self.shared.restore(ptr));

        // SAFETY: claim() handed us exclusive storage; viewing it as
        // MaybeUninit makes no validity claim about its contents.
        init(unsafe { &mut *guard.as_ptr().cast::<MaybeUninit<T>>() });

        let ptr = ScopeGuard::into_inner(guard);
        Ok(self.wrap(ptr))
    }

    /// Fallibly initializes a value directly inside a free slot.
    ///
    /// If the initializer reports an error, the slot is returned to the free
    /// list - never leaked - the pool's available count is unchanged on
    /// balance, and the error is surfaced as [`TryInsertError::Init`]. If the
    /// initializer panics, the slot likewise returns to the free list and the
    /// panic propagates.
    ///
    /// # Safety
    ///
    /// The initializer must fully initialize the `MaybeUninit<T>` before
    /// returning `Ok(())`, and must leave it without a live value when
    /// returning `Err`.
    pub unsafe fn try_insert_with<F, E>(&self, init: F) -> Result<Pooled<T>, TryInsertError<E>>
    where
        F: FnOnce(&mut MaybeUninit<T>) -> Result<(), E>,
    {
        let Some(ptr) = self.shared.claim() else {
            return Err(TryInsertError::Exhausted);
        };

        // If init fails or panics, the slot goes back on the free list
        // untouched.
        let guard = scopeguard::guard(ptr, |ptr| self.shared.restore(ptr));

        // SAFETY: claim() handed us exclusive storage; viewing it as
        // MaybeUninit makes no validity claim about its contents.
        match init(unsafe { &mut *guard.as_ptr().cast::<MaybeUninit<T>>() }) {
            Ok(()) => {
                let ptr = ScopeGuard::into_inner(guard);
                Ok(self.wrap(ptr))
            }
            Err(error) => {
                drop(guard);
                Err(TryInsertError::Init(error))
            }
        }
    }

    /// Releases a value explicitly, tearing it down and returning its slot.
    ///
    /// Equivalent to dropping the handle, except that returning a handle to a
    /// pool that did not issue it is detected.
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by a different pool.
    pub fn remove(&self, handle: Pooled<T>) {
        assert_eq!(
            handle.pool_id(),
            self.shared.pool_id(),
            "handle returned to a pool that did not issue it"
        );

        let ptr = handle.into_raw();

        // SAFETY: The pool-ID check above proves this pool issued the value,
        // and consuming the handle guarantees release happens exactly once.
        unsafe {
            self.shared.release(ptr);
        }
    }

    /// Releases a value by raw pointer, tearing it down and returning its
    /// slot.
    ///
    /// This is the counterpart of [`Pooled::into_raw()`] for manual
    /// reclamation.
    ///
    /// # Safety
    ///
    /// `ptr` must have been obtained from [`Pooled::into_raw()`] on a handle
    /// this pool issued, and must not have been reclaimed since. There is no
    /// runtime detection of violations; double release or a foreign pointer
    /// is undefined behavior.
    pub unsafe fn remove_raw(&self, ptr: NonNull<T>) {
        // SAFETY: Forwarding the caller's contract.
        unsafe {
            self.shared.release(ptr);
        }
    }

    /// Returns the fixed number of slots in this pool.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity().get()
    }

    /// Returns the number of free slots.
    ///
    /// A relaxed atomic read: under concurrent insertion and release the
    /// value is advisory (monitoring, heuristics), not a synchronization
    /// primitive. Single-threaded, it is exact.
    #[must_use]
    pub fn available(&self) -> usize {
        self.shared.available()
    }

    /// Returns the number of values currently pooled.
    ///
    /// Advisory under concurrency, exactly like [`available()`](Self::available).
    #[must_use]
    pub fn len(&self) -> usize {
        // available() never exceeds capacity, so this cannot wrap.
        self.capacity().wrapping_sub(self.available())
    }

    /// Returns `true` if no values are currently pooled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wraps freshly initialized item storage into an owning handle carrying
    /// the weak back-reference to this pool.
    fn wrap(&self, ptr: NonNull<T>) -> Pooled<T> {
        let shared: Arc<dyn Reclaimer> = Arc::clone(&self.shared) as Arc<dyn Reclaimer>;
        let reclaimer: Weak<dyn Reclaimer> = Arc::downgrade(&shared);
        Pooled::new(ptr, self.shared.pool_id(), reclaimer)
    }
}

impl<T> fmt::Debug for AtomicPool<T>
where
    T: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicPool")
            .field("shared", &self.shared)
            .finish()
    }
}
