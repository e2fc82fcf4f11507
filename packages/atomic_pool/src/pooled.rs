use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::sync::Weak;

use crate::Reclaimer;

/// Owning handle to one value stored in an [`AtomicPool`].
///
/// Each live value has exactly one handle. The handle cannot be copied or
/// cloned; moving it transfers ownership. When it is dropped, the value is
/// torn down and its slot returns to the pool automatically.
///
/// # Back-reference, not a reference
///
/// The handle reaches its pool through a weak back-reference, so it never
/// keeps the pool alive. If the pool is dropped first - a violation of the
/// destruction-ordering contract that the pool itself mitigates according to
/// its [`DropPolicy`] - releasing the handle degrades to a no-op. A release
/// that races pool destruction either completes fully or degrades to that
/// no-op; there is no partially-destroyed middle state.
///
/// # Example
///
/// ```rust
/// use std::num::NonZero;
///
/// use atomic_pool::AtomicPool;
///
/// let pool = AtomicPool::<String>::builder()
///     .capacity(NonZero::new(4).unwrap())
///     .build();
///
/// let mut greeting = pool.insert("Hello".to_string()).unwrap();
///
/// // Direct access through Deref and DerefMut.
/// greeting.push_str(", World!");
/// assert_eq!(&*greeting, "Hello, World!");
///
/// // Dropping the handle returns the slot to the pool.
/// assert_eq!(pool.available(), 3);
/// drop(greeting);
/// assert_eq!(pool.available(), 4);
/// ```
///
/// # Thread safety
///
/// The handle is [`Send`] when `T` is [`Send`] and [`Sync`] when `T` is
/// [`Sync`]; it may be released from any thread.
///
/// [`AtomicPool`]: crate::AtomicPool
/// [`DropPolicy`]: crate::DropPolicy
#[must_use]
pub struct Pooled<T> {
    /// The live value. Stable for the lifetime of the handle.
    ptr: NonNull<T>,

    /// Ensures this handle can only be returned to the pool that issued it.
    pool_id: u64,

    /// Weak back-reference to the issuing pool's release machinery.
    pool: Weak<dyn Reclaimer>,
}

impl<T> Pooled<T> {
    pub(crate) fn new(ptr: NonNull<T>, pool_id: u64, pool: Weak<dyn Reclaimer>) -> Self {
        Self { ptr, pool_id, pool }
    }

    pub(crate) fn pool_id(&self) -> u64 {
        self.pool_id
    }

    /// Returns a pointer to the pooled value.
    ///
    /// The pointer stays valid until the handle is dropped (or consumed by
    /// [`AtomicPool::remove()`]) or the pool itself is dropped, whichever
    /// comes first. The caller must uphold Rust's aliasing rules when using
    /// it.
    ///
    /// [`AtomicPool::remove()`]: crate::AtomicPool::remove
    #[must_use]
    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    /// Consumes the handle without releasing the value, returning the raw
    /// pointer to it.
    ///
    /// The value stays live and its slot stays claimed. Reclaim it later with
    /// [`AtomicPool::remove_raw()`]; until then the pool considers the slot
    /// in use, and if it is never reclaimed the value leaks (its teardown
    /// runs, at the earliest, when the pool itself is dropped).
    ///
    /// [`AtomicPool::remove_raw()`]: crate::AtomicPool::remove_raw
    #[must_use]
    pub fn into_raw(self) -> NonNull<T> {
        let this = ManuallyDrop::new(self);

        // SAFETY: `self` is wrapped in ManuallyDrop, so neither its Drop nor
        // a second read of this field can ever run; we move the
        // back-reference out so the weak count is released.
        drop(unsafe { ptr::read(&this.pool) });

        this.ptr
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: The handle uniquely owns a live value for as long as it
        // exists; the pool outliving its handles is the caller's contract.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: As in deref(), plus exclusivity via &mut self.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for Pooled<T> {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.upgrade() {
            // The upgraded reference keeps the pool's shared state alive
            // until reclaim returns, even if the pool facade is being
            // dropped on another thread right now.
            //
            // SAFETY: We own the value, it was issued by this pool, and
            // consuming the handle guarantees release happens exactly once.
            unsafe {
                pool.reclaim(self.ptr.cast());
            }
        }
        // Pool died first: release degrades to a no-op. The pool already
        // applied its drop policy to the value.
    }
}

impl<T> fmt::Debug for Pooled<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("value", &**self)
            .field("pool_id", &self.pool_id)
            .finish_non_exhaustive()
    }
}

// SAFETY: The handle is the unique owner of the value, so sending it merely
// moves the value (and a release that may now run on the receiving thread),
// which `T: Send` permits. The back-reference is a `Weak` to state that is
// itself Send + Sync.
unsafe impl<T: Send> Send for Pooled<T> {}

// SAFETY: Sharing the handle only exposes `&T` (via Deref), which is exactly
// what `T: Sync` permits.
unsafe impl<T: Sync> Sync for Pooled<T> {}
