use std::alloc::{Layout, alloc, dealloc};
use std::fmt;
use std::num::NonZero;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicPtr, AtomicU64, AtomicUsize, Ordering};
use std::{ptr, thread};

use crate::{DropPolicy, Reclaimer, Slot};

/// Global counter for generating unique pool IDs.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique pool ID.
fn generate_pool_id() -> u64 {
    POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// The part of a pool that is shared between the pool facade and the handles
/// it has issued.
///
/// Owns the backing slot array (allocated once in `new()`, freed in `drop()`),
/// the free-list head and the available-slot counter. The facade holds the
/// only strong reference; handles hold weak back-references, so dropping the
/// facade drops this state no matter how many handles are still outstanding.
///
/// # Concurrency
///
/// `claim()` and `restore()` are lock-free: the free-list head is advanced
/// with compare-exchange retry loops and the counter uses relaxed
/// read-modify-write operations. No other state is mutated after construction.
pub(crate) struct PoolShared<T> {
    /// Distinguishes this pool from every other pool in the process, so a
    /// handle can never return its slot to a pool that did not issue it.
    pool_id: u64,

    /// Number of slots in the backing array. Fixed for the pool's lifetime.
    capacity: NonZero<usize>,

    /// First slot of the backing array.
    slots: NonNull<Slot<T>>,

    /// Layout used to allocate the backing array; required again to free it.
    array_layout: Layout,

    /// Head of the free list. Null when the pool is exhausted.
    free_head: AtomicPtr<Slot<T>>,

    /// Number of slots currently on the free list. Maintained in lockstep
    /// with the list itself but read without synchronization; see
    /// [`available()`](Self::available).
    available: AtomicUsize,

    /// Determines how still-occupied slots are treated when the pool drops.
    drop_policy: DropPolicy,
}

impl<T> PoolShared<T> {
    /// Creates the shared state with `capacity` vacant slots, all linked into
    /// the free list in array order.
    pub(crate) fn new(capacity: NonZero<usize>, drop_policy: DropPolicy) -> Self {
        let array_layout = Layout::array::<Slot<T>>(capacity.get())
            .expect("slot array layout cannot overflow for a capacity the process can address");

        let slots = NonNull::new(
            // SAFETY: The layout is non-zero-sized because a slot always holds
            // at least the free-list link.
            unsafe { alloc(array_layout) },
        )
        .expect("we do not intend to handle allocation failure as a real possibility - OOM results in panic")
        .cast::<Slot<T>>();

        // Thread every slot onto the free list, each linking to its array
        // successor and the last one terminating the list.
        for index in 0..capacity.get() {
            // Cannot overflow because the array fits in virtual memory.
            let successor = index.wrapping_add(1);

            let next = if successor == capacity.get() {
                ptr::null_mut()
            } else {
                // SAFETY: successor < capacity, so the offset stays within
                // the allocation.
                unsafe { slots.add(successor) }.as_ptr()
            };

            // SAFETY: index < capacity, so the offset stays within the
            // allocation we made above.
            let slot = unsafe { slots.add(index) };

            // SAFETY: The memory is fresh, in bounds and unshared.
            unsafe {
                slot.write(Slot::vacant(next));
            }
        }

        Self {
            pool_id: generate_pool_id(),
            capacity,
            slots,
            array_layout,
            free_head: AtomicPtr::new(slots.as_ptr()),
            available: AtomicUsize::new(capacity.get()),
            drop_policy,
        }
    }

    /// Returns the process-unique identifier of this pool.
    #[must_use]
    pub(crate) fn pool_id(&self) -> u64 {
        self.pool_id
    }

    /// Returns the fixed slot count of this pool.
    #[must_use]
    pub(crate) fn capacity(&self) -> NonZero<usize> {
        self.capacity
    }

    /// Returns the number of slots currently on the free list.
    ///
    /// A relaxed read: under concurrent claims and restores the value is
    /// advisory, not a transactionally consistent snapshot.
    #[must_use]
    pub(crate) fn available(&self) -> usize {
        self.available.load(Ordering::Relaxed)
    }

    /// Claims a vacant slot, removing it from the free list.
    ///
    /// Returns the address of the slot's item storage, uninitialized and
    /// exclusively owned by the caller, or `None` if the pool is exhausted.
    /// Never blocks; contention is resolved by retrying the compare-exchange.
    ///
    /// Every claimed slot must be initialized and eventually passed to
    /// [`release()`](Self::release), or handed back untouched via
    /// [`restore()`](Self::restore), before the pool is dropped.
    #[cfg_attr(test, mutants::skip)] // Mutating the compare-exchange check produces an infinite retry loop.
    pub(crate) fn claim(&self) -> Option<NonNull<T>> {
        loop {
            let Some(head) = NonNull::new(self.free_head.load(Ordering::Acquire)) else {
                // Exhausted. Not an error at this layer; the caller decides.
                return None;
            };

            // SAFETY: head points into our slot array, which stays allocated
            // for the pool's lifetime.
            let head_slot = unsafe { head.as_ref() };

            // SAFETY: `head` was read from the free list, so the link
            // interpretation is current; if another thread claims it first,
            // the compare-exchange below fails and we discard this value.
            let next = unsafe { head_slot.link() }.load(Ordering::Acquire);

            // ABA caveat: a slot that leaves and re-enters the list between
            // our loads and this compare-exchange can only do so through a
            // full restore(), which rewrites its link. The swap below can
            // therefore install a stale `next` only if `head` itself is
            // unchanged, in which case `next` is current again.
            if self
                .free_head
                .compare_exchange_weak(head.as_ptr(), next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                self.available.fetch_sub(1, Ordering::Relaxed);

                // Both union interpretations live at offset zero.
                return Some(head.cast::<T>());
            }
            // Lost the race; reload the head and retry.
        }
    }

    /// Returns a claimed slot to the free list without touching its contents.
    ///
    /// This is the mirror of [`claim()`](Self::claim): it runs no teardown, so
    /// it is the right way back for a slot whose initialization never
    /// happened. The slot becomes eligible for the next claim as soon as the
    /// compare-exchange succeeds.
    #[cfg_attr(test, mutants::skip)] // Mutating the compare-exchange check produces an infinite retry loop.
    pub(crate) fn restore(&self, value: NonNull<T>) {
        // Both union interpretations live at offset zero.
        let slot: NonNull<Slot<T>> = value.cast();

        // SAFETY: The slot is within our array, which stays allocated for the
        // pool's lifetime.
        let slot_ref = unsafe { slot.as_ref() };

        loop {
            let head = self.free_head.load(Ordering::Relaxed);

            // SAFETY: The caller owns this claimed slot exclusively until the
            // compare-exchange below publishes it back onto the list.
            unsafe { slot_ref.link() }.store(head, Ordering::Relaxed);

            if self
                .free_head
                .compare_exchange_weak(head, slot.as_ptr(), Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                self.available.fetch_add(1, Ordering::Relaxed);
                return;
            }
            // Lost the race; reload the head and retry.
        }
    }

    /// Drops the value in place and returns its slot to the free list.
    ///
    /// # Safety
    ///
    /// `value` must point at a live item previously issued by this pool's
    /// [`claim()`](Self::claim) that has not been released or restored since.
    pub(crate) unsafe fn release(&self, value: NonNull<T>) {
        // SAFETY: The caller guarantees the pointer addresses a live value
        // that nothing else will touch again.
        unsafe {
            ptr::drop_in_place(value.as_ptr());
        }

        self.restore(value);
    }
}

impl<T> Reclaimer for PoolShared<T>
where
    T: Send,
{
    unsafe fn reclaim(&self, ptr: NonNull<u8>) {
        // SAFETY: The reclaimer contract mirrors release(): the pointer
        // addresses a live value of this pool's element type.
        unsafe {
            self.release(ptr.cast::<T>());
        }
    }
}

impl<T> Drop for PoolShared<T> {
    #[expect(
        clippy::indexing_slicing,
        clippy::arithmetic_side_effects,
        reason = "indices derive from offset_from within the slot array bounds"
    )]
    fn drop(&mut self) {
        let capacity = self.capacity.get();

        // Walk the free list to learn which slots are vacant; the rest still
        // hold live values. We have exclusive access, so plain loads suffice.
        let mut is_vacant = vec![false; capacity];

        let mut cursor = *self.free_head.get_mut();
        while let Some(slot) = NonNull::new(cursor) {
            // SAFETY: Free-list members all point into our slot array.
            let index = unsafe { slot.as_ptr().offset_from(self.slots.as_ptr()) };
            let index = usize::try_from(index).expect("free-list members are within the slot array");

            is_vacant[index] = true;

            // SAFETY: The slot is within our array, which is still allocated.
            let slot_ref = unsafe { slot.as_ref() };

            // SAFETY: The slot is on the free list, so the link
            // interpretation is current.
            cursor = unsafe { slot_ref.link() }.load(Ordering::Relaxed);
        }

        let mut occupied = 0_usize;
        for (index, vacant) in is_vacant.iter().enumerate() {
            if *vacant {
                continue;
            }

            occupied += 1;

            // SAFETY: index < capacity, so the offset stays in bounds; both
            // union interpretations live at offset zero.
            let value = unsafe { self.slots.add(index) }.cast::<T>();

            // SAFETY: A slot that is not on the free list holds a live value;
            // claim()'s contract obliges every claimant to have initialized
            // it. We drop each such value exactly once, before freeing the
            // array below.
            unsafe {
                ptr::drop_in_place(value.as_ptr());
            }
        }

        debug_assert_eq!(
            capacity - occupied,
            *self.available.get_mut(),
            "available-count out of sync with the free list at pool drop"
        );

        // SAFETY: Allocated with this same layout in new() and not yet freed.
        unsafe {
            dealloc(self.slots.as_ptr().cast(), self.array_layout);
        }

        // We free the memory first and only then apply the policy check.
        // If we are already panicking, another panic would just obscure the
        // original one.
        if !thread::panicking() && matches!(self.drop_policy, DropPolicy::MustNotDropItems) {
            assert!(
                occupied == 0,
                "dropped a pool with {occupied} live values - this is forbidden by DropPolicy::MustNotDropItems"
            );
        }
    }
}

impl<T> fmt::Debug for PoolShared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolShared")
            .field("pool_id", &self.pool_id)
            .field("capacity", &self.capacity)
            .field("available", &self.available)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

// SAFETY: PoolShared owns its slot array exclusively and hands out item
// storage only through the claim/release protocol. Moving the pool between
// threads moves `T` values with it, hence the `T: Send` bound.
unsafe impl<T: Send> Send for PoolShared<T> {}

// SAFETY: All shared mutation goes through the atomic free-list head and the
// atomic counter; item storage is only ever accessed by the single claimant
// that currently owns it. Values may be dropped from whichever thread
// releases last, which `T: Send` already permits.
unsafe impl<T: Send> Sync for PoolShared<T> {}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::rc::Rc;

    use new_zealand::nz;

    use super::*;

    /// Test helper that tracks whether it has been dropped.
    struct DropTracker {
        dropped: Rc<Cell<bool>>,
    }

    impl DropTracker {
        fn new() -> (Self, Rc<Cell<bool>>) {
            let dropped = Rc::new(Cell::new(false));
            (
                Self {
                    dropped: Rc::clone(&dropped),
                },
                dropped,
            )
        }
    }

    impl Drop for DropTracker {
        fn drop(&mut self) {
            self.dropped.set(true);
        }
    }

    #[test]
    fn smoke_test() {
        let shared = PoolShared::<u32>::new(nz!(3), DropPolicy::MayDropItems);

        assert_eq!(shared.available(), 3);

        let a = shared.claim().unwrap();
        let b = shared.claim().unwrap();
        let c = shared.claim().unwrap();

        assert_eq!(shared.available(), 0);

        // Every claim must hand out distinct storage.
        let distinct = HashSet::from([a.as_ptr(), b.as_ptr(), c.as_ptr()]);
        assert_eq!(distinct.len(), 3);

        // SAFETY: Freshly claimed storage is ours to initialize.
        unsafe {
            a.write(42);
            b.write(43);
            c.write(44);
        }

        // SAFETY: We initialized the values above.
        unsafe {
            assert_eq!(a.read(), 42);
            assert_eq!(b.read(), 43);
            assert_eq!(c.read(), 44);
        }

        // SAFETY: The values are live and released exactly once each.
        unsafe {
            shared.release(a);
            shared.release(b);
            shared.release(c);
        }

        assert_eq!(shared.available(), 3);
    }

    #[test]
    fn exhaustion_reports_none_without_blocking() {
        let shared = PoolShared::<u64>::new(nz!(1), DropPolicy::MayDropItems);

        let only = shared.claim().unwrap();
        // SAFETY: Freshly claimed storage is ours to initialize.
        unsafe { only.write(7) };

        assert!(shared.claim().is_none());
        assert!(shared.claim().is_none());
        assert_eq!(shared.available(), 0);

        // SAFETY: The value is live and released exactly once.
        unsafe { shared.release(only) };
        assert_eq!(shared.available(), 1);
    }

    #[test]
    fn released_slot_is_reused() {
        let shared = PoolShared::<u32>::new(nz!(1), DropPolicy::MayDropItems);

        let first = shared.claim().unwrap();
        // SAFETY: Freshly claimed storage is ours to initialize.
        unsafe { first.write(1) };
        // SAFETY: The value is live and released exactly once.
        unsafe { shared.release(first) };

        // The free list is a stack, so the same storage comes right back.
        let second = shared.claim().unwrap();
        assert_eq!(second.as_ptr(), first.as_ptr());

        // SAFETY: As above.
        unsafe { second.write(2) };
        // SAFETY: As above.
        unsafe { shared.release(second) };
    }

    #[test]
    fn restore_skips_teardown() {
        let shared = PoolShared::<DropTracker>::new(nz!(1), DropPolicy::MayDropItems);

        let storage = shared.claim().unwrap();
        assert_eq!(shared.available(), 0);

        // Initialization never happened, so the slot goes back untouched.
        shared.restore(storage);
        assert_eq!(shared.available(), 1);
    }

    #[test]
    fn pool_drop_tears_down_live_values() {
        let shared = PoolShared::<DropTracker>::new(nz!(2), DropPolicy::MayDropItems);

        let (tracker, dropped) = DropTracker::new();

        let storage = shared.claim().unwrap();
        // SAFETY: Freshly claimed storage is ours to initialize.
        unsafe { storage.write(tracker) };

        assert!(!dropped.get());

        drop(shared);

        assert!(dropped.get(), "pool drop must tear down live values");
    }

    #[test]
    #[should_panic]
    fn drop_with_live_values_panics_under_strict_policy() {
        let shared = PoolShared::<u32>::new(nz!(2), DropPolicy::MustNotDropItems);

        let storage = shared.claim().unwrap();
        // SAFETY: Freshly claimed storage is ours to initialize.
        unsafe { storage.write(5) };

        // Dropping the pool with a live value must panic.
    }

    #[test]
    fn pool_ids_are_unique() {
        let first = PoolShared::<u8>::new(nz!(1), DropPolicy::MayDropItems);
        let second = PoolShared::<u8>::new(nz!(1), DropPolicy::MayDropItems);

        assert_ne!(first.pool_id(), second.pool_id());
    }
}
