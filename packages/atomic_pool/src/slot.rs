use std::cell::UnsafeCell;
use std::mem::{ManuallyDrop, MaybeUninit};
use std::sync::atomic::AtomicPtr;

/// One storage unit in a pool's backing array.
///
/// A slot has two mutually exclusive interpretations of the same bytes: while
/// it sits on the free list it holds the link to the next free slot, and while
/// it is occupied it holds one live `T`. Both interpretations start at offset
/// zero, so a slot is exactly as large and as aligned as the bigger of the two.
///
/// The slot does not record which interpretation is current. That is encoded
/// in reachability: slots reachable from the free-list head are vacant, slots
/// behind a live handle are occupied, and the pool's compare-exchange on the
/// head is the only transition between the two states.
#[repr(C)]
pub(crate) union Slot<T> {
    /// Link to the next free slot, or null for the list terminator.
    /// Meaningful only while the slot is vacant.
    link: ManuallyDrop<AtomicPtr<Slot<T>>>,

    /// Storage for one item. Meaningful only while the slot is occupied.
    ///
    /// Never accessed by name: occupied slots are reached through pointer
    /// casts that keep whole-slot provenance. The field exists to give the
    /// slot the item's size and alignment, and its `UnsafeCell` makes holding
    /// a `&Slot` while another thread initializes a just-claimed slot a
    /// non-issue under the aliasing rules.
    #[allow(
        dead_code,
        reason = "layout-only interpretation, reached via pointer casts"
    )]
    value: ManuallyDrop<UnsafeCell<MaybeUninit<T>>>,
}

impl<T> Slot<T> {
    /// Creates a vacant slot linked to `next`.
    pub(crate) fn vacant(next: *mut Slot<T>) -> Self {
        Self {
            link: ManuallyDrop::new(AtomicPtr::new(next)),
        }
    }

    /// Returns the free-list link of this slot.
    ///
    /// # Safety
    ///
    /// The slot must be vacant, or in the process of being claimed from or
    /// pushed onto the free list by the calling thread. A racing claimant may
    /// observe the link of a slot that has just left the list; the load itself
    /// is atomic (never a data race) and the stale value is discarded when the
    /// head compare-exchange fails.
    pub(crate) unsafe fn link(&self) -> &AtomicPtr<Slot<T>> {
        // SAFETY: Any bit pattern is a valid `AtomicPtr`, so reinterpreting
        // the slot bytes as the link can never produce an invalid value;
        // whether the value is meaningful is the caller's contract.
        unsafe { &self.link }
    }
}

#[cfg(test)]
mod tests {
    use std::ptr;
    use std::sync::atomic::Ordering;

    use super::*;

    #[test]
    fn layout_covers_both_interpretations() {
        // A slot must be able to hold the link even for tiny item types...
        assert!(size_of::<Slot<u8>>() >= size_of::<*mut Slot<u8>>());
        assert!(align_of::<Slot<u8>>() >= align_of::<*mut Slot<u8>>());

        // ...and the item even when it dwarfs the link.
        assert!(size_of::<Slot<[u64; 16]>>() >= size_of::<[u64; 16]>());
        assert!(align_of::<Slot<[u64; 16]>>() >= align_of::<[u64; 16]>());
    }

    #[test]
    fn vacant_slot_links_to_next() {
        let mut target = Slot::<u32>::vacant(ptr::null_mut());
        let target_ptr: *mut Slot<u32> = &raw mut target;

        let slot = Slot::<u32>::vacant(target_ptr);

        // SAFETY: The slot is vacant; we created it a line above.
        let link = unsafe { slot.link() };
        assert_eq!(link.load(Ordering::Relaxed), target_ptr);

        link.store(ptr::null_mut(), Ordering::Relaxed);
        assert!(link.load(Ordering::Relaxed).is_null());
    }
}
