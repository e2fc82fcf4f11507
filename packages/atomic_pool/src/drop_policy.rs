/// Determines how a pool treats values that are still live when the pool
/// itself is dropped.
///
/// The destruction-ordering contract is that every [`Pooled<T>`] handle is
/// released before its pool is dropped. Because handles hold only weak
/// back-references, the pool cannot extend its own lifetime to wait for
/// stragglers; this policy decides what happens to their values instead.
///
/// Handles that outlive the pool remain safe to drop (release degrades to a
/// no-op) but must not be dereferenced once the pool is gone.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use atomic_pool::{AtomicPool, DropPolicy};
///
/// // The drop policy is set at pool creation time.
/// let pool = AtomicPool::<u32>::builder()
///     .capacity(NonZero::new(16).unwrap())
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build();
/// ```
///
/// [`Pooled<T>`]: crate::Pooled
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool tears down any still-live values when it is dropped. This is
    /// the default.
    #[default]
    MayDropItems,

    /// The pool panics if any value is still live when it is dropped.
    ///
    /// This may be valuable if there are external requirements before the
    /// values can be dropped. For example, it may be known that unsafe code
    /// holds out-of-band pointers to pooled values, with handles only
    /// released after such pointers have been discarded.
    MustNotDropItems,
}
