use std::error::Error;
use std::fmt;

/// Returned by the insertion methods of [`AtomicPool`] when no free slot
/// remains.
///
/// Carries the rejected payload - the value for
/// [`insert()`][crate::AtomicPool::insert], the initializer closure for
/// [`insert_with()`][crate::AtomicPool::insert_with] - so the caller can
/// recover it without a clone and retry later.
///
/// Exhaustion is an expected result, not a fault: the pool neither blocks nor
/// retries, and nothing is logged.
///
/// [`AtomicPool`]: crate::AtomicPool
pub struct Exhausted<P>(P);

impl<P> Exhausted<P> {
    pub(crate) fn new(payload: P) -> Self {
        Self(payload)
    }

    /// Returns the payload that could not be inserted.
    #[must_use]
    pub fn into_inner(self) -> P {
        self.0
    }
}

impl<P> fmt::Debug for Exhausted<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The payload is deliberately not shown; it may not implement Debug.
        f.debug_tuple("Exhausted").finish_non_exhaustive()
    }
}

impl<P> fmt::Display for Exhausted<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("pool has no free slots")
    }
}

impl<P> Error for Exhausted<P> {}

/// Returned by [`try_insert_with()`][crate::AtomicPool::try_insert_with] when
/// fallible in-place initialization does not produce a pooled value.
#[derive(Debug)]
#[non_exhaustive]
pub enum TryInsertError<E> {
    /// The pool had no free slot. The initializer was never run.
    Exhausted,

    /// The initializer failed. Its slot has already been returned to the
    /// free list, so the pool's available count is unchanged on balance.
    Init(E),
}

impl<E> fmt::Display for TryInsertError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => f.write_str("pool has no free slots"),
            Self::Init(_) => f.write_str("value initialization failed"),
        }
    }
}

impl<E> Error for TryInsertError<E>
where
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Exhausted => None,
            Self::Init(inner) => Some(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_returns_payload() {
        let error = Exhausted::new("value".to_string());
        assert_eq!(error.into_inner(), "value");
    }

    #[test]
    fn exhausted_display_and_debug() {
        // The payload stays out of both renderings.
        struct Opaque;

        let error = Exhausted::new(Opaque);
        assert_eq!(error.to_string(), "pool has no free slots");
        assert!(format!("{error:?}").contains("Exhausted"));
    }

    #[test]
    fn try_insert_error_display() {
        let exhausted: TryInsertError<fmt::Error> = TryInsertError::Exhausted;
        assert_eq!(exhausted.to_string(), "pool has no free slots");

        let init = TryInsertError::Init(fmt::Error);
        assert_eq!(init.to_string(), "value initialization failed");
    }

    #[test]
    fn try_insert_error_exposes_source() {
        let init = TryInsertError::Init(fmt::Error);
        assert!(init.source().is_some());

        let exhausted: TryInsertError<fmt::Error> = TryInsertError::Exhausted;
        assert!(exhausted.source().is_none());
    }
}
