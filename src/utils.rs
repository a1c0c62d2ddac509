//! Helpers for code which runs in the realtime production context.

// -------------------------------------------------------------------------------------------------

/// Run `func` and, with the `assert-allocs` feature enabled, assert that it doesn't allocate.
#[inline]
pub(crate) fn assert_no_alloc<T, F: FnOnce() -> T>(func: F) -> T {
    #[cfg(feature = "assert-allocs")]
    return assert_no_alloc::assert_no_alloc::<T, F>(func);

    #[cfg(not(feature = "assert-allocs"))]
    return func();
}

/// Run `func` with allocations permitted within an [`assert_no_alloc`] scope.
#[inline]
pub(crate) fn permit_alloc<T, F: FnOnce() -> T>(func: F) -> T {
    #[cfg(feature = "assert-allocs")]
    return assert_no_alloc::permit_alloc::<T, F>(func);

    #[cfg(not(feature = "assert-allocs"))]
    return func();
}

// -------------------------------------------------------------------------------------------------

/// Fill the given interleaved buffer with silence.
#[inline]
pub(crate) fn clear_buffer(buffer: &mut [i16]) {
    buffer.fill(0);
}
