//! Helpers that construct and destroy runs of slots behind raw pointers.
//!
//! None of these know where the slots live or who owns them. The caller promises that
//! destination slots are raw, source slots are live, and that the ranges do not overlap.
//! Each constructing helper is all-or-nothing: if producing a value panics, the values
//! already written by that call are dropped again and every destination slot is raw.

use std::ptr;

use scopeguard::ScopeGuard;

/// Drops `count` live values starting at `first`, leaving the slots raw.
#[inline(always)]
pub unsafe fn destroy_raw<T>(first: *mut T, count: usize) {
    ptr::drop_in_place(ptr::slice_from_raw_parts_mut(first, count));
}

/// Writes `count` values produced by `make` into raw slots starting at `first`.
pub unsafe fn fill_raw_with<T, F>(first: *mut T, count: usize, mut make: F) where F: FnMut() -> T {
    let mut written = scopeguard::guard(0usize, |written| {
        destroy_raw(first, written);
    });
    while *written < count {
        first.add(*written).write(make());
        *written += 1;
    }
    ScopeGuard::into_inner(written);
}

/// Clones `count` live values from `src` into raw slots at `dst`. The source is never modified.
pub unsafe fn clone_into_raw<T: Clone>(src: *const T, dst: *mut T, count: usize) {
    let mut written = scopeguard::guard(0usize, |written| {
        debug!("clone of {} aborted after {} of {} values", crate::logging::element_name::<T>(), written, count);
        destroy_raw(dst, written);
    });
    while *written < count {
        dst.add(*written).write((*src.add(*written)).clone());
        *written += 1;
    }
    ScopeGuard::into_inner(written);
}
