use std::ptr;

use crate::dontdothis;

/// How live elements are carried into a freshly allocated block when a `DynamicArray` grows.
///
/// The choice is made per array type at compile time, through the `P` parameter of
/// `DynamicArray<T, P>`. A policy either moves (the old slots become raw) or copies (the
/// old slots stay live and the array destroys them once the new block is complete).
///
/// # Safety
///
/// Implementations must uphold the contract documented on `transplant`. In particular a
/// policy with `MOVES == true` must never unwind, because a half-finished move can not be
/// undone.
pub unsafe trait Transplant<T> {
    /// `true` if the source slots are raw after a successful transplant.
    const MOVES: bool;

    /// Carries `count` live values starting at `src` into raw slots starting at `dst`.
    ///
    /// If this unwinds, every slot at `dst` is raw again and the source is untouched.
    ///
    /// # Safety
    ///
    /// `src..src + count` must be live, `dst..dst + count` raw, and the ranges must not overlap.
    unsafe fn transplant(src: *const T, dst: *mut T, count: usize);
}

/// Relocates elements bitwise.
///
/// Moving a Rust value can not fail midway, so this policy works for every element type
/// and is the default.
#[derive(Debug)]
pub enum ByMove {}

/// Clones elements into the new block and leaves the originals in place until the block
/// is complete.
///
/// A panicking `clone` aborts the growth with the array exactly as it was: the clones made
/// so far are dropped, the new block is released, and no original was touched.
#[derive(Debug)]
pub enum ByClone {}

unsafe impl<T> Transplant<T> for ByMove {
    const MOVES: bool = true;

    #[inline(always)]
    unsafe fn transplant(src: *const T, dst: *mut T, count: usize) {
        ptr::copy_nonoverlapping(src, dst, count);
    }
}

unsafe impl<T: Clone> Transplant<T> for ByClone {
    const MOVES: bool = false;

    #[inline(always)]
    unsafe fn transplant(src: *const T, dst: *mut T, count: usize) {
        dontdothis::clone_into_raw(src, dst, count);
    }
}
