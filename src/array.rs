use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::{mem, ptr, slice};

use scopeguard::ScopeGuard;

use crate::dontdothis::{clone_into_raw, destroy_raw, fill_raw_with};
use crate::{ByMove, RawStorage, StorageError, Transplant};

/// Contiguous growable array of `T` built on a single `RawStorage<T>`.
///
/// Slots `[0, len)` of the storage hold live values, slots `[len, capacity)` are raw.
/// When an append or insert runs out of room, the capacity doubles (starting at 1). The new
/// element is built directly at its final position in the new block first, then the existing
/// elements are carried over with the transplant policy `P`, and only then is the old block
/// released. A panic anywhere before the swap leaves the array exactly as it was.
///
/// Positional inserts and erases within the existing capacity shift elements in place and
/// only promise that the array stays valid if something panics.
///
/// References and raw pointers into the array are invalidated by every operation that
/// changes the capacity or shifts elements.
pub struct DynamicArray<T, P = ByMove> {
    _storage: RawStorage<T>,
    _len: usize,
    _policy: PhantomData<fn() -> P>,
}

impl<T> DynamicArray<T> {
    /// Empty array without a block.
    pub const fn new() -> DynamicArray<T> {
        DynamicArray::with_policy()
    }
}

impl<T, P> DynamicArray<T, P> {
    /// Empty array without a block, using transplant policy `P`.
    pub const fn with_policy() -> DynamicArray<T, P> {
        DynamicArray {
            _storage: RawStorage::new(),
            _len: 0,
            _policy: PhantomData,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self._len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self._len == 0
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self._storage.capacity()
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self._storage.as_ptr()
    }

    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self._storage.as_mut_ptr()
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self._storage.as_ptr(), self._len) }
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self._storage.as_mut_ptr(), self._len) }
    }

    /// Reference to element `index` without a bounds check.
    ///
    /// # Safety
    ///
    /// `index` must be below `len`. Only debug builds check it.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self._len, "index {} out of bounds (len {})", index, self._len);
        &*self._storage.address(index)
    }

    /// Mutable reference to element `index` without a bounds check.
    ///
    /// # Safety
    ///
    /// `index` must be below `len`. Only debug builds check it.
    #[inline(always)]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self._len, "index {} out of bounds (len {})", index, self._len);
        &mut *self._storage.address_mut(index)
    }

    pub fn front(&self) -> &T {
        assert!(self._len != 0, "front of an empty DynamicArray");
        unsafe { self.get_unchecked(0) }
    }

    pub fn front_mut(&mut self) -> &mut T {
        assert!(self._len != 0, "front of an empty DynamicArray");
        unsafe { self.get_unchecked_mut(0) }
    }

    pub fn back(&self) -> &T {
        assert!(self._len != 0, "back of an empty DynamicArray");
        unsafe { self.get_unchecked(self._len - 1) }
    }

    pub fn back_mut(&mut self) -> &mut T {
        assert!(self._len != 0, "back of an empty DynamicArray");
        let last = self._len - 1;
        unsafe { self.get_unchecked_mut(last) }
    }

    /// Drops the elements past `new_len`. Capacity is kept.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len >= self._len {
            return;
        }
        let surplus = self._len - new_len;
        // shorten first, a panicking drop must not see these again
        self._len = new_len;
        unsafe { destroy_raw(self._storage.address_mut(new_len), surplus) };
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Destroys the last element.
    pub fn pop_back(&mut self) {
        assert!(self._len != 0, "pop_back on an empty DynamicArray");
        self._len -= 1;
        let last = self._len;
        unsafe { ptr::drop_in_place(self._storage.address_mut(last)) };
    }

    /// Removes the element at `index` and returns it, shifting the tail left.
    pub fn remove(&mut self, index: usize) -> T {
        assert!(index < self._len, "remove position {} out of bounds (len {})", index, self._len);
        let tail = self._len - index - 1;
        unsafe {
            let slot = self._storage.address_mut(index);
            let removed = ptr::read(slot);
            ptr::copy(slot.add(1), slot, tail);
            self._len -= 1;
            removed
        }
    }

    /// Destroys the element at `index`, shifting the tail left. Returns the index of the
    /// element that now follows the erased one (`len` if it was the last).
    pub fn erase(&mut self, index: usize) -> usize {
        assert!(index < self._len, "erase position {} out of bounds (len {})", index, self._len);
        drop(self.remove(index));
        index
    }

    /// Sets the number of live elements without constructing or dropping anything.
    ///
    /// # Safety
    ///
    /// `new_len` must not exceed the capacity, and slots `[0, new_len)` must hold live values.
    #[inline(always)]
    pub unsafe fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.capacity(), "set_len {} past capacity {}", new_len, self.capacity());
        self._len = new_len;
    }

    /// Exchanges contents with `other` without touching any element.
    pub fn swap_with(&mut self, other: &mut DynamicArray<T, P>) {
        self._storage.swap(&mut other._storage);
        mem::swap(&mut self._len, &mut other._len);
    }

    /// Destroys the current elements and takes over the block of `other`, leaving it empty.
    pub fn move_from(&mut self, other: &mut DynamicArray<T, P>) {
        *self = mem::take(other);
    }
}

impl<T, P: Transplant<T>> DynamicArray<T, P> {
    /// Array of `len` default values.
    pub fn with_len(len: usize) -> DynamicArray<T, P> where T: Default {
        DynamicArray::try_with_len(len).unwrap_or_else(|e| e.raise())
    }

    pub fn try_with_len(len: usize) -> Result<DynamicArray<T, P>, StorageError> where T: Default {
        DynamicArray::try_from_fn(len, T::default)
    }

    /// Array of `len` values produced by `make`, in order.
    pub fn from_fn<F>(len: usize, make: F) -> DynamicArray<T, P> where F: FnMut() -> T {
        DynamicArray::try_from_fn(len, make).unwrap_or_else(|e| e.raise())
    }

    /// Array of `len` values produced by `make`. If `make` panics, the values produced so
    /// far are dropped and the block is released.
    pub fn try_from_fn<F>(len: usize, make: F) -> Result<DynamicArray<T, P>, StorageError> where F: FnMut() -> T {
        let mut storage = RawStorage::allocate(len)?;
        unsafe { fill_raw_with(storage.as_mut_ptr(), len, make) };
        Ok(DynamicArray {
            _storage: storage,
            _len: len,
            _policy: PhantomData,
        })
    }

    /// Empty array with room for exactly `capacity` elements.
    pub fn with_capacity(capacity: usize) -> DynamicArray<T, P> {
        DynamicArray::try_with_capacity(capacity).unwrap_or_else(|e| e.raise())
    }

    pub fn try_with_capacity(capacity: usize) -> Result<DynamicArray<T, P>, StorageError> {
        Ok(DynamicArray {
            _storage: RawStorage::allocate(capacity)?,
            _len: 0,
            _policy: PhantomData,
        })
    }

    /// `true` if growth moves elements, `false` if it clones them.
    #[inline(always)]
    pub fn moves_on_growth() -> bool {
        P::MOVES
    }

    /// Makes room for at least `new_capacity` elements in total.
    pub fn reserve(&mut self, new_capacity: usize) {
        self.try_reserve(new_capacity).unwrap_or_else(|e| e.raise())
    }

    /// Reallocates to exactly `new_capacity` slots if that is more than the current capacity.
    pub fn try_reserve(&mut self, new_capacity: usize) -> Result<(), StorageError> {
        if new_capacity <= self.capacity() {
            return Ok(());
        }
        let storage = RawStorage::allocate(new_capacity)?;
        unsafe { self.adopt(storage, None) };
        Ok(())
    }

    /// Grows with default values or shrinks to `new_len`.
    pub fn resize(&mut self, new_len: usize) where T: Default {
        self.try_resize(new_len).unwrap_or_else(|e| e.raise())
    }

    pub fn try_resize(&mut self, new_len: usize) -> Result<(), StorageError> where T: Default {
        self.try_resize_with(new_len, T::default)
    }

    pub fn resize_with<F>(&mut self, new_len: usize, make: F) where F: FnMut() -> T {
        self.try_resize_with(new_len, make).unwrap_or_else(|e| e.raise())
    }

    /// Grows with values produced by `make` or shrinks to `new_len`.
    ///
    /// When growing, the block is reserved first. If `make` panics, the new values are
    /// dropped again and the length is unchanged, the larger capacity is kept.
    pub fn try_resize_with<F>(&mut self, new_len: usize, make: F) -> Result<(), StorageError> where F: FnMut() -> T {
        if new_len <= self._len {
            self.truncate(new_len);
            return Ok(());
        }
        self.try_reserve(new_len)?;
        let len = self._len;
        unsafe { fill_raw_with(self._storage.address_mut(len), new_len - len, make) };
        self._len = new_len;
        Ok(())
    }

    pub fn push_back(&mut self, value: T) {
        self.emplace_back_with(move || value);
    }

    pub fn try_push_back(&mut self, value: T) -> Result<(), StorageError> {
        self.try_emplace_back_with(move || value).map(|_| ())
    }

    /// Appends a clone of `value`. If the clone panics, the array is unchanged.
    pub fn push_back_clone(&mut self, value: &T) where T: Clone {
        self.emplace_back_with(|| value.clone());
    }

    pub fn emplace_back_with<F>(&mut self, make: F) -> &mut T where F: FnOnce() -> T {
        match self.try_emplace_back_with(make) {
            Ok(back) => back,
            Err(e) => e.raise(),
        }
    }

    /// Appends the value produced by `make` and returns a reference to it.
    ///
    /// On a full array the value is built in the new block before any existing element is
    /// carried over. If `make` or the transplant panics, or the block can not be obtained,
    /// length, capacity and contents are unchanged.
    pub fn try_emplace_back_with<F>(&mut self, make: F) -> Result<&mut T, StorageError> where F: FnOnce() -> T {
        let len = self._len;
        if len == self.capacity() {
            let mut storage: RawStorage<T> = RawStorage::allocate(self.grown_capacity()?)?;
            unsafe {
                storage.address_mut(len).write(make());
                self.adopt(storage, Some(len));
            }
        } else {
            unsafe { self._storage.address_mut(len).write(make()) };
        }
        self._len += 1;
        Ok(unsafe { &mut *self._storage.address_mut(len) })
    }

    pub fn insert(&mut self, index: usize, value: T) {
        self.emplace_with(index, move || value);
    }

    pub fn insert_clone(&mut self, index: usize, value: &T) where T: Clone {
        self.emplace_with(index, || value.clone());
    }

    pub fn emplace_with<F>(&mut self, index: usize, make: F) -> &mut T where F: FnOnce() -> T {
        match self.try_emplace_with(index, make) {
            Ok(value) => value,
            Err(e) => e.raise(),
        }
    }

    /// Inserts the value produced by `make` at `index` and returns a reference to it.
    /// `index == len` appends.
    ///
    /// On a full array this has the same all-or-nothing behavior as `try_emplace_back_with`,
    /// with the prefix and the suffix carried over around the new element. Within capacity
    /// the value is produced first, then the tail is shifted one slot right.
    pub fn try_emplace_with<F>(&mut self, index: usize, make: F) -> Result<&mut T, StorageError> where F: FnOnce() -> T {
        let len = self._len;
        assert!(index <= len, "insert position {} out of bounds (len {})", index, len);
        if len == self.capacity() {
            let mut storage: RawStorage<T> = RawStorage::allocate(self.grown_capacity()?)?;
            unsafe {
                storage.address_mut(index).write(make());
                self.adopt(storage, Some(index));
            }
        } else {
            let value = make();
            unsafe {
                let slot = self._storage.address_mut(index);
                ptr::copy(slot, slot.add(1), len - index);
                slot.write(value);
            }
        }
        self._len += 1;
        Ok(unsafe { &mut *self._storage.address_mut(index) })
    }

    fn grown_capacity(&self) -> Result<usize, StorageError> {
        let capacity = self.capacity();
        if capacity == 0 {
            Ok(1)
        } else {
            capacity.checked_mul(2).ok_or(StorageError::CapacityOverflow { capacity })
        }
    }

    /// Carries every live element into `storage` and swaps it in, releasing the old block.
    ///
    /// With `inserted == Some(at)`, slot `at` of `storage` already holds a live value: the
    /// elements before `at` keep their index and the rest move up by one. That value is
    /// dropped if the transplant unwinds, so the array is untouched on every failure path.
    unsafe fn adopt(&mut self, mut storage: RawStorage<T>, inserted: Option<usize>) {
        let len = self._len;
        let split = inserted.unwrap_or(len);
        let gap = inserted.map_or(0, |_| 1);
        let src = self._storage.as_ptr();
        let dst = storage.as_mut_ptr();

        debug!("grow {} from {} to {} slots ({} live)", crate::logging::element_name::<T>(), self.capacity(), storage.capacity(), len);

        if P::MOVES {
            P::transplant(src, dst, split);
            P::transplant(src.add(split), dst.add(split + gap), len - split);
        } else {
            let new_value = scopeguard::guard(inserted, |inserted| {
                if let Some(at) = inserted {
                    ptr::drop_in_place(dst.add(at));
                }
            });
            P::transplant(src, dst, split);
            let prefix = scopeguard::guard(split, |split| {
                destroy_raw(dst, split);
            });
            P::transplant(src.add(split), dst.add(split + gap), len - split);
            ScopeGuard::into_inner(prefix);
            ScopeGuard::into_inner(new_value);
        }

        self._storage.swap(&mut storage);
        if !P::MOVES {
            // copies are in place, the originals still live in the old block
            destroy_raw(storage.as_mut_ptr(), len);
        }
    }
}

impl<T, P> Drop for DynamicArray<T, P> {
    fn drop(&mut self) {
        let len = self._len;
        self._len = 0;
        unsafe { destroy_raw(self._storage.as_mut_ptr(), len) };
    }
}

impl<T, P> Default for DynamicArray<T, P> {
    fn default() -> Self {
        DynamicArray::with_policy()
    }
}

impl<T: Clone, P> Clone for DynamicArray<T, P> {
    /// Copies every element into a block sized to exactly `len`.
    fn clone(&self) -> Self {
        let mut storage = RawStorage::with_capacity(self._len);
        unsafe { clone_into_raw(self.as_ptr(), storage.as_mut_ptr(), self._len) };
        DynamicArray {
            _storage: storage,
            _len: self._len,
            _policy: PhantomData,
        }
    }

    /// Reuses the current block when it is large enough. Otherwise a full copy is built
    /// first and swapped in, so a panicking clone leaves `self` untouched.
    fn clone_from(&mut self, source: &Self) {
        if source._len > self.capacity() {
            let mut copy = source.clone();
            self.swap_with(&mut copy);
            return;
        }

        let shared = self._len.min(source._len);
        for (target, item) in self.as_mut_slice()[..shared].iter_mut().zip(&source.as_slice()[..shared]) {
            target.clone_from(item);
        }

        if source._len < self._len {
            self.truncate(source._len);
        } else {
            for item in &source.as_slice()[shared..] {
                let len = self._len;
                unsafe { self._storage.address_mut(len).write(item.clone()) };
                self._len += 1;
            }
        }
    }
}

impl<T, P> Deref for DynamicArray<T, P> {
    type Target = [T];

    #[inline(always)]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, P> DerefMut for DynamicArray<T, P> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, P> Index<usize> for DynamicArray<T, P> {
    type Output = T;

    #[inline(always)]
    fn index(&self, index: usize) -> &T {
        assert!(index < self._len, "index {} out of bounds (len {})", index, self._len);
        unsafe { self.get_unchecked(index) }
    }
}

impl<T, P> IndexMut<usize> for DynamicArray<T, P> {
    #[inline(always)]
    fn index_mut(&mut self, index: usize) -> &mut T {
        assert!(index < self._len, "index {} out of bounds (len {})", index, self._len);
        unsafe { self.get_unchecked_mut(index) }
    }
}

impl<T, P> AsRef<[T]> for DynamicArray<T, P> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, P> AsMut<[T]> for DynamicArray<T, P> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Debug, P> Debug for DynamicArray<T, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self.as_slice(), f)
    }
}

impl<T, U, P, Q> PartialEq<DynamicArray<U, Q>> for DynamicArray<T, P> where T: PartialEq<U> {
    fn eq(&self, other: &DynamicArray<U, Q>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T, U, P> PartialEq<[U]> for DynamicArray<T, P> where T: PartialEq<U> {
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T, U, P, const N: usize> PartialEq<[U; N]> for DynamicArray<T, P> where T: PartialEq<U> {
    fn eq(&self, other: &[U; N]) -> bool {
        self.as_slice() == &other[..]
    }
}

impl<T: Eq, P> Eq for DynamicArray<T, P> {}

impl<T, P: Transplant<T>> Extend<T> for DynamicArray<T, P> {
    fn extend<I: IntoIterator<Item=T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        if lower > self.capacity() - self._len {
            let grown = self.grown_capacity().unwrap_or_else(|e| e.raise());
            self.reserve(self._len.saturating_add(lower).max(grown));
        }
        for item in iter {
            self.push_back(item);
        }
    }
}

impl<'a, T: Copy + 'a, P: Transplant<T>> Extend<&'a T> for DynamicArray<T, P> {
    fn extend<I: IntoIterator<Item=&'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T, P: Transplant<T>> std::iter::FromIterator<T> for DynamicArray<T, P> {
    fn from_iter<I: IntoIterator<Item=T>>(iter: I) -> Self {
        let mut array = DynamicArray::with_policy();
        array.extend(iter);
        array
    }
}

impl<'a, T, P> IntoIterator for &'a DynamicArray<T, P> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> slice::Iter<'a, T> {
        self.as_slice().iter()
    }
}

impl<'a, T, P> IntoIterator for &'a mut DynamicArray<T, P> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> slice::IterMut<'a, T> {
        self.as_mut_slice().iter_mut()
    }
}

impl<T, P> DynamicArray<T, P> {
    /// Splits the array into its block and length without dropping anything.
    pub(crate) fn into_storage(self) -> (RawStorage<T>, usize) {
        let mut this = mem::ManuallyDrop::new(self);
        let len = this._len;
        (this._storage.take(), len)
    }
}
