use std::alloc::{self, Layout};
use std::fmt::{Debug, Display};
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ops::{Index, IndexMut};
use std::ptr::NonNull;

/// Failure to obtain a block of raw storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The requested number of slots does not fit into the address space.
    CapacityOverflow { capacity: usize },
    /// The global allocator could not satisfy the request.
    AllocationFailed { capacity: usize, layout: Layout },
}

impl Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::CapacityOverflow { capacity } => write!(f, "Storage for {} slots exceeds the addressable size", capacity),
            StorageError::AllocationFailed { capacity, layout } => write!(f, "Failed to allocate {} bytes for {} slots", layout.size(), capacity),
        }
    }
}

impl std::error::Error for StorageError {}

impl StorageError {
    /// Diverges the same way the standard collections do when an infallible operation
    /// could not get its memory.
    pub(crate) fn raise(self) -> ! {
        match self {
            StorageError::CapacityOverflow { .. } => panic!("{}", self),
            StorageError::AllocationFailed { layout, .. } => alloc::handle_alloc_error(layout),
        }
    }
}

/// A single contiguous block of uninitialized slots for `T`.
///
/// `RawStorage` knows nothing about which slots hold live values: it never constructs,
/// reads or drops a `T`. The owner is responsible for dropping every live value before
/// the storage goes away, the storage itself only returns the block to the allocator.
///
/// The storage can not be cloned. Ownership of the block moves with the value, and
/// `take` leaves an empty storage behind.
pub struct RawStorage<T> where T: Sized {
    _buffer: Option<NonNull<T>>,
    _capacity: usize,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send> Send for RawStorage<T> {}
unsafe impl<T: Sync> Sync for RawStorage<T> {}

impl<T> RawStorage<T> where T: Sized {
    /// Storage with no block and zero capacity.
    pub const fn new() -> RawStorage<T> {
        RawStorage {
            _buffer: None,
            _capacity: 0,
            _marker: PhantomData,
        }
    }

    /// Requests a block with room for exactly `capacity` values.
    ///
    /// A zero capacity returns empty storage without calling the allocator. Zero-sized
    /// types never reach the allocator either, they get a dangling, well-aligned block.
    pub fn allocate(capacity: usize) -> Result<RawStorage<T>, StorageError> {
        if capacity == 0 {
            return Ok(RawStorage::new());
        }

        let layout = Layout::array::<T>(capacity)
            .map_err(|_| StorageError::CapacityOverflow { capacity })?;

        if layout.size() == 0 {
            return Ok(RawStorage {
                _buffer: Some(NonNull::dangling()),
                _capacity: capacity,
                _marker: PhantomData,
            });
        }

        let ptr = unsafe { alloc::alloc(layout) } as *mut T;
        match NonNull::new(ptr) {
            Some(buffer) => {
                trace!("allocate {} slots of {} ({} bytes)", capacity, crate::logging::element_name::<T>(), layout.size());
                Ok(RawStorage {
                    _buffer: Some(buffer),
                    _capacity: capacity,
                    _marker: PhantomData,
                })
            },
            None => Err(StorageError::AllocationFailed { capacity, layout }),
        }
    }

    /// Like `allocate`, but diverges if the block can not be obtained.
    pub fn with_capacity(capacity: usize) -> RawStorage<T> {
        RawStorage::allocate(capacity).unwrap_or_else(|e| e.raise())
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self._capacity
    }

    /// The block address, `None` exactly when the capacity is zero.
    #[inline(always)]
    pub fn buffer(&self) -> Option<NonNull<T>> {
        self._buffer
    }

    /// Address of the first slot. Never null, dangling for empty storage.
    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self._buffer.unwrap_or_else(NonNull::dangling).as_ptr()
    }

    /// Address of the first slot. Never null, dangling for empty storage.
    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self._buffer.unwrap_or_else(NonNull::dangling).as_ptr()
    }

    /// Address of the slot at `offset`.
    ///
    /// `offset` may equal the capacity: the one-past-the-end address is valid to compute
    /// but not to dereference. Anything past that is a contract violation.
    #[inline(always)]
    pub fn address(&self, offset: usize) -> *const T {
        debug_assert!(offset <= self._capacity, "address offset {} past capacity {}", offset, self._capacity);
        self.as_ptr().wrapping_add(offset)
    }

    /// Mutable address of the slot at `offset`, see `address`.
    #[inline(always)]
    pub fn address_mut(&mut self, offset: usize) -> *mut T {
        debug_assert!(offset <= self._capacity, "address offset {} past capacity {}", offset, self._capacity);
        self.as_mut_ptr().wrapping_add(offset)
    }

    /// Exchanges blocks with `other`. No slot is touched.
    #[inline(always)]
    pub fn swap(&mut self, other: &mut RawStorage<T>) {
        mem::swap(&mut self._buffer, &mut other._buffer);
        mem::swap(&mut self._capacity, &mut other._capacity);
    }

    /// Moves the block out, leaving this storage empty.
    #[inline(always)]
    pub fn take(&mut self) -> RawStorage<T> {
        mem::replace(self, RawStorage::new())
    }

    fn deallocate(&mut self) {
        if let Some(buffer) = self._buffer.take() {
            let size = mem::size_of::<T>() * self._capacity;
            if size != 0 {
                trace!("release {} slots of {}", self._capacity, crate::logging::element_name::<T>());
                // validated by `Layout::array` when the block was allocated
                unsafe {
                    let layout = Layout::from_size_align_unchecked(size, mem::align_of::<T>());
                    alloc::dealloc(buffer.as_ptr() as *mut u8, layout);
                }
            }
        }
        self._capacity = 0;
    }
}

impl<T> Default for RawStorage<T> {
    fn default() -> Self {
        RawStorage::new()
    }
}

impl<T> Drop for RawStorage<T> {
    fn drop(&mut self) {
        self.deallocate();
    }
}

impl<T> Debug for RawStorage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawStorage")
            .field("buffer", &self._buffer)
            .field("capacity", &self._capacity)
            .finish()
    }
}

impl<T> Index<usize> for RawStorage<T> {
    type Output = MaybeUninit<T>;

    #[inline(always)]
    fn index(&self, index: usize) -> &MaybeUninit<T> {
        debug_assert!(index < self._capacity, "slot {} out of capacity {}", index, self._capacity);
        unsafe { &*(self.address(index) as *const MaybeUninit<T>) }
    }
}

impl<T> IndexMut<usize> for RawStorage<T> {
    #[inline(always)]
    fn index_mut(&mut self, index: usize) -> &mut MaybeUninit<T> {
        debug_assert!(index < self._capacity, "slot {} out of capacity {}", index, self._capacity);
        unsafe { &mut *(self.address_mut(index) as *mut MaybeUninit<T>) }
    }
}

#[cfg(test)]
mod storage_tests {
    use crate::{RawStorage, StorageError};
    use std::ptr;

    #[test]
    fn zero_capacity_has_no_block() {
        let storage = RawStorage::<u64>::allocate(0).unwrap();
        assert_eq!(0, storage.capacity());
        assert_eq!(None, storage.buffer());
        assert!(!storage.as_ptr().is_null());
    }

    #[test]
    fn allocates_requested_slots() {
        let storage = RawStorage::<u64>::with_capacity(5);
        assert_eq!(5, storage.capacity());
        assert!(storage.buffer().is_some());
        assert_eq!(0, storage.as_ptr() as usize % std::mem::align_of::<u64>());
    }

    #[test]
    fn too_many_slots_overflow() {
        let err = RawStorage::<u64>::allocate(usize::MAX).unwrap_err();
        assert_eq!(StorageError::CapacityOverflow { capacity: usize::MAX }, err);
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn slots_can_be_written_and_read() {
        let mut storage = RawStorage::<u32>::with_capacity(3);
        for i in 0..3 {
            storage[i].write(i as u32 * 10);
        }
        let values: Vec<u32> = (0..3).map(|i| unsafe { storage[i].assume_init() }).collect();
        assert_eq!(vec![0, 10, 20], values);
    }

    #[test]
    fn one_past_end_address_is_allowed() {
        let mut storage = RawStorage::<u16>::with_capacity(4);
        let first = storage.as_mut_ptr();
        assert_eq!(first.wrapping_add(4), storage.address_mut(4));
        assert_eq!(first as *const u16, storage.address(0));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "past capacity")]
    fn address_past_one_past_end_is_rejected() {
        let storage = RawStorage::<u16>::with_capacity(4);
        let _ = storage.address(5);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of capacity")]
    fn slot_index_at_capacity_is_rejected() {
        let storage = RawStorage::<u16>::with_capacity(2);
        let _ = &storage[2];
    }

    #[test]
    fn take_leaves_source_empty() {
        let mut storage = RawStorage::<u8>::with_capacity(16);
        let block = storage.buffer();
        let moved = storage.take();
        assert_eq!(0, storage.capacity());
        assert_eq!(None, storage.buffer());
        assert_eq!(16, moved.capacity());
        assert_eq!(block, moved.buffer());
    }

    #[test]
    fn swap_exchanges_blocks() {
        let mut a = RawStorage::<u8>::with_capacity(2);
        let mut b = RawStorage::<u8>::with_capacity(7);
        let (block_a, block_b) = (a.buffer(), b.buffer());
        a.swap(&mut b);
        assert_eq!((7, block_b), (a.capacity(), a.buffer()));
        assert_eq!((2, block_a), (b.capacity(), b.buffer()));
    }

    #[test]
    fn zero_sized_slots_skip_the_allocator() {
        let mut storage = RawStorage::<()>::with_capacity(1000);
        assert_eq!(1000, storage.capacity());
        assert!(storage.buffer().is_some());
        unsafe { ptr::write(storage.address_mut(999), ()) };
    }
}
