use crate::{DynamicArray, StorageError};

/// Implements collect to `DynamicArray` with explicit allocation failure handling.
pub trait CollectDynamicArray: Iterator {
    /// Collects into a new array, diverging if memory runs out.
    fn collect_dynamic_array(self) -> DynamicArray<Self::Item>;

    /// Collects into a new array, returning the allocation failure instead of diverging.
    /// Items taken from the iterator before the failure are dropped.
    fn try_collect_dynamic_array(self) -> Result<DynamicArray<Self::Item>, StorageError>;

    /// Collects `Ok` items until the first `Err`, which is returned as is. Allocation
    /// failures are converted into `E`.
    fn collect_result_dynamic_array<I, E>(self) -> Result<DynamicArray<I>, E>
        where
            Self: Iterator<Item=Result<I, E>>,
            E: From<StorageError>;
}

impl<Q: Iterator> CollectDynamicArray for Q {
    fn collect_dynamic_array(self) -> DynamicArray<Self::Item> {
        self.collect()
    }

    fn try_collect_dynamic_array(self) -> Result<DynamicArray<Self::Item>, StorageError> {
        let (lower, _) = self.size_hint();
        let mut array: DynamicArray<Self::Item> = DynamicArray::try_with_capacity(lower)?;
        for item in self {
            array.try_push_back(item)?;
        }
        Ok(array)
    }

    fn collect_result_dynamic_array<I, E>(self) -> Result<DynamicArray<I>, E>
        where
            Self: Iterator<Item=Result<I, E>>,
            E: From<StorageError>
    {
        let (lower, _) = self.size_hint();
        let mut array: DynamicArray<I> = DynamicArray::try_with_capacity(lower)?;
        for item in self {
            array.try_push_back(item?)?;
        }
        Ok(array)
    }
}
