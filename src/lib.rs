#[macro_use]
mod logging;

mod dontdothis;
mod storage;
mod transplant;
mod array;
mod iter;
mod traits;

pub use storage::{RawStorage, StorageError};
pub use transplant::{Transplant, ByMove, ByClone};
pub use array::DynamicArray;
pub use iter::IntoIter;
pub use traits::CollectDynamicArray;

#[cfg(test)]
pub mod dropflag;
