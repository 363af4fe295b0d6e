//! Sorted, prefix-compressed, block-paginated on-disk string→value store.
//!
//! Grounded in `examples/original_source/src/codes/diskmap/`.

pub mod merge;
pub mod reader;
pub mod writer;

pub use merge::KWayMerge;
pub use reader::{DiskMapIter, DiskMapReader};
pub use writer::{DiskMapWriter, DEFAULT_BLOCK_SIZE};
