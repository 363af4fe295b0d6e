//! Error types for searchrs.
//!
//! One `thiserror` enum per layer (codec, disk-map, build, query), aggregated
//! into a single crate-wide [`SearchError`] so callers at the binary
//! boundary only need to match on one type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("varbyte/unary stream ended before a terminating group")]
    Overrun,
}

#[derive(Error, Debug)]
pub enum DiskMapError {
    #[error("key {key:?} is not strictly greater than the previous key {previous:?}")]
    InvalidOrder { key: String, previous: String },

    #[error("key {0:?} is {1} bytes, at or above the 255-byte limit")]
    KeyTooLong(String, usize),

    #[error("key must not be empty")]
    EmptyKey,

    #[error("disk-map page is corrupted: {0}")]
    Corrupted(String),
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("term {0:?} present in a shard's lexicon but absent from the global lexicon")]
    InvariantBroken(String),

    #[error("chunk directory {0:?} already exists")]
    ChunkExists(std::path::PathBuf),
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("query produced no terms after normalization")]
    EmptyQuery,
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    DiskMap(#[from] DiskMapError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Query(#[from] QueryError),
}
