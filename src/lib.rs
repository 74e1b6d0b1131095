//! Serve single lines of huge, static text files by their line number using a pregenerated sparse
//! index, without keeping the file in memory or scanning it on every read.
//!
//! An [`IndexBuilder`] scans the file once and stores the byte offset of every n-th line in an
//! index artifact. A [`LineResolver`] loads that artifact and reads only the chunk between two
//! checkpoints to resolve a line.
//!
//! Lines are expected to be ASCII. Reading a line holding other bytes fails with
//! [`Error::NonAscii`](error::Error::NonAscii).

/// Building and persisting sparse indices
pub mod builder;
pub mod error;
/// Checks whether an index artifact needs to be rebuilt
pub mod freshness;
/// The sparse index of files
pub mod index;
/// Line lookups on an indexed file
pub mod resolver;
/// A line resolver which becomes ready once its index got loaded
pub mod service;
/// Sources to read chunks of indexed data from
pub mod source;

pub use builder::{BuilderConfig, IndexBuilder};
pub use error::Error;
pub use index::SparseIndex;
pub use resolver::LineResolver;
pub use service::LineService;
pub use source::{ChunkSource, FileSource, MemSource};

pub type Result<T> = std::result::Result<T, error::Error>;
