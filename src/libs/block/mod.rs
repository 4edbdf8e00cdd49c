//! Per-node blocks of a cluster: splitting a source stream into blocks,
//! giving every tree node one, and concatenating them along root paths.

pub mod build;
pub mod complete;
pub mod compress;
pub mod error;
pub mod header;
pub mod partition;
pub mod path;
pub mod store;

pub use build::{BuildStats, Builder};
pub use complete::complete;
pub use compress::{Bgzf, Compressor, External, Gzip, Plain};
pub use error::BlockError;
pub use header::HeaderFormat;
pub use partition::{BlockSplitter, PartitionStats, Partitioner, RawBlock};
pub use path::PathChain;
pub use store::BlockStore;
