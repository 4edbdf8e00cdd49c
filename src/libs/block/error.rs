use crate::libs::phylo::TreeError;
use std::fmt;

/// Failures of the partition / completion / build stages.
///
/// All of them are fatal for the cluster being processed.
#[derive(Debug)]
pub enum BlockError {
    /// The cluster tree cannot key a block store
    MalformedTree { cluster: String, source: TreeError },
    /// A record header does not yield a node identifier
    MalformedHeader {
        /// 1-based line number in the source stream
        line: usize,
        header: String,
        reason: &'static str,
    },
    /// No block registered for the node
    MissingBlock { cluster: String, node: String },
    /// A block was already registered for the node
    DuplicateBlock { cluster: String, node: String },
    /// The identifier cannot be used as a file name
    InvalidNodeId { cluster: String, node: String },
    /// The compressor cannot produce blocks that survive byte concatenation
    NotConcatenable { compressor: String },
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl BlockError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BlockError::Io {
            context: context.into(),
            source,
        }
    }
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockError::MalformedTree { cluster, source } => {
                write!(f, "cluster {}: {}", cluster, source)
            }
            BlockError::MalformedHeader {
                line,
                header,
                reason,
            } => write!(f, "Malformed header at line {}: {} ({:?})", line, reason, header),
            BlockError::MissingBlock { cluster, node } => {
                write!(f, "cluster {}: no block for node {:?}", cluster, node)
            }
            BlockError::DuplicateBlock { cluster, node } => {
                write!(f, "cluster {}: block for node {:?} already exists", cluster, node)
            }
            BlockError::InvalidNodeId { cluster, node } => {
                write!(f, "cluster {}: {:?} is not a usable node identifier", cluster, node)
            }
            BlockError::NotConcatenable { compressor } => {
                write!(f, "compressor {} does not produce concatenable blocks", compressor)
            }
            BlockError::Io { context, source } => write!(f, "{}: {}", context, source),
        }
    }
}

impl std::error::Error for BlockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlockError::MalformedTree { source, .. } => Some(source),
            BlockError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
