pub mod error;
pub mod node;
pub mod parser;
pub mod reader;
pub mod tree;

pub use error::TreeError;
pub use node::{Node, NodeId};
pub use tree::Tree;
