use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Syntax error in the Newick input
    ParseError {
        /// A human-readable message explaining the error
        message: String,
        /// The line number (1-based)
        line: usize,
        /// The column number (1-based)
        column: usize,
        /// Up to 50 characters of input starting at the failure
        snippet: String,
    },
    /// Invalid operation on an in-memory tree (e.g. relinking a node)
    LogicError(String),
    /// The tree parsed, but cannot serve as a cluster tree:
    /// several roots, a cycle, an unlabeled node or a duplicated label.
    Malformed(String),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::ParseError {
                message,
                line,
                column,
                snippet,
            } => {
                write!(
                    f,
                    "Parse error at line {}, column {}:\n{}\nSnippet: \"{}\"",
                    line, column, message, snippet
                )
            }
            TreeError::LogicError(msg) => write!(f, "Tree logic error: {}", msg),
            TreeError::Malformed(msg) => write!(f, "Malformed tree: {}", msg),
        }
    }
}

impl std::error::Error for TreeError {}
