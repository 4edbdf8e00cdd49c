/// NodeId is an index into the Tree's node vector.
pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct Node {
    /// Index in the arena
    pub id: NodeId,

    /// Parent node ID (None for root)
    pub parent: Option<NodeId>,

    /// Ordered list of child node IDs
    pub children: Vec<NodeId>,

    /// Node label. In a cluster tree this is the identifier of the node's block.
    pub name: Option<String>,

    /// Branch length to parent, kept from the Newick input but unused by block composition
    pub length: Option<f64>,
}

impl Node {
    /// Create a new unlinked, unlabeled node
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            name: None,
            length: None,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// The label as a `&str`, if any
    pub fn label(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// A node is a leaf iff it has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
