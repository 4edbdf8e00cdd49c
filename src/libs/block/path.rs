use std::sync::Arc;

/// Persistent root-to-node sequence.
///
/// Each `push` allocates one link pointing at the shared prefix, so handing the
/// same chain to k children costs k reference-count bumps, not k copies, and no
/// child can see what a sibling appended.
#[derive(Debug)]
pub struct PathChain<T> {
    head: Option<Arc<Link<T>>>,
    len: usize,
}

#[derive(Debug)]
struct Link<T> {
    value: T,
    prev: Option<Arc<Link<T>>>,
}

impl<T> Clone for PathChain<T> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
            len: self.len,
        }
    }
}

impl<T> Default for PathChain<T> {
    fn default() -> Self {
        Self { head: None, len: 0 }
    }
}

impl<T> PathChain<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new chain extending this one by `value`; `self` is left as is.
    pub fn push(&self, value: T) -> Self {
        Self {
            head: Some(Arc::new(Link {
                value,
                prev: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Values from the first pushed (root) to the last pushed
    pub fn to_vec(&self) -> Vec<&T> {
        let mut values = Vec::with_capacity(self.len);
        let mut cursor = self.head.as_deref();
        while let Some(link) = cursor {
            values.push(&link.value);
            cursor = link.prev.as_deref();
        }
        values.reverse();
        values
    }
}

// Long chains would otherwise drop recursively, one stack frame per link
impl<T> Drop for PathChain<T> {
    fn drop(&mut self) {
        let mut cursor = self.head.take();
        while let Some(link) = cursor {
            match Arc::try_unwrap(link) {
                Ok(mut link) => cursor = link.prev.take(),
                Err(_) => break,
            }
        }
    }
}
