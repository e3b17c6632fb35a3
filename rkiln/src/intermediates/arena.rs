//! A typed index arena. Nodes are appended and never removed, so a
//! [Handle] stays valid for as long as the arena that gave it out. Dropping
//! the arena drops every node at once.

use std::marker::PhantomData;

/// An index into an [Arena] of `T`. The type parameter keeps a handle to a
/// statement from being used to look up an expression
pub struct Handle<T> {
    index: u32,
    _of: PhantomData<fn() -> T>,
}

// derives would put bounds on T, which handles don't need
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Handle<T> {}
impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}
impl<T> Eq for Handle<T> {}
impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state)
    }
}
impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "#{}", self.index)
    }
}
impl<T> Handle<T> {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

#[derive(Debug)]
pub struct Arena<T> {
    nodes: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn alloc(&mut self, node: T) -> Handle<T> {
        let index = self.nodes.len() as u32;
        self.nodes.push(node);
        Handle { index, _of: PhantomData }
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<T> std::ops::Index<Handle<T>> for Arena<T> {
    type Output = T;
    fn index(&self, handle: Handle<T>) -> &T {
        &self.nodes[handle.index()]
    }
}
