//! Fixed-capacity document storage.
//!
//! A capped collection never grows past its capacity: inserting into a
//! full collection evicts the oldest document. Nothing is ever deleted
//! explicitly; closed boards and dead records simply age out.

use std::collections::VecDeque;

/// An insertion-ordered ring buffer of documents.
#[derive(Debug, Clone)]
pub struct CappedCollection<T> {
    docs: VecDeque<T>,
    capacity: usize,
}

impl<T> CappedCollection<T> {
    /// Creates an empty collection holding at most `capacity` documents.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            docs: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Appends a document, returning the evicted oldest one if the
    /// collection was full.
    pub fn insert(&mut self, doc: T) -> Option<T> {
        let evicted = if self.docs.len() >= self.capacity {
            self.docs.pop_front()
        } else {
            None
        };
        self.docs.push_back(doc);
        evicted
    }

    /// First document (oldest first) matching `pred`.
    pub fn find_one(&self, mut pred: impl FnMut(&T) -> bool) -> Option<&T> {
        self.docs.iter().find(|doc| pred(doc))
    }

    /// Mutable access to the first document matching `pred`.
    pub fn find_one_mut(
        &mut self,
        mut pred: impl FnMut(&T) -> bool,
    ) -> Option<&mut T> {
        self.docs.iter_mut().find(|doc| pred(doc))
    }

    /// All documents, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.docs.iter()
    }

    /// All documents mutably, oldest first.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.docs.iter_mut()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Maximum number of documents kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
