//! Recency ordering for cache eviction.
//!
//! [`RecencyList`] keeps values in a [`Slab`] and threads a doubly linked list
//! through the entries, most recently used at the front. Entries are addressed
//! by stamped [`Handle`]s so a handle to an evicted value never aliases the
//! value that later reuses its slab slot.

use slab::Slab;

/// Stable reference to an entry in a [`RecencyList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: usize,
    stamp: u64,
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    stamp: u64,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Slab-backed most-recently-used list.
#[derive(Debug)]
pub struct RecencyList<T> {
    nodes: Slab<Node<T>>,
    next_stamp: u64,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecencyList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            nodes: Slab::new(),
            next_stamp: 0,
            head: None,
            tail: None,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Insert a value as the most recently used entry.
    pub fn push_front(&mut self, value: T) -> Handle {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        let index = self.nodes.insert(Node {
            value,
            stamp,
            prev: None,
            next: None,
        });
        self.link_front(index);
        Handle { index, stamp }
    }

    /// Value behind a handle, if it is still live.
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.nodes
            .get(handle.index)
            .filter(|node| node.stamp == handle.stamp)
            .map(|node| &node.value)
    }

    /// Mark an entry as most recently used. Returns `false` for stale handles.
    pub fn touch(&mut self, handle: Handle) -> bool {
        if self.get(handle).is_none() {
            return false;
        }
        if self.head != Some(handle.index) {
            self.unlink(handle.index);
            self.link_front(handle.index);
        }
        true
    }

    /// Remove and return the least recently used entry.
    pub fn pop_back(&mut self) -> Option<T> {
        let index = self.tail?;
        self.release(index)
    }

    /// Entries from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.nodes.get(cursor?)?;
            cursor = node.next;
            Some(&node.value)
        })
    }

    /// Drop every entry, invalidating all handles.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }

    fn release(&mut self, index: usize) -> Option<T> {
        self.unlink(index);
        self.nodes.try_remove(index).map(|node| node.value)
    }

    fn link_front(&mut self, index: usize) {
        let old_head = self.head;
        if let Some(node) = self.nodes.get_mut(index) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head.and_then(|h| self.nodes.get_mut(h)) {
            Some(head) => head.prev = Some(index),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
    }

    fn unlink(&mut self, index: usize) {
        let Some(node) = self.nodes.get_mut(index) else {
            return;
        };
        let (prev, next) = (node.prev.take(), node.next.take());
        match prev.and_then(|p| self.nodes.get_mut(p)) {
            Some(p) => p.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.nodes.get_mut(n)) {
            Some(n) => n.prev = prev,
            None => self.tail = prev,
        }
    }
}
