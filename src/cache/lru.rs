//! LRU List Module
//!
//! Doubly linked recency list stored in an arena of slots addressed by
//! stable indices.

use crate::cache::CacheEntry;

// == Node ==
#[derive(Debug)]
struct Node<V> {
    entry: CacheEntry<V>,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU List ==
/// Recency-ordered list of cache entries.
///
/// - Head = Most recently used
/// - Tail = Least recently used (the eviction candidate)
///
/// Indices handed out by [`push_front`](Self::push_front) stay valid until
/// the node is removed; freed slots are reused.
#[derive(Debug)]
pub struct LruList<V> {
    slots: Vec<Option<Node<V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<V> Default for LruList<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> LruList<V> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    fn node(&self, idx: usize) -> Option<&Node<V>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node<V>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    // == Push Front ==
    /// Inserts an entry at the head and returns its index.
    pub fn push_front(&mut self, entry: CacheEntry<V>) -> usize {
        let node = Node {
            entry,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.link_front(idx);
        self.len += 1;
        idx
    }

    // == Move To Front ==
    /// Marks a node as most recently used.
    pub fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) || self.node(idx).is_none() {
            return;
        }
        self.unlink(idx);
        self.link_front(idx);
    }

    // == Remove ==
    /// Detaches a node and returns its entry.
    pub fn remove(&mut self, idx: usize) -> Option<CacheEntry<V>> {
        self.node(idx)?;
        self.unlink(idx);
        let node = self.slots.get_mut(idx)?.take()?;
        self.free.push(idx);
        self.len -= 1;
        Some(node.entry)
    }

    // == Tail ==
    /// Index of the least recently used node.
    pub fn tail(&self) -> Option<usize> {
        self.tail
    }

    /// Index of the most recently used node.
    pub fn head(&self) -> Option<usize> {
        self.head
    }

    pub fn get(&self, idx: usize) -> Option<&CacheEntry<V>> {
        self.node(idx).map(|node| &node.entry)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut CacheEntry<V>> {
        self.node_mut(idx).map(|node| &mut node.entry)
    }

    // == Iter ==
    /// Walks the list from most to least recently used.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every node.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            if let Some(node) = self.node_mut(h) {
                node.prev = Some(idx);
            }
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.node(idx) {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = None;
        }
    }
}

// == Iterator ==
/// Head-to-tail iterator over `(index, entry)` pairs.
pub struct Iter<'a, V> {
    list: &'a LruList<V>,
    cursor: Option<usize>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (usize, &'a CacheEntry<V>);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = self.list.node(idx)?;
        self.cursor = node.next;
        Some((idx, &node.entry))
    }
}
