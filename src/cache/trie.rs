//! Segment trie backing the query cache.
//!
//! Each node is addressed by one [`Segment`]; a value stored at depth `n` is
//! the entry for the key formed by the `n` segments on the path. Prefix
//! operations walk to the prefix node and then only visit its subtree, so
//! their cost depends on the subtree size, not on the whole cache.

use std::collections::HashMap;

use crate::keys::{QueryKey, Segment};

#[derive(Debug)]
struct Node<V> {
    value: Option<V>,
    children: HashMap<Segment, Node<V>>,
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Self {
            value: None,
            children: HashMap::new(),
        }
    }
}

impl<V> Node<V> {
    fn is_vacant(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    fn count(&self) -> usize {
        usize::from(self.value.is_some())
            + self.children.values().map(Node::count).sum::<usize>()
    }

    fn visit_mut(&mut self, path: &mut Vec<Segment>, visit: &mut impl FnMut(&QueryKey, &mut V)) {
        if let Some(value) = self.value.as_mut() {
            let key = key_from_path(path);
            visit(&key, value);
        }
        for (segment, child) in &mut self.children {
            path.push(segment.clone());
            child.visit_mut(path, visit);
            path.pop();
        }
    }

    fn visit(&self, path: &mut Vec<Segment>, visit: &mut impl FnMut(QueryKey, &V)) {
        if let Some(value) = self.value.as_ref() {
            visit(key_from_path(path), value);
        }
        for (segment, child) in &self.children {
            path.push(segment.clone());
            child.visit(path, visit);
            path.pop();
        }
    }

    fn drain_into(&mut self, path: &mut Vec<Segment>, out: &mut Vec<(QueryKey, V)>) {
        if let Some(value) = self.value.take() {
            out.push((key_from_path(path), value));
        }
        for (segment, mut child) in self.children.drain() {
            path.push(segment);
            child.drain_into(path, out);
            path.pop();
        }
    }
}

fn key_from_path(path: &[Segment]) -> QueryKey {
    QueryKey::from_segments(path.to_vec())
}

/// Map from [`QueryKey`] to `V`, organised by segment.
#[derive(Debug)]
pub struct KeyTrie<V> {
    root: Node<V>,
    len: usize,
}

impl<V> Default for KeyTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> KeyTrie<V> {
    pub fn new() -> Self {
        Self {
            root: Node::default(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn node(&self, path: &[Segment]) -> Option<&Node<V>> {
        path.iter()
            .try_fold(&self.root, |node, segment| node.children.get(segment))
    }

    fn node_mut(&mut self, path: &[Segment]) -> Option<&mut Node<V>> {
        path.iter()
            .try_fold(&mut self.root, |node, segment| node.children.get_mut(segment))
    }

    pub fn get(&self, key: &QueryKey) -> Option<&V> {
        self.node(key.segments())?.value.as_ref()
    }

    pub fn get_mut(&mut self, key: &QueryKey) -> Option<&mut V> {
        self.node_mut(key.segments())?.value.as_mut()
    }

    pub fn contains_key(&self, key: &QueryKey) -> bool {
        self.get(key).is_some()
    }

    /// Store `value` under `key`, returning the value it replaced.
    pub fn insert(&mut self, key: &QueryKey, value: V) -> Option<V> {
        let node = key
            .segments()
            .iter()
            .fold(&mut self.root, |node, segment| {
                node.children.entry(segment.clone()).or_default()
            });
        let previous = node.value.replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Remove the value stored exactly at `key`, pruning emptied nodes.
    pub fn remove(&mut self, key: &QueryKey) -> Option<V> {
        let removed = remove_at(&mut self.root, key.segments());
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Visit every value whose key starts with `prefix`.
    pub fn for_each_under_mut(
        &mut self,
        prefix: &QueryKey,
        mut visit: impl FnMut(&QueryKey, &mut V),
    ) {
        let mut path = prefix.segments().to_vec();
        if let Some(node) = self.node_mut(prefix.segments()) {
            node.visit_mut(&mut path, &mut visit);
        }
    }

    /// Number of values whose key starts with `prefix`.
    pub fn count_under(&self, prefix: &QueryKey) -> usize {
        self.node(prefix.segments()).map_or(0, Node::count)
    }

    /// Remove and return every value whose key starts with `prefix`.
    pub fn drain_under(&mut self, prefix: &QueryKey) -> Vec<(QueryKey, V)> {
        let mut drained = Vec::new();
        let mut path = prefix.segments().to_vec();
        if let Some(node) = self.node_mut(prefix.segments()) {
            node.drain_into(&mut path, &mut drained);
        }
        self.len -= drained.len();
        prune(&mut self.root, prefix.segments());
        drained
    }

    /// Every stored key, in no particular order.
    pub fn keys(&self) -> Vec<QueryKey> {
        let mut keys = Vec::with_capacity(self.len);
        let mut path = Vec::new();
        self.root
            .visit(&mut path, &mut |key: QueryKey, _: &V| keys.push(key));
        keys
    }

    pub fn clear(&mut self) {
        self.root = Node::default();
        self.len = 0;
    }
}

fn remove_at<V>(node: &mut Node<V>, path: &[Segment]) -> Option<V> {
    match path.split_first() {
        None => node.value.take(),
        Some((segment, rest)) => {
            let child = node.children.get_mut(segment)?;
            let removed = remove_at(child, rest);
            if child.is_vacant() {
                node.children.remove(segment);
            }
            removed
        }
    }
}

fn prune<V>(node: &mut Node<V>, path: &[Segment]) {
    if let Some((segment, rest)) = path.split_first() {
        if let Some(child) = node.children.get_mut(segment) {
            prune(child, rest);
            if child.is_vacant() {
                node.children.remove(segment);
            }
        }
    }
}
