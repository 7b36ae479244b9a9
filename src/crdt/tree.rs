//! The live tree: a set of `(parent, metadata, child)` triples.
//!
//! The tree is stored twice, once keyed by child (`nodes`) and once keyed
//! by parent (`children`). Both maps are private and every mutating method
//! updates them together, so each id in `nodes` appears in exactly one
//! child set and vice versa.
//!
//! There is no edit in place. Moving a node is `remove` followed by `add`,
//! which is what lets `State` restore a recorded pre-image exactly.
//!
//! Complexity:
//! - get: O(1)
//! - add / remove: O(1)
//! - is_ancestor / ancestors: O(depth)

use std::fmt;
use std::fmt::Write;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// The parent and metadata of one node in the tree.
///
/// The child id is the key this node is stored under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeNode<Id, M> {
    pub parent_id: Id,
    pub metadata: M,
}

impl<Id, M> TreeNode<Id, M> {
    pub fn new(parent_id: Id, metadata: M) -> TreeNode<Id, M> {
        return TreeNode { parent_id, metadata };
    }
}

/// A chain of ancestors, nearest parent first.
///
/// Trees are usually shallow, so the chain lives inline.
pub type Ancestors<Id> = SmallVec<[Id; 8]>;

/// A forest of nodes with a reverse index from parent to children.
#[derive(Clone)]
pub struct Tree<Id, M> {
    /// Tree nodes indexed by child id.
    nodes: FxHashMap<Id, TreeNode<Id, M>>,
    /// Parent id to child ids.
    children: FxHashMap<Id, FxHashSet<Id>>,
}

impl<Id, M> Default for Tree<Id, M> {
    fn default() -> Self {
        return Tree {
            nodes: FxHashMap::default(),
            children: FxHashMap::default(),
        };
    }
}

impl<Id, M> Tree<Id, M> {
    /// Create an empty tree.
    pub fn new() -> Tree<Id, M> {
        return Tree::default();
    }

    /// Number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        return self.nodes.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.nodes.is_empty();
    }

    /// Iterate over all `(id, node)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&Id, &TreeNode<Id, M>)> {
        return self.nodes.iter();
    }
}

impl<Id: Clone + Eq + Hash, M> Tree<Id, M> {
    /// Look up a node by its id.
    #[inline]
    pub fn get(&self, id: &Id) -> Option<&TreeNode<Id, M>> {
        return self.nodes.get(id);
    }

    #[inline]
    pub fn contains(&self, id: &Id) -> bool {
        return self.nodes.contains_key(id);
    }

    /// Insert `id` as a child of `parent_id`.
    ///
    /// Does not check whether `id` is already present; callers moving an
    /// existing node must `remove` it first.
    pub fn add(&mut self, id: Id, parent_id: Id, metadata: M) {
        self.children
            .entry(parent_id.clone())
            .or_default()
            .insert(id.clone());
        self.nodes.insert(id, TreeNode::new(parent_id, metadata));
    }

    /// Remove `id` from the tree, returning its node if it was present.
    pub fn remove(&mut self, id: &Id) -> Option<TreeNode<Id, M>> {
        let node = self.nodes.remove(id)?;

        if let Some(siblings) = self.children.get_mut(&node.parent_id) {
            siblings.remove(id);
            // Drop empty sets so the index does not grow without bound
            if siblings.is_empty() {
                self.children.remove(&node.parent_id);
            }
        }

        return Some(node);
    }

    /// Iterate over the children of `parent_id` in unspecified order.
    pub fn children(&self, parent_id: &Id) -> impl Iterator<Item = &Id> {
        return self.children.get(parent_id).into_iter().flatten();
    }

    /// Returns true if `ancestor_id` is on the parent chain of `id`.
    ///
    /// A node is never its own ancestor unless the tree contains a cycle.
    ///
    /// ```text
    ///         1
    ///      2     3
    ///    6         5
    ///  8
    /// ```
    ///
    /// `is_ancestor(8, 2)` is true, `is_ancestor(5, 2)` is false.
    pub fn is_ancestor(&self, id: &Id, ancestor_id: &Id) -> bool {
        let mut current = id;

        // An acyclic chain visits each node at most once
        for _ in 0..=self.nodes.len() {
            let Some(node) = self.nodes.get(current) else {
                return false;
            };
            if node.parent_id == *ancestor_id {
                return true;
            }
            current = &node.parent_id;
        }

        tracing::error!(nodes = self.nodes.len(), "parent chain longer than the tree, tree contains a cycle");
        return false;
    }

    /// The ancestors of `id`, nearest parent first.
    ///
    /// The last element is the root of the subtree `id` lives in, which is
    /// itself not a node of the tree (e.g. a root or trash sentinel).
    pub fn ancestors(&self, id: &Id) -> Ancestors<Id> {
        let mut chain = Ancestors::new();
        let mut current = id;

        while let Some(node) = self.nodes.get(current) {
            if chain.len() > self.nodes.len() {
                tracing::error!(nodes = self.nodes.len(), "parent chain longer than the tree, tree contains a cycle");
                break;
            }
            chain.push(node.parent_id.clone());
            current = &node.parent_id;
        }

        return chain;
    }
}

impl<Id: Clone + Eq + Hash + Ord + fmt::Debug, M: fmt::Debug> Tree<Id, M> {
    /// Render the subtree under `root` as an indented listing.
    ///
    /// Children are sorted by id so the output is stable. Intended for
    /// debugging only.
    pub fn dump(&self, root: &Id) -> String {
        let mut out = String::new();
        self.dump_node(root, 0, &mut out);
        return out;
    }

    fn dump_node(&self, id: &Id, depth: usize, out: &mut String) {
        // A malformed tree must not recurse forever
        if depth > self.nodes.len() {
            return;
        }
        let indent = "  ".repeat(depth);
        // Writing to a String cannot fail
        let _ = match self.get(id) {
            Some(node) => writeln!(out, "{}{:?} {:?}", indent, id, node.metadata),
            None => writeln!(out, "{}{:?}", indent, id),
        };

        let mut children: Vec<&Id> = self.children(id).collect();
        children.sort();
        for child in children {
            self.dump_node(child, depth + 1, out);
        }
    }
}

impl<Id: Eq + Hash, M: PartialEq> PartialEq for Tree<Id, M> {
    fn eq(&self, other: &Self) -> bool {
        // The child index is derived from `nodes`
        return self.nodes == other.nodes;
    }
}

impl<Id: Eq + Hash, M: Eq> Eq for Tree<Id, M> {}

impl<Id: fmt::Debug, M: fmt::Debug> fmt::Debug for Tree<Id, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.debug_map().entries(self.nodes.iter()).finish();
    }
}

#[cfg(test)]
impl<Id: Clone + Eq + Hash, M> Tree<Id, M> {
    /// Check that the forward map and the child index agree.
    pub(crate) fn assert_consistent(&self) {
        for (id, node) in &self.nodes {
            let siblings = self.children.get(&node.parent_id);
            assert!(siblings.is_some_and(|s| s.contains(id)), "node missing from its parent's child set");
        }
        let indexed: usize = self.children.values().map(|s| s.len()).sum();
        assert_eq!(indexed, self.nodes.len(), "child index out of sync with nodes");
        for (parent_id, set) in &self.children {
            assert!(!set.is_empty(), "empty child set left in index");
            for child in set {
                assert!(self.nodes.get(child).is_some_and(|n| n.parent_id == *parent_id));
            }
        }
    }
}
