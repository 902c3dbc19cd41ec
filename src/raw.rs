use core::marker::PhantomData;

use crate::comparator::Comparator;
use crate::node::{InternalNode, LeafNode, Node, SearchResult};
use crate::store::Store;

/// The core B+ tree implementation backing `BPlusMap`.
///
/// Owns the store, the comparator, and the root reference; everything else
/// is reached through the store. Heights count levels root..leaf inclusive,
/// so an empty tree has height 0 and a lone root leaf height 1.
pub(crate) struct RawBPlusMap<K, V, C, S>
where
    S: Store<K, V>,
{
    store: S,
    cmp: C,
    root: Option<S::Ref>,
    branch: usize,
    height: usize,
    len: usize,
    _marker: PhantomData<(K, V)>,
}

/// What an insertion into a subtree told the parent.
enum InsertOutcome<K, R> {
    /// Insertion completed without a split.
    Done,
    /// The child split; the parent must adopt the new right sibling under
    /// the promoted separator.
    Split { separator: K, right: R },
}

/// What a removal from a subtree told the parent.
enum RemoveOutcome<V> {
    /// No matching key; nothing was touched.
    NotFound,
    /// The entry was removed. `dirty` is set when the node the caller
    /// materialized still needs a write-back.
    Removed { value: V, dirty: bool },
}

impl<K, V, C, S> RawBPlusMap<K, V, C, S>
where
    K: Clone,
    C: Comparator<K>,
    S: Store<K, V>,
{
    /// Creates an empty tree over the given store.
    ///
    /// # Panics
    ///
    /// Panics if `branch < 4`: the fill arithmetic is not defined for
    /// smaller branching factors.
    pub(crate) fn new(branch: usize, cmp: C, store: S) -> Self {
        assert!(branch >= 4, "branching factor must be at least 4 (got {branch})");
        Self {
            store,
            cmp,
            root: None,
            branch,
            height: 0,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Returns the number of entries in the tree.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Returns the branching factor.
    pub(crate) const fn branch(&self) -> usize {
        self.branch
    }

    /// Returns the current height (0 when empty).
    pub(crate) const fn height(&self) -> usize {
        self.height
    }

    /// Returns a reference to the backing store.
    pub(crate) const fn store(&self) -> &S {
        &self.store
    }

    /// Returns a reference to the comparator.
    pub(crate) const fn comparator(&self) -> &C {
        &self.cmp
    }

    /// The smallest child-slot count a non-root node may keep. A node below
    /// this underflows; a sibling exactly at it has nothing to lend.
    const fn min_children(&self) -> usize {
        self.branch / 2
    }

    /// Looks up `key`, returning its value if present.
    pub(crate) fn get(&self, key: &K) -> Result<Option<V>, S::Error> {
        let Some(mut current) = self.root else {
            return Ok(None);
        };
        loop {
            match self.store.read_node(current)? {
                Node::Internal(internal) => {
                    current = internal.child(internal.search_child(key, &self.cmp));
                }
                Node::Leaf(leaf) => {
                    return match leaf.search(key, &self.cmp) {
                        SearchResult::Found(idx) => self.store.read_value(leaf.value(idx)).map(Some),
                        SearchResult::NotFound(_) => Ok(None),
                    };
                }
            }
        }
    }

    /// Returns true if `key` is present, without materializing its value.
    pub(crate) fn contains(&self, key: &K) -> Result<bool, S::Error> {
        let Some(mut current) = self.root else {
            return Ok(false);
        };
        loop {
            match self.store.read_node(current)? {
                Node::Internal(internal) => {
                    current = internal.child(internal.search_child(key, &self.cmp));
                }
                Node::Leaf(leaf) => {
                    return Ok(matches!(leaf.search(key, &self.cmp), SearchResult::Found(_)));
                }
            }
        }
    }

    /// Inserts `key` → `value`, returning the replaced value if the key was
    /// already present.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Result<Option<V>, S::Error> {
        let Some(root_ref) = self.root else {
            let value_ref = self.store.alloc_value()?;
            self.store.write_value(value_ref, value)?;
            let mut leaf = LeafNode::new();
            leaf.push(key, value_ref);
            let root_ref = self.store.alloc_node()?;
            self.store.write_node(root_ref, Node::Leaf(leaf))?;
            self.root = Some(root_ref);
            self.height = 1;
            self.len = 1;
            return Ok(None);
        };

        let (outcome, replaced) = self.insert_rec(root_ref, key, value)?;
        if let InsertOutcome::Split { separator, right } = outcome {
            // The root itself split; grow a new root above the two halves.
            let mut new_root = InternalNode::new();
            new_root.set_first_child(root_ref);
            new_root.push_child(separator, right);
            let new_root_ref = self.store.alloc_node()?;
            self.store.write_node(new_root_ref, Node::Internal(new_root))?;
            self.root = Some(new_root_ref);
            self.height += 1;
        }
        if replaced.is_none() {
            self.len += 1;
        }
        Ok(replaced)
    }

    fn insert_rec(
        &mut self,
        node_ref: S::Ref,
        key: K,
        value: V,
    ) -> Result<(InsertOutcome<K, S::Ref>, Option<V>), S::Error> {
        match self.store.read_node(node_ref)? {
            Node::Leaf(mut leaf) => match leaf.search(&key, &self.cmp) {
                SearchResult::Found(idx) => {
                    // Replace the value slot in place; the leaf record is
                    // untouched and is not written back.
                    let value_ref = leaf.value(idx);
                    let old = self.store.read_value(value_ref)?;
                    self.store.write_value(value_ref, value)?;
                    Ok((InsertOutcome::Done, Some(old)))
                }
                SearchResult::NotFound(idx) => {
                    let value_ref = self.store.alloc_value()?;
                    self.store.write_value(value_ref, value)?;
                    leaf.insert(idx, key, value_ref);
                    if leaf.key_count() < self.branch {
                        self.store.write_node(node_ref, Node::Leaf(leaf))?;
                        return Ok((InsertOutcome::Done, None));
                    }
                    let (separator, right) = leaf.split();
                    let right_ref = self.store.alloc_node()?;
                    leaf.set_next(Some(right_ref));
                    self.store.write_node(node_ref, Node::Leaf(leaf))?;
                    self.store.write_node(right_ref, Node::Leaf(right))?;
                    Ok((
                        InsertOutcome::Split {
                            separator,
                            right: right_ref,
                        },
                        None,
                    ))
                }
            },
            Node::Internal(mut internal) => {
                let idx = internal.search_child(&key, &self.cmp);
                let (outcome, replaced) = self.insert_rec(internal.child(idx), key, value)?;
                let InsertOutcome::Split { separator, right } = outcome else {
                    return Ok((InsertOutcome::Done, replaced));
                };
                internal.insert_child(idx, separator, right);
                if internal.child_count() <= self.branch {
                    self.store.write_node(node_ref, Node::Internal(internal))?;
                    return Ok((InsertOutcome::Done, replaced));
                }
                let (separator, right) = internal.split();
                let right_ref = self.store.alloc_node()?;
                self.store.write_node(node_ref, Node::Internal(internal))?;
                self.store.write_node(right_ref, Node::Internal(right))?;
                Ok((
                    InsertOutcome::Split {
                        separator,
                        right: right_ref,
                    },
                    replaced,
                ))
            }
        }
    }

    /// Removes `key`, returning its value if it was present.
    pub(crate) fn remove(&mut self, key: &K) -> Result<Option<V>, S::Error> {
        let Some(root_ref) = self.root else {
            return Ok(None);
        };
        let mut root = self.store.read_node(root_ref)?;
        let RemoveOutcome::Removed { value, dirty } = self.remove_rec(&mut root, key)? else {
            return Ok(None);
        };
        self.len -= 1;

        match root {
            Node::Leaf(leaf) if leaf.key_count() == 0 => {
                // Last entry gone; the tree is empty again.
                self.store.dealloc_node(root_ref)?;
                self.root = None;
                self.height = 0;
            }
            Node::Internal(internal) if internal.child_count() == 1 => {
                // Root collapse: promote the only remaining child.
                self.root = Some(internal.child(0));
                self.store.dealloc_node(root_ref)?;
                self.height -= 1;
            }
            root => {
                if dirty {
                    self.store.write_node(root_ref, root)?;
                }
            }
        }
        Ok(Some(value))
    }

    fn remove_rec(&mut self, node: &mut Node<K, S::Ref>, key: &K) -> Result<RemoveOutcome<V>, S::Error> {
        match node {
            Node::Leaf(leaf) => match leaf.search(key, &self.cmp) {
                SearchResult::NotFound(_) => Ok(RemoveOutcome::NotFound),
                SearchResult::Found(idx) => {
                    let (_key, value_ref) = leaf.remove(idx);
                    let value = self.store.read_value(value_ref)?;
                    self.store.dealloc_value(value_ref)?;
                    Ok(RemoveOutcome::Removed { value, dirty: true })
                }
            },
            Node::Internal(internal) => {
                let pos = internal.search_child(key, &self.cmp);
                let child_ref = internal.child(pos);
                let mut child = self.store.read_node(child_ref)?;
                let RemoveOutcome::Removed { value, dirty } = self.remove_rec(&mut child, key)? else {
                    return Ok(RemoveOutcome::NotFound);
                };
                if child.child_count() >= self.min_children() {
                    if dirty {
                        self.store.write_node(child_ref, child)?;
                    }
                    Ok(RemoveOutcome::Removed { value, dirty: false })
                } else {
                    self.repair_underflow(internal, pos, child_ref, child)?;
                    Ok(RemoveOutcome::Removed { value, dirty: true })
                }
            }
        }
    }

    /// Repairs an underflowed child at `pos` against a sibling: the right
    /// one, or the left one when the child is the last. A sibling with
    /// nothing to spare is merged with; otherwise one entry is borrowed.
    ///
    /// Writes the repaired nodes back; the parent is left dirty for the
    /// caller.
    fn repair_underflow(
        &mut self,
        parent: &mut InternalNode<K, S::Ref>,
        pos: usize,
        node_ref: S::Ref,
        node: Node<K, S::Ref>,
    ) -> Result<(), S::Error> {
        let at_min = self.min_children();
        if pos + 1 < parent.child_count() {
            let next_ref = parent.child(pos + 1);
            let next = self.store.read_node(next_ref)?;
            if next.child_count() == at_min {
                self.merge_with_next(node_ref, node, next_ref, next, parent, pos + 1)
            } else {
                self.borrow_from_next(node_ref, node, next_ref, next, parent, pos + 1)
            }
        } else {
            let prev_ref = parent.child(pos - 1);
            let prev = self.store.read_node(prev_ref)?;
            if prev.child_count() == at_min {
                self.merge_with_next(prev_ref, prev, node_ref, node, parent, pos)
            } else {
                self.borrow_from_prev(node_ref, node, prev_ref, prev, parent, pos)
            }
        }
    }

    /// Concatenates `right` (at `right_pos` in the parent) into `left`,
    /// removing the separator between them and freeing `right`'s slot.
    fn merge_with_next(
        &mut self,
        left_ref: S::Ref,
        left: Node<K, S::Ref>,
        right_ref: S::Ref,
        right: Node<K, S::Ref>,
        parent: &mut InternalNode<K, S::Ref>,
        right_pos: usize,
    ) -> Result<(), S::Error> {
        let (separator, removed) = parent.remove_child(right_pos - 1);
        debug_assert!(removed == right_ref, "separator child disagrees with merge target");
        match (left, right) {
            (Node::Leaf(mut left), Node::Leaf(right)) => {
                // The separator dies with the merge; the chain link carries
                // forward inside merge_with_right.
                left.merge_with_right(right);
                self.store.write_node(left_ref, Node::Leaf(left))?;
            }
            (Node::Internal(mut left), Node::Internal(right)) => {
                left.merge_with_right(separator, right);
                self.store.write_node(left_ref, Node::Internal(left))?;
            }
            _ => panic!("merge across node kinds"),
        }
        self.store.dealloc_node(right_ref)
    }

    /// Moves the first entry of the right sibling into `node` and refreshes
    /// the separator between them.
    fn borrow_from_next(
        &mut self,
        node_ref: S::Ref,
        node: Node<K, S::Ref>,
        next_ref: S::Ref,
        next: Node<K, S::Ref>,
        parent: &mut InternalNode<K, S::Ref>,
        next_pos: usize,
    ) -> Result<(), S::Error> {
        match (node, next) {
            (Node::Leaf(mut node), Node::Leaf(mut next)) => {
                let (key, value_ref) = next.pop_front().expect("borrow from empty sibling");
                node.push(key, value_ref);
                parent.set_key(next_pos - 1, next.key(0).clone());
                self.store.write_node(node_ref, Node::Leaf(node))?;
                self.store.write_node(next_ref, Node::Leaf(next))
            }
            (Node::Internal(mut node), Node::Internal(mut next)) => {
                // Rotate: the old separator drops into `node`, the lent
                // key becomes the new separator.
                let (next_key, next_child) = next.pop_child_front().expect("borrow from empty sibling");
                let separator = parent.replace_key(next_pos - 1, next_key);
                node.push_child(separator, next_child);
                self.store.write_node(node_ref, Node::Internal(node))?;
                self.store.write_node(next_ref, Node::Internal(next))
            }
            _ => panic!("borrow across node kinds"),
        }
    }

    /// Moves the last entry of the left sibling into `node` (at `node_pos`
    /// in the parent) and refreshes the separator between them.
    fn borrow_from_prev(
        &mut self,
        node_ref: S::Ref,
        node: Node<K, S::Ref>,
        prev_ref: S::Ref,
        prev: Node<K, S::Ref>,
        parent: &mut InternalNode<K, S::Ref>,
        node_pos: usize,
    ) -> Result<(), S::Error> {
        match (node, prev) {
            (Node::Leaf(mut node), Node::Leaf(mut prev)) => {
                let (key, value_ref) = prev.pop().expect("borrow from empty sibling");
                node.push_front(key, value_ref);
                parent.set_key(node_pos - 1, node.key(0).clone());
                self.store.write_node(node_ref, Node::Leaf(node))?;
                self.store.write_node(prev_ref, Node::Leaf(prev))
            }
            (Node::Internal(mut node), Node::Internal(mut prev)) => {
                let (prev_key, prev_child) = prev.pop_child().expect("borrow from empty sibling");
                let separator = parent.replace_key(node_pos - 1, prev_key);
                node.push_child_front(separator, prev_child);
                self.store.write_node(node_ref, Node::Internal(node))?;
                self.store.write_node(prev_ref, Node::Internal(prev))
            }
            _ => panic!("borrow across node kinds"),
        }
    }
}
