use proto_common::{Key, KeyOrder, KeyRef};

use crate::{slab::Slab, Handle, Sequence};

/// Branch symbol of a key that ends at the branch position. Orders before both bit values.
const END: usize = 0;
const ZERO: usize = 1;
const ONE: usize = 2;

/// Handle to an entry of a [`Trie`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) u32);

impl Handle for EntryId {
    #[inline]
    fn into_raw(self) -> u32 {
        self.0
    }

    #[inline]
    fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

/// Returned by [`Trie::insert`] when an entry with an identical key already exists.
#[derive(Debug)]
pub struct Occupied<V> {
    /// The entry holding the key.
    pub existing: EntryId,
    /// The rejected value.
    pub value: V,
}

#[derive(Debug)]
struct Branch {
    /// Index of the first bit at which the keys below this branch differ.
    pos: usize,
    parent: Option<u32>,
    /// Subtrees for keys ending at `pos`, with a zero bit at `pos`, and with a one bit at `pos`.
    children: [Option<u32>; 3],
}

#[derive(Debug)]
struct Leaf<V> {
    key: Key,
    value: V,
    parent: Option<u32>,
    prev: Option<u32>,
    next: Option<u32>,
}

#[derive(Debug)]
enum Node<V> {
    Branch(Branch),
    Leaf(Leaf<V>),
}

impl<V> Node<V> {
    const fn parent(&self) -> Option<u32> {
        match self {
            Self::Branch(branch) => branch.parent,
            Self::Leaf(leaf) => leaf.parent,
        }
    }

    fn set_parent(&mut self, parent: Option<u32>) {
        match self {
            Self::Branch(branch) => branch.parent = parent,
            Self::Leaf(leaf) => leaf.parent = parent,
        }
    }
}

/// Where a missing key would be linked in.
#[derive(Debug)]
enum Anchor {
    /// The trie is empty.
    Root,
    /// The free `symbol` slot of an existing branch.
    Slot { branch: u32, symbol: usize },
    /// A new branch at `pos`, above `node`, whose keys carry the `other` symbol there.
    Split { node: u32, pos: usize, symbol: usize, other: usize },
}

#[derive(Debug)]
struct Gap {
    anchor: Anchor,
    prev: Option<u32>,
    next: Option<u32>,
}

#[derive(Debug)]
enum Located {
    Exact(u32),
    Gap(Gap),
}

/// A binary radix trie over bit-string keys.
///
/// Each branch splits its subtree on the first bit position where the keys below it differ,
/// with a separate slot for the key that ends right at that position. Keys are therefore kept
/// in the order defined by the trie's [`KeyOrder`], and every entry is also threaded into a
/// doubly linked list so that in-order neighbours are found in constant time.
///
/// Keys are unique: inserting a key that is already present fails.
#[derive(Debug)]
pub struct Trie<V> {
    nodes: Slab<Node<V>>,
    root: Option<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
    order: KeyOrder,
}

impl<V> Default for Trie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Trie<V> {
    /// Creates an empty trie using the default (unsigned, big endian) key order.
    pub const fn new() -> Self {
        Self::with_order(KeyOrder::unsigned())
    }

    pub const fn with_order(order: KeyOrder) -> Self {
        Self { nodes: Slab::new(), root: None, head: None, tail: None, len: 0, order }
    }

    /// Creates an empty trie with node storage for `capacity` entries.
    pub fn with_capacity(capacity: usize, order: KeyOrder) -> Self {
        let mut trie = Self::with_order(order);
        trie.nodes = Slab::with_capacity(capacity.saturating_mul(2));
        trie
    }

    #[inline]
    pub const fn order(&self) -> KeyOrder {
        self.order
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn symbol(&self, key: KeyRef<'_>, index: usize) -> usize {
        if index >= key.bits() {
            END
        } else if self.order.bit(key, index) {
            ONE
        } else {
            ZERO
        }
    }

    #[inline]
    fn leaf(&self, index: u32) -> Option<&Leaf<V>> {
        match self.nodes.get(index)? {
            Node::Leaf(leaf) => Some(leaf),
            Node::Branch(_) => None,
        }
    }

    #[inline]
    fn leaf_mut(&mut self, index: u32) -> Option<&mut Leaf<V>> {
        match self.nodes.get_mut(index)? {
            Node::Leaf(leaf) => Some(leaf),
            Node::Branch(_) => None,
        }
    }

    #[inline]
    fn branch_mut(&mut self, index: u32) -> Option<&mut Branch> {
        match self.nodes.get_mut(index)? {
            Node::Branch(branch) => Some(branch),
            Node::Leaf(_) => None,
        }
    }

    fn set_parent(&mut self, index: u32, parent: Option<u32>) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.set_parent(parent);
        }
    }

    /// Points whatever referenced `old` (its parent's slot, or the root) at `new`.
    fn replace_child(&mut self, parent: Option<u32>, old: u32, new: u32) {
        match parent.and_then(|p| self.branch_mut(p)) {
            Some(branch) => {
                for slot in &mut branch.children {
                    if *slot == Some(old) {
                        *slot = Some(new);
                    }
                }
            }
            None => self.root = Some(new),
        }
    }

    fn min_leaf(&self, mut index: u32) -> u32 {
        while let Some(Node::Branch(branch)) = self.nodes.get(index) {
            match branch.children.iter().flatten().next() {
                Some(&child) => index = child,
                None => break,
            }
        }
        index
    }

    fn max_leaf(&self, mut index: u32) -> u32 {
        while let Some(Node::Branch(branch)) = self.nodes.get(index) {
            match branch.children.iter().rev().flatten().next() {
                Some(&child) => index = child,
                None => break,
            }
        }
        index
    }

    /// Walks down to the leaf sharing the longest run of branch bits with `key`.
    fn descend(&self, key: KeyRef<'_>) -> Option<u32> {
        let mut index = self.root?;
        loop {
            match self.nodes.get(index)? {
                Node::Leaf(_) => return Some(index),
                Node::Branch(branch) => {
                    index = match branch.children[self.symbol(key, branch.pos)] {
                        Some(child) => child,
                        None => *branch.children.iter().flatten().next()?,
                    };
                }
            }
        }
    }

    /// Finds `key`, or the spot where it would be linked in along with its in-order neighbours.
    fn locate(&self, key: KeyRef<'_>) -> Located {
        let (Some(root), Some(near)) = (self.root, self.descend(key)) else {
            return Located::Gap(Gap { anchor: Anchor::Root, prev: None, next: None });
        };
        let Some(near_key) = self.leaf(near).map(|leaf| leaf.key.as_key_ref()) else {
            return Located::Gap(Gap { anchor: Anchor::Root, prev: None, next: None });
        };
        let Some(diff) = self.order.first_difference(key, near_key) else {
            return Located::Exact(near);
        };

        // Every branch above the divergence point is shared with `near`.
        let mut index = root;
        while let Some(Node::Branch(branch)) = self.nodes.get(index) {
            if branch.pos >= diff {
                break;
            }
            match branch.children[self.symbol(key, branch.pos)] {
                Some(child) => index = child,
                None => {
                    debug_assert!(false, "missing child on shared path");
                    break;
                }
            }
        }

        let symbol = self.symbol(key, diff);
        match self.nodes.get(index) {
            Some(Node::Branch(branch)) if branch.pos == diff => {
                debug_assert!(branch.children[symbol].is_none());
                let prev = match branch.children[..symbol].iter().rev().flatten().next() {
                    Some(&lower) => Some(self.max_leaf(lower)),
                    None => self.leaf(self.min_leaf(index)).and_then(|leaf| leaf.prev),
                };
                let next = match branch.children[symbol + 1..].iter().flatten().next() {
                    Some(&upper) => Some(self.min_leaf(upper)),
                    None => self.leaf(self.max_leaf(index)).and_then(|leaf| leaf.next),
                };
                Located::Gap(Gap { anchor: Anchor::Slot { branch: index, symbol }, prev, next })
            }
            _ => {
                let other = self.symbol(near_key, diff);
                let (prev, next) = if symbol < other {
                    let first = self.min_leaf(index);
                    (self.leaf(first).and_then(|leaf| leaf.prev), Some(first))
                } else {
                    let last = self.max_leaf(index);
                    (Some(last), self.leaf(last).and_then(|leaf| leaf.next))
                };
                let anchor = Anchor::Split { node: index, pos: diff, symbol, other };
                Located::Gap(Gap { anchor, prev, next })
            }
        }
    }

    /// Inserts `value` under `key`. If an entry with an identical key (same bits, same length)
    /// exists, the value is handed back in [`Occupied`].
    pub fn insert(&mut self, key: Key, value: V) -> Result<EntryId, Occupied<V>> {
        let gap = match self.locate(key.as_key_ref()) {
            Located::Exact(existing) => return Err(Occupied { existing: EntryId(existing), value }),
            Located::Gap(gap) => gap,
        };

        let leaf =
            self.nodes.insert(Node::Leaf(Leaf { key, value, parent: None, prev: gap.prev, next: gap.next }));

        match gap.anchor {
            Anchor::Root => self.root = Some(leaf),
            Anchor::Slot { branch, symbol } => {
                if let Some(node) = self.branch_mut(branch) {
                    node.children[symbol] = Some(leaf);
                }
                self.set_parent(leaf, Some(branch));
            }
            Anchor::Split { node, pos, symbol, other } => {
                let parent = self.nodes.get(node).and_then(Node::parent);
                let mut children = [None; 3];
                children[symbol] = Some(leaf);
                children[other] = Some(node);
                let branch = self.nodes.insert(Node::Branch(Branch { pos, parent, children }));
                self.replace_child(parent, node, branch);
                self.set_parent(node, Some(branch));
                self.set_parent(leaf, Some(branch));
            }
        }

        match gap.prev.and_then(|p| self.leaf_mut(p)) {
            Some(prev) => prev.next = Some(leaf),
            None => self.head = Some(leaf),
        }
        match gap.next.and_then(|n| self.leaf_mut(n)) {
            Some(next) => next.prev = Some(leaf),
            None => self.tail = Some(leaf),
        }

        self.len += 1;
        Ok(EntryId(leaf))
    }

    /// Removes an entry, returning its key and value.
    pub fn remove(&mut self, id: EntryId) -> Option<(Key, V)> {
        let (parent, prev, next) = {
            let leaf = self.leaf(id.0)?;
            (leaf.parent, leaf.prev, leaf.next)
        };

        match prev.and_then(|p| self.leaf_mut(p)) {
            Some(leaf) => leaf.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.leaf_mut(n)) {
            Some(leaf) => leaf.prev = prev,
            None => self.tail = prev,
        }

        match parent {
            Some(parent) => {
                // A branch left with a single child is spliced out.
                let mut grandparent = None;
                let mut orphan = None;
                if let Some(branch) = self.branch_mut(parent) {
                    for slot in &mut branch.children {
                        if *slot == Some(id.0) {
                            *slot = None;
                        }
                    }
                    let mut remaining = branch.children.iter().flatten();
                    if let (Some(&only), None) = (remaining.next(), remaining.next()) {
                        orphan = Some(only);
                        grandparent = branch.parent;
                    }
                }
                if let Some(child) = orphan {
                    self.nodes.remove(parent);
                    self.replace_child(grandparent, parent, child);
                    self.set_parent(child, grandparent);
                }
            }
            None => self.root = None,
        }

        self.len -= 1;
        match self.nodes.remove(id.0)? {
            Node::Leaf(leaf) => Some((leaf.key, leaf.value)),
            Node::Branch(_) => None,
        }
    }

    #[inline]
    pub fn get(&self, id: EntryId) -> Option<&V> {
        self.leaf(id.0).map(|leaf| &leaf.value)
    }

    #[inline]
    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut V> {
        self.leaf_mut(id.0).map(|leaf| &mut leaf.value)
    }

    #[inline]
    pub fn key(&self, id: EntryId) -> Option<&Key> {
        self.leaf(id.0).map(|leaf| &leaf.key)
    }

    #[inline]
    pub fn contains(&self, id: EntryId) -> bool {
        self.leaf(id.0).is_some()
    }

    /// Finds the entry whose key is identical to `key`.
    pub fn find<'k>(&self, key: impl Into<KeyRef<'k>>) -> Option<EntryId> {
        let key = key.into();
        let mut index = self.root?;
        loop {
            match self.nodes.get(index)? {
                Node::Branch(branch) => index = branch.children[self.symbol(key, branch.pos)]?,
                Node::Leaf(leaf) => {
                    return self.order.equal(leaf.key.as_key_ref(), key).then_some(EntryId(index));
                }
            }
        }
    }

    /// Finds the exact match for `key`, otherwise the first entry after it, otherwise the last
    /// entry. Returns `None` only if the trie is empty.
    pub fn find_closest_match<'k>(&self, key: impl Into<KeyRef<'k>>) -> Option<EntryId> {
        match self.locate(key.into()) {
            Located::Exact(index) => Some(EntryId(index)),
            Located::Gap(gap) => gap.next.or(gap.prev).map(EntryId),
        }
    }

    /// Finds the first entry whose key is not smaller than `key`.
    pub fn lower_bound<'k>(&self, key: impl Into<KeyRef<'k>>) -> Option<EntryId> {
        match self.locate(key.into()) {
            Located::Exact(index) => Some(EntryId(index)),
            Located::Gap(gap) => gap.next.map(EntryId),
        }
    }

    /// Finds the last entry whose key is not greater than `key`.
    pub fn floor<'k>(&self, key: impl Into<KeyRef<'k>>) -> Option<EntryId> {
        match self.locate(key.into()) {
            Located::Exact(index) => Some(EntryId(index)),
            Located::Gap(gap) => gap.prev.map(EntryId),
        }
    }

    /// Finds the entry with the longest key that is a prefix of `key` (including `key` itself).
    pub fn find_prefix<'k>(&self, key: impl Into<KeyRef<'k>>) -> Option<EntryId> {
        let key = key.into();
        let mut best = None;
        let mut index = self.root?;
        loop {
            match self.nodes.get(index)? {
                Node::Branch(branch) => {
                    // A key ending at this branch is the only candidate that leaves the path.
                    if let Some(end) = branch.children[END] {
                        if self.leaf(end).is_some_and(|leaf| self.order.has_prefix(key, leaf.key.as_key_ref())) {
                            best = Some(end);
                        }
                    }
                    match self.symbol(key, branch.pos) {
                        END => break,
                        symbol => match branch.children[symbol] {
                            Some(child) => index = child,
                            None => break,
                        },
                    }
                }
                Node::Leaf(leaf) => {
                    if self.order.has_prefix(key, leaf.key.as_key_ref()) {
                        best = Some(index);
                    }
                    break;
                }
            }
        }
        best.map(EntryId)
    }

    /// Returns the first and last entries whose keys start with `prefix`.
    pub fn prefix_range<'k>(&self, prefix: impl Into<KeyRef<'k>>) -> Option<(EntryId, EntryId)> {
        let prefix = prefix.into();
        let mut index = self.root?;
        while let Node::Branch(branch) = self.nodes.get(index)? {
            if branch.pos >= prefix.bits() {
                break;
            }
            index = branch.children[self.symbol(prefix, branch.pos)]?;
        }

        // Everything below `index` agrees on the prefix bits.
        let first = self.min_leaf(index);
        let leaf = self.leaf(first)?;
        self.order
            .has_prefix(leaf.key.as_key_ref(), prefix)
            .then(|| (EntryId(first), EntryId(self.max_leaf(index))))
    }

    pub fn first(&self) -> Option<EntryId> {
        self.head.map(EntryId)
    }

    pub fn last(&self) -> Option<EntryId> {
        self.tail.map(EntryId)
    }

    pub fn next(&self, id: EntryId) -> Option<EntryId> {
        self.leaf(id.0)?.next.map(EntryId)
    }

    pub fn prev(&self, id: EntryId) -> Option<EntryId> {
        self.leaf(id.0)?.prev.map(EntryId)
    }

    /// Number of branches between the entry and the root.
    pub fn depth(&self, id: EntryId) -> Option<usize> {
        let mut parent = self.leaf(id.0)?.parent;
        let mut depth = 0;
        while let Some(index) = parent {
            depth += 1;
            parent = self.nodes.get(index).and_then(Node::parent);
        }
        Some(depth)
    }

    /// Removes and returns the entry with the smallest key.
    pub fn pop_first(&mut self) -> Option<(Key, V)> {
        self.remove(EntryId(self.head?))
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter { trie: self, front: self.head, back: self.tail }
    }

    /// Iterates over the entries whose keys start with `prefix`, in order.
    pub fn iter_prefix<'k>(&self, prefix: impl Into<KeyRef<'k>>) -> Iter<'_, V> {
        match self.prefix_range(prefix) {
            Some((first, last)) => Iter { trie: self, front: Some(first.0), back: Some(last.0) },
            None => Iter { trie: self, front: None, back: None },
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Removes every entry, in no particular order.
    pub fn drain(&mut self) -> impl Iterator<Item = (Key, V)> {
        self.root = None;
        self.head = None;
        self.tail = None;
        self.len = 0;
        self.nodes.drain().filter_map(|node| match node {
            Node::Leaf(leaf) => Some((leaf.key, leaf.value)),
            Node::Branch(_) => None,
        })
    }
}

impl<V> Sequence for Trie<V> {
    type Id = EntryId;

    fn first(&self) -> Option<EntryId> {
        Self::first(self)
    }

    fn last(&self) -> Option<EntryId> {
        Self::last(self)
    }

    fn next(&self, id: EntryId) -> Option<EntryId> {
        Self::next(self, id)
    }

    fn prev(&self, id: EntryId) -> Option<EntryId> {
        Self::prev(self, id)
    }

    fn prefix_range(&self, prefix: KeyRef<'_>) -> Option<(EntryId, EntryId)> {
        Self::prefix_range(self, prefix)
    }

    fn has_prefix(&self, id: EntryId, prefix: KeyRef<'_>) -> bool {
        self.key(id).is_some_and(|key| self.order.has_prefix(key.as_key_ref(), prefix))
    }
}

/// Iterator over the entries of a [`Trie`] in key order.
#[derive(Debug)]
pub struct Iter<'a, V> {
    trie: &'a Trie<V>,
    front: Option<u32>,
    back: Option<u32>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (EntryId, &'a Key, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.front?;
        let leaf = self.trie.leaf(index)?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = leaf.next;
        }
        Some((EntryId(index), &leaf.key, &leaf.value))
    }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let index = self.back?;
        let leaf = self.trie.leaf(index)?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.back = leaf.prev;
        }
        Some((EntryId(index), &leaf.key, &leaf.value))
    }
}

impl<'a, V> IntoIterator for &'a Trie<V> {
    type Item = (EntryId, &'a Key, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
