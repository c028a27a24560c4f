use proto_common::{Key, KeyOrder, KeyRef};

use crate::{slab::Slab, EntryId, Handle, Occupied, Sequence, Trie};

/// Handle to an entry of a [`SortedTrie`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortedId(u32);

impl Handle for SortedId {
    #[inline]
    fn into_raw(self) -> u32 {
        self.0
    }

    #[inline]
    fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

/// The entries sharing one key, oldest first.
#[derive(Debug)]
struct Run {
    head: u32,
    tail: u32,
}

#[derive(Debug)]
struct Member<V> {
    leaf: EntryId,
    prev: Option<u32>,
    next: Option<u32>,
    value: V,
}

/// An ordered multimap over bit-string keys.
///
/// Entries with equal keys are kept together, in insertion order, after any entry with a
/// smaller key and before any entry with a larger one.
#[derive(Debug)]
pub struct SortedTrie<V> {
    runs: Trie<Run>,
    members: Slab<Member<V>>,
}

impl<V> Default for SortedTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> SortedTrie<V> {
    pub const fn new() -> Self {
        Self::with_order(KeyOrder::unsigned())
    }

    pub const fn with_order(order: KeyOrder) -> Self {
        Self { runs: Trie::with_order(order), members: Slab::new() }
    }

    pub fn with_capacity(capacity: usize, order: KeyOrder) -> Self {
        Self { runs: Trie::with_capacity(capacity, order), members: Slab::with_capacity(capacity) }
    }

    #[inline]
    pub const fn order(&self) -> KeyOrder {
        self.runs.order()
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.members.len() == 0
    }

    /// Number of distinct keys.
    #[inline]
    pub const fn key_count(&self) -> usize {
        self.runs.len()
    }

    /// Inserts `value` after every entry whose key is equal to or smaller than `key`.
    pub fn insert(&mut self, key: Key, value: V) -> SortedId {
        match self.runs.insert(key, Run { head: u32::MAX, tail: u32::MAX }) {
            Ok(leaf) => {
                let index = self.members.insert(Member { leaf, prev: None, next: None, value });
                if let Some(run) = self.runs.get_mut(leaf) {
                    run.head = index;
                    run.tail = index;
                }
                SortedId(index)
            }
            Err(Occupied { existing, .. }) => self.append(existing, value),
        }
    }

    fn append(&mut self, leaf: EntryId, value: V) -> SortedId {
        let tail = self.runs.get(leaf).map(|run| run.tail);
        let index = self.members.insert(Member { leaf, prev: tail, next: None, value });
        if let Some(prev) = tail.and_then(|t| self.members.get_mut(t)) {
            prev.next = Some(index);
        }
        if let Some(run) = self.runs.get_mut(leaf) {
            run.tail = index;
        }
        SortedId(index)
    }

    pub fn remove(&mut self, id: SortedId) -> Option<V> {
        let member = self.members.remove(id.0)?;
        if let Some(prev) = member.prev.and_then(|p| self.members.get_mut(p)) {
            prev.next = member.next;
        }
        if let Some(next) = member.next.and_then(|n| self.members.get_mut(n)) {
            next.prev = member.prev;
        }

        match (member.prev, member.next) {
            (None, None) => {
                self.runs.remove(member.leaf);
            }
            (None, Some(next)) => {
                if let Some(run) = self.runs.get_mut(member.leaf) {
                    run.head = next;
                }
            }
            (Some(prev), None) => {
                if let Some(run) = self.runs.get_mut(member.leaf) {
                    run.tail = prev;
                }
            }
            (Some(_), Some(_)) => {}
        }
        Some(member.value)
    }

    /// Removes and returns the first entry.
    pub fn pop_first(&mut self) -> Option<V> {
        self.remove(self.first()?)
    }

    #[inline]
    pub fn get(&self, id: SortedId) -> Option<&V> {
        self.members.get(id.0).map(|member| &member.value)
    }

    #[inline]
    pub fn get_mut(&mut self, id: SortedId) -> Option<&mut V> {
        self.members.get_mut(id.0).map(|member| &mut member.value)
    }

    #[inline]
    pub fn key(&self, id: SortedId) -> Option<&Key> {
        self.runs.key(self.members.get(id.0)?.leaf)
    }

    #[inline]
    pub fn contains(&self, id: SortedId) -> bool {
        self.members.get(id.0).is_some()
    }

    fn run_head(&self, leaf: EntryId) -> Option<SortedId> {
        self.runs.get(leaf).map(|run| SortedId(run.head))
    }

    fn run_tail(&self, leaf: EntryId) -> Option<SortedId> {
        self.runs.get(leaf).map(|run| SortedId(run.tail))
    }

    /// Finds the oldest entry with exactly this key.
    pub fn find<'k>(&self, key: impl Into<KeyRef<'k>>) -> Option<SortedId> {
        self.run_head(self.runs.find(key)?)
    }

    /// Finds the first entry whose key is not smaller than `key`.
    pub fn lower_bound<'k>(&self, key: impl Into<KeyRef<'k>>) -> Option<SortedId> {
        self.run_head(self.runs.lower_bound(key)?)
    }

    /// Finds the last entry whose key is not greater than `key`.
    pub fn floor<'k>(&self, key: impl Into<KeyRef<'k>>) -> Option<SortedId> {
        self.run_tail(self.runs.floor(key)?)
    }

    /// Finds the oldest entry with the longest key that is a prefix of `key`.
    pub fn find_prefix<'k>(&self, key: impl Into<KeyRef<'k>>) -> Option<SortedId> {
        self.run_head(self.runs.find_prefix(key)?)
    }

    pub fn prefix_range<'k>(&self, prefix: impl Into<KeyRef<'k>>) -> Option<(SortedId, SortedId)> {
        let (first, last) = self.runs.prefix_range(prefix)?;
        Some((self.run_head(first)?, self.run_tail(last)?))
    }

    pub fn first(&self) -> Option<SortedId> {
        self.run_head(self.runs.first()?)
    }

    pub fn last(&self) -> Option<SortedId> {
        self.run_tail(self.runs.last()?)
    }

    pub fn next(&self, id: SortedId) -> Option<SortedId> {
        let member = self.members.get(id.0)?;
        match member.next {
            Some(next) => Some(SortedId(next)),
            None => self.run_head(self.runs.next(member.leaf)?),
        }
    }

    pub fn prev(&self, id: SortedId) -> Option<SortedId> {
        let member = self.members.get(id.0)?;
        match member.prev {
            Some(prev) => Some(SortedId(prev)),
            None => self.run_tail(self.runs.prev(member.leaf)?),
        }
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter { trie: self, front: self.first(), back: self.last() }
    }

    pub fn clear(&mut self) {
        self.runs.clear();
        self.members.clear();
    }

    /// Removes every value, in no particular order.
    pub fn drain(&mut self) -> impl Iterator<Item = V> {
        self.runs.clear();
        self.members.drain().map(|member| member.value)
    }
}

impl<V> Sequence for SortedTrie<V> {
    type Id = SortedId;

    fn first(&self) -> Option<SortedId> {
        Self::first(self)
    }

    fn last(&self) -> Option<SortedId> {
        Self::last(self)
    }

    fn next(&self, id: SortedId) -> Option<SortedId> {
        Self::next(self, id)
    }

    fn prev(&self, id: SortedId) -> Option<SortedId> {
        Self::prev(self, id)
    }

    fn prefix_range(&self, prefix: KeyRef<'_>) -> Option<(SortedId, SortedId)> {
        Self::prefix_range(self, prefix)
    }

    fn has_prefix(&self, id: SortedId, prefix: KeyRef<'_>) -> bool {
        self.key(id).is_some_and(|key| self.order().has_prefix(key.as_key_ref(), prefix))
    }
}

/// Iterator over the entries of a [`SortedTrie`] in key order, then insertion order.
#[derive(Debug)]
pub struct Iter<'a, V> {
    trie: &'a SortedTrie<V>,
    front: Option<SortedId>,
    back: Option<SortedId>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (SortedId, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.front?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = self.trie.next(id);
        }
        Some((id, self.trie.get(id)?))
    }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let id = self.back?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.back = self.trie.prev(id);
        }
        Some((id, self.trie.get(id)?))
    }
}

impl<'a, V> IntoIterator for &'a SortedTrie<V> {
    type Item = (SortedId, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
