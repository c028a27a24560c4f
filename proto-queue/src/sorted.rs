use std::fmt;

use proto_common::{Key, KeyRef};
use proto_tree::{Cursor, SortedTrie};

use crate::{
    container::{Container, Shared},
    Item, KeyProvider, Queue, QueueError, QueueId, QueueOptions, SortedIter,
};

/// A queue ordered by a key that members may share.
///
/// Members with equal keys are kept in insertion order.
pub struct SortedQueue<T: 'static, K> {
    shared: Shared<T, SortedTrie<Container<T>>>,
    keys: K,
}

impl<T: 'static, K: KeyProvider<T>> SortedQueue<T, K> {
    pub fn new(keys: K) -> Self {
        Self::with_options(keys, QueueOptions::default())
    }

    pub fn with_options(keys: K, options: QueueOptions) -> Self {
        let trie = SortedTrie::with_capacity(options.container_capacity, keys.order());
        Self { shared: Shared::new(trie), keys }
    }

    #[inline]
    pub const fn keys(&self) -> &K {
        &self.keys
    }

    /// Inserts `item` after every member whose key is equal or smaller. Only fails if the item
    /// is already a member.
    pub fn insert(&mut self, item: &Item<T>) -> Result<(), QueueError> {
        let key = self.keys.key(item.get());
        self.shared.attach(item, |trie, container| Ok(trie.insert(key, container)))?;
        Ok(())
    }

    /// Returns the oldest member with exactly `key`.
    pub fn find<'k>(&self, key: impl Into<KeyRef<'k>>) -> Option<Item<T>> {
        let key = key.into();
        self.shared.lookup(|trie| trie.find(key))
    }

    pub fn head(&self) -> Option<Item<T>> {
        self.shared.lookup(SortedTrie::first)
    }

    pub fn tail(&self) -> Option<Item<T>> {
        self.shared.lookup(SortedTrie::last)
    }

    /// Removes and returns the member with the smallest key.
    pub fn remove_head(&mut self) -> Option<Item<T>> {
        self.shared.take(self.shared.with_store(SortedTrie::first))
    }

    pub fn key_of(&self, item: &Item<T>) -> Option<Key> {
        let id = self.shared.container_of(item)?;
        self.shared.with_store(|trie| trie.key(id).cloned())
    }

    pub fn iter(&self) -> SortedIter<T> {
        self.iter_with(false)
    }

    pub fn iter_rev(&self) -> SortedIter<T> {
        self.iter_with(true)
    }

    /// Iterates from the first member whose key is not smaller than `key`, or backwards from the
    /// last member whose key is not greater than `key` when `reverse` is set.
    pub fn iter_from<'k>(&self, key: impl Into<KeyRef<'k>>, reverse: bool) -> SortedIter<T> {
        let mut iter = self.iter_with(reverse);
        iter.reset_from(key, reverse);
        iter
    }

    /// Iterates over the members whose key starts with `prefix`.
    pub fn iter_prefix<'k>(&self, prefix: impl Into<KeyRef<'k>>, reverse: bool) -> SortedIter<T> {
        let mut iter = self.iter_with(reverse);
        iter.reset_prefix(prefix, reverse);
        iter
    }

    fn iter_with(&self, reverse: bool) -> SortedIter<T> {
        let cursor = self.shared.cursor(|trie| Cursor::new(trie, reverse));
        SortedIter::new(self.shared.downgrade(), cursor, reverse)
    }
}

impl<T: 'static, K: KeyProvider<T>> Queue<T> for SortedQueue<T, K> {
    fn id(&self) -> QueueId {
        self.shared.id()
    }

    fn len(&self) -> usize {
        self.shared.len()
    }

    fn contains(&self, item: &Item<T>) -> bool {
        self.shared.contains(item)
    }

    fn remove(&mut self, item: &Item<T>) -> bool {
        self.shared.detach(item)
    }

    fn empty(&mut self) {
        self.shared.empty();
    }

    fn destroy(&mut self) {
        self.shared.destroy();
    }
}

impl<T: 'static, K> fmt::Debug for SortedQueue<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.shared, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyFn;

    /// Sorted by the first element, tagged by the second.
    fn by_rank() -> SortedQueue<(u8, char), impl KeyProvider<(u8, char)>> {
        SortedQueue::new(KeyFn::new(|value: &(u8, char)| Key::from(value.0)))
    }

    fn tags(iter: SortedIter<(u8, char)>) -> String {
        iter.map(|item| item.1).collect()
    }

    #[test]
    fn sorted_queue_keeps_duplicates_in_order() {
        let mut queue = by_rank();
        let items: Vec<_> =
            [(5, 'a'), (1, 'b'), (5, 'c'), (9, 'd'), (1, 'e'), (5, 'f')].into_iter().map(Item::new).collect();
        for item in &items {
            queue.insert(item).unwrap();
        }

        assert_eq!(queue.len(), 6);
        assert_eq!(tags(queue.iter()), "beacfd");
        assert_eq!(tags(queue.iter_rev()), "dfcaeb");
        assert_eq!(queue.find(&Key::from(5u8)).map(|item| item.1), Some('a'));
        assert_eq!(queue.insert(&items[0]), Err(QueueError::AlreadyMember(queue.id())));
    }

    #[test]
    fn sorted_queue_seeded_iteration() {
        let mut queue = by_rank();
        let items: Vec<_> =
            [(2, 'a'), (4, 'b'), (4, 'c'), (6, 'd'), (8, 'e')].into_iter().map(Item::new).collect();
        for item in &items {
            queue.insert(item).unwrap();
        }

        assert_eq!(tags(queue.iter_from(&Key::from(4u8), false)), "bcde");
        assert_eq!(tags(queue.iter_from(&Key::from(5u8), false)), "de");
        assert_eq!(tags(queue.iter_from(&Key::from(4u8), true)), "cba");
        assert_eq!(tags(queue.iter_from(&Key::from(3u8), true)), "a");
        assert_eq!(tags(queue.iter_from(&Key::from(9u8), false)), "");
    }

    #[test]
    fn sorted_queue_head_tail() {
        let mut queue = by_rank();
        let items: Vec<_> = [(3, 'a'), (1, 'b'), (1, 'c'), (7, 'd')].into_iter().map(Item::new).collect();
        for item in &items {
            queue.insert(item).unwrap();
        }

        assert_eq!(queue.head().map(|item| item.1), Some('b'));
        assert_eq!(queue.tail().map(|item| item.1), Some('d'));
        assert_eq!(queue.remove_head().map(|item| item.1), Some('b'));
        assert_eq!(queue.remove_head().map(|item| item.1), Some('c'));
        assert_eq!(queue.key_of(&items[0]), Some(Key::from(3u8)));
        assert_eq!(queue.key_of(&items[1]), None);
        assert_eq!(tags(queue.iter()), "ad");
    }

    #[test]
    fn set_cursor_within_run() {
        let mut queue = by_rank();
        let items: Vec<_> = [(1, 'a'), (2, 'b'), (2, 'c'), (2, 'd'), (3, 'e')].into_iter().map(Item::new).collect();
        for item in &items {
            queue.insert(item).unwrap();
        }

        let mut iter = queue.iter();
        assert!(iter.set_cursor(&items[2]));
        assert_eq!(iter.peek_prev().map(|item| item.1), Some('b'));
        assert_eq!(tags(iter), "cde");

        let stranger = Item::new((2, 'z'));
        assert!(!queue.iter().set_cursor(&stranger));
    }
}
