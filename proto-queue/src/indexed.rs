use std::{fmt, rc::Rc};

use proto_common::{Key, KeyRef};
use proto_tree::{Cursor, Trie};
use tracing::warn;

use crate::{
    container::{Container, Shared},
    IndexedIter, Item, KeyProvider, Queue, QueueError, QueueId, QueueOptions,
};

/// A queue ordered by a unique key.
///
/// Keys are extracted by the queue's [`KeyProvider`] when an item is inserted. No two members
/// may have an equal key.
pub struct IndexedQueue<T: 'static, K> {
    shared: Shared<T, Trie<Container<T>>>,
    keys: K,
}

impl<T: 'static, K: KeyProvider<T>> IndexedQueue<T, K> {
    pub fn new(keys: K) -> Self {
        Self::with_options(keys, QueueOptions::default())
    }

    pub fn with_options(keys: K, options: QueueOptions) -> Self {
        let trie = Trie::with_capacity(options.container_capacity, keys.order());
        Self { shared: Shared::new(trie), keys }
    }

    #[inline]
    pub const fn keys(&self) -> &K {
        &self.keys
    }

    /// Runs `hook` with the value of every item that leaves the queue: through
    /// [`Queue::remove`], [`Queue::empty`] or [`Queue::destroy`], by being dropped, or by being
    /// detached from all its queues. Dropping the queue itself runs no hooks.
    ///
    /// The hook runs after the item has been unlinked and must not insert into this queue.
    pub fn on_detach(&mut self, hook: impl Fn(&T) + 'static) {
        self.shared.set_on_detach(Rc::new(hook));
    }

    /// Inserts `item` under the key its provider reports. Fails if the item is already a
    /// member or if another member has an equal key.
    pub fn insert(&mut self, item: &Item<T>) -> Result<(), QueueError> {
        let id = self.shared.id();
        let key = self.keys.key(item.get());
        self.shared.attach(item, |trie, container| {
            trie.insert(key, container).map_err(|occupied| {
                warn!(queue = %id, key = ?trie.key(occupied.existing), "Duplicate key");
                QueueError::DuplicateKey(id)
            })
        })?;
        Ok(())
    }

    /// Returns the item with exactly `key`.
    pub fn find<'k>(&self, key: impl Into<KeyRef<'k>>) -> Option<Item<T>> {
        let key = key.into();
        self.shared.lookup(|trie| trie.find(key))
    }

    /// Looks up a string key, without its terminator.
    pub fn find_string(&self, key: &str) -> Option<Item<T>> {
        self.find(key)
    }

    /// Returns the item with exactly `key`, or failing that the first item ordered after it.
    pub fn find_closest_match<'k>(&self, key: impl Into<KeyRef<'k>>) -> Option<Item<T>> {
        let key = key.into();
        self.shared.lookup(|trie| trie.find_closest_match(key))
    }

    /// Returns the item whose key is the longest prefix of `key`.
    pub fn find_prefix<'k>(&self, key: impl Into<KeyRef<'k>>) -> Option<Item<T>> {
        let key = key.into();
        self.shared.lookup(|trie| trie.find_prefix(key))
    }

    /// The member with the smallest key.
    pub fn first(&self) -> Option<Item<T>> {
        self.shared.lookup(Trie::first)
    }

    /// The member with the largest key.
    pub fn last(&self) -> Option<Item<T>> {
        self.shared.lookup(Trie::last)
    }

    /// Returns the key `item` is indexed under, if it is a member.
    pub fn key_of(&self, item: &Item<T>) -> Option<Key> {
        let id = self.shared.container_of(item)?;
        self.shared.with_store(|trie| trie.key(id).cloned())
    }

    /// Iterates in ascending key order.
    pub fn iter(&self) -> IndexedIter<T> {
        self.iter_with(false)
    }

    /// Iterates in descending key order.
    pub fn iter_rev(&self) -> IndexedIter<T> {
        self.iter_with(true)
    }

    /// Iterates over the members whose key starts with `prefix`.
    pub fn iter_prefix<'k>(&self, prefix: impl Into<KeyRef<'k>>, reverse: bool) -> IndexedIter<T> {
        let mut iter = self.iter_with(reverse);
        iter.reset_prefix(prefix, reverse);
        iter
    }

    fn iter_with(&self, reverse: bool) -> IndexedIter<T> {
        let cursor = self.shared.cursor(|trie| Cursor::new(trie, reverse));
        IndexedIter::new(self.shared.downgrade(), cursor, reverse)
    }
}

impl<T: 'static, K: KeyProvider<T>> Queue<T> for IndexedQueue<T, K> {
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

impl<T: 'static, K> fmt::Debug for IndexedQueue<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.shared, f)
    }
}
