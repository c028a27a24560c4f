use std::fmt;

use proto_tree::{Cursor, List};

use crate::{
    container::{Container, Shared},
    Item, Queue, QueueError, QueueId, QueueOptions, SimpleIter,
};

/// A queue kept in insertion order.
pub struct SimpleQueue<T: 'static> {
    shared: Shared<T, List<Container<T>>>,
}

impl<T: 'static> Default for SimpleQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> SimpleQueue<T> {
    pub fn new() -> Self {
        Self::with_options(QueueOptions::default())
    }

    pub fn with_options(options: QueueOptions) -> Self {
        Self { shared: Shared::new(List::with_capacity(options.container_capacity)) }
    }

    /// Adds `item` at the tail.
    pub fn append(&mut self, item: &Item<T>) -> Result<(), QueueError> {
        self.shared.attach(item, |list, container| Ok(list.push_back(container)))?;
        Ok(())
    }

    /// Adds `item` at the head.
    pub fn prepend(&mut self, item: &Item<T>) -> Result<(), QueueError> {
        self.shared.attach(item, |list, container| Ok(list.push_front(container)))?;
        Ok(())
    }

    /// Inserts `item` right before `next`, which must be a member.
    pub fn insert_before(&mut self, item: &Item<T>, next: &Item<T>) -> Result<(), QueueError> {
        let id = self.shared.id();
        let at = self.shared.container_of(next).ok_or(QueueError::NotMember(id))?;
        self.shared.attach(item, |list, container| {
            list.insert_before(at, container).map_err(|_| QueueError::NotMember(id))
        })?;
        Ok(())
    }

    /// Inserts `item` right after `prev`, which must be a member.
    pub fn insert_after(&mut self, item: &Item<T>, prev: &Item<T>) -> Result<(), QueueError> {
        let id = self.shared.id();
        let at = self.shared.container_of(prev).ok_or(QueueError::NotMember(id))?;
        self.shared.attach(item, |list, container| {
            list.insert_after(at, container).map_err(|_| QueueError::NotMember(id))
        })?;
        Ok(())
    }

    pub fn head(&self) -> Option<Item<T>> {
        self.shared.lookup(List::first)
    }

    pub fn tail(&self) -> Option<Item<T>> {
        self.shared.lookup(List::last)
    }

    pub fn remove_head(&mut self) -> Option<Item<T>> {
        self.shared.take(self.shared.with_store(List::first))
    }

    pub fn remove_tail(&mut self) -> Option<Item<T>> {
        self.shared.take(self.shared.with_store(List::last))
    }

    /// Returns the item queued right before `item`.
    pub fn prev_of(&self, item: &Item<T>) -> Option<Item<T>> {
        let id = self.shared.container_of(item)?;
        self.shared.lookup(|list| list.prev(id))
    }

    /// Returns the item queued right after `item`.
    pub fn next_of(&self, item: &Item<T>) -> Option<Item<T>> {
        let id = self.shared.container_of(item)?;
        self.shared.lookup(|list| list.next(id))
    }

    /// Iterates from head to tail.
    pub fn iter(&self) -> SimpleIter<T> {
        self.iter_with(false)
    }

    /// Iterates from tail to head.
    pub fn iter_rev(&self) -> SimpleIter<T> {
        self.iter_with(true)
    }

    fn iter_with(&self, reverse: bool) -> SimpleIter<T> {
        let cursor = self.shared.cursor(|list| Cursor::new(list, reverse));
        SimpleIter::new(self.shared.downgrade(), cursor, reverse)
    }
}

impl<T: 'static> Queue<T> for SimpleQueue<T> {
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

impl<T: 'static> fmt::Debug for SimpleQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.shared, f)
    }
}
