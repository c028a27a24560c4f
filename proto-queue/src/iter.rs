use std::{
    cell::RefCell,
    fmt,
    rc::Weak,
};

use proto_common::KeyRef;
use proto_tree::{Cursor, Handle, List, SortedTrie, Trie};

use crate::{
    container::{Backing, Container, Core, SharedCursor},
    Item,
};

/// Iterator over a [`SimpleQueue`](crate::SimpleQueue).
pub type SimpleIter<T> = Iter<T, List<Container<T>>>;
/// Iterator over an [`IndexedQueue`](crate::IndexedQueue).
pub type IndexedIter<T> = Iter<T, Trie<Container<T>>>;
/// Iterator over a [`SortedQueue`](crate::SortedQueue).
pub type SortedIter<T> = Iter<T, SortedTrie<Container<T>>>;

/// A cursor over the items of a queue.
///
/// The iterator does not borrow its queue, so the queue can be modified while iterating. Items
/// removed from the queue, including the one at the cursor, are skipped over; items added
/// behind the cursor are not seen. Once the queue is dropped the iterator yields nothing.
///
/// As an [`Iterator`], it walks in the direction it was created with. [`Iter::next_item`] and
/// [`Iter::prev_item`] move explicitly and can be mixed freely.
pub struct Iter<T: 'static, B: Backing<T> + 'static> {
    core: Weak<RefCell<Core<T, B>>>,
    cursor: SharedCursor<B::Id>,
    reverse: bool,
}

impl<T: 'static, B: Backing<T> + 'static> Iter<T, B> {
    pub(crate) const fn new(core: Weak<RefCell<Core<T, B>>>, cursor: SharedCursor<B::Id>, reverse: bool) -> Self {
        Self { core, cursor, reverse }
    }

    fn step(&mut self, forward: bool) -> Option<Item<T>> {
        let core = self.core.upgrade()?;
        let core = core.borrow();
        let mut cursor = self.cursor.borrow_mut();
        loop {
            let id = if forward { cursor.next(&core.store) } else { cursor.prev(&core.store) }?;
            if let Some(item) = core.resolve(Some(id)) {
                return Some(item);
            }
        }
    }

    fn peek(&self, id: Option<B::Id>) -> Option<Item<T>> {
        self.core.upgrade()?.borrow().resolve(id)
    }

    /// Moves forward and returns the item passed over.
    pub fn next_item(&mut self) -> Option<Item<T>> {
        self.step(true)
    }

    /// Moves backward and returns the item passed over.
    pub fn prev_item(&mut self) -> Option<Item<T>> {
        self.step(false)
    }

    /// Returns the item [`Iter::next_item`] would return, without moving.
    pub fn peek_next(&self) -> Option<Item<T>> {
        self.peek(self.cursor.borrow().peek_next())
    }

    /// Returns the item [`Iter::prev_item`] would return, without moving.
    pub fn peek_prev(&self) -> Option<Item<T>> {
        self.peek(self.cursor.borrow().peek_prev())
    }

    /// Moves the cursor back to the start of the queue, or to its end when `reverse` is set, and
    /// makes that the iteration direction.
    pub fn reset(&mut self, reverse: bool) {
        self.reverse = reverse;
        if let Some(core) = self.core.upgrade() {
            self.cursor.borrow_mut().reset(&core.borrow().store, reverse);
        }
    }

    /// Positions the cursor so that the next forward step returns `item`. Returns false if the
    /// item is not in this queue.
    pub fn set_cursor(&mut self, item: &Item<T>) -> bool {
        let Some(core) = self.core.upgrade() else {
            return false;
        };
        let core = core.borrow();
        match item.cell().container(core.id()) {
            Some(container) => {
                self.cursor.borrow_mut().set_cursor(&core.store, B::Id::from_raw(container));
                true
            }
            None => false,
        }
    }

    #[inline]
    pub const fn is_reversed(&self) -> bool {
        self.reverse
    }

    fn place(&mut self, reverse: bool, place: impl FnOnce(&B, &mut Cursor<B::Id>)) {
        self.reverse = reverse;
        if let Some(core) = self.core.upgrade() {
            place(&core.borrow().store, &mut *self.cursor.borrow_mut());
        }
    }
}

impl<T: 'static> Iter<T, Trie<Container<T>>> {
    /// Restricts iteration to items whose key starts with `prefix` and moves to the start (or
    /// end) of that range.
    pub fn reset_prefix<'k>(&mut self, prefix: impl Into<KeyRef<'k>>, reverse: bool) {
        let prefix = prefix.into();
        self.place(reverse, |trie, cursor| cursor.reset_prefix(trie, prefix, reverse));
    }
}

impl<T: 'static> Iter<T, SortedTrie<Container<T>>> {
    /// Restricts iteration to items whose key starts with `prefix` and moves to the start (or
    /// end) of that range.
    pub fn reset_prefix<'k>(&mut self, prefix: impl Into<KeyRef<'k>>, reverse: bool) {
        let prefix = prefix.into();
        self.place(reverse, |trie, cursor| cursor.reset_prefix(trie, prefix, reverse));
    }

    /// Moves the cursor to the first item whose key is not smaller than `key`. When `reverse` is
    /// set, it moves behind the last item whose key is not greater than `key` instead.
    pub fn reset_from<'k>(&mut self, key: impl Into<KeyRef<'k>>, reverse: bool) {
        let key = key.into();
        self.place(reverse, |trie, cursor| {
            if reverse {
                let prev = trie.floor(key);
                let next = match prev {
                    Some(prev) => trie.next(prev),
                    None => trie.first(),
                };
                cursor.place(prev, next);
            } else {
                let next = trie.lower_bound(key);
                let prev = match next {
                    Some(next) => trie.prev(next),
                    None => trie.last(),
                };
                cursor.place(prev, next);
            }
        });
    }
}

impl<T: 'static, B: Backing<T> + 'static> Iterator for Iter<T, B> {
    type Item = Item<T>;

    fn next(&mut self) -> Option<Item<T>> {
        self.step(!self.reverse)
    }
}

impl<T: 'static, B: Backing<T> + 'static> fmt::Debug for Iter<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("cursor", &self.cursor.borrow()).field("reverse", &self.reverse).finish()
    }
}
