use std::fmt;

use proto_common::{Key, KeyRef};

/// A compact, copyable handle to an entry of one of the containers in this crate.
///
/// Handles stay valid until their entry is removed. A stale handle either resolves to nothing
/// or, once its slot was reused, to a different entry.
pub trait Handle: Copy + Eq + fmt::Debug {
    /// Returns the raw slot index behind the handle.
    fn into_raw(self) -> u32;

    /// Rebuilds a handle from a raw slot index obtained through [`Handle::into_raw`].
    fn from_raw(raw: u32) -> Self;
}

/// An ordered container that can be walked in both directions.
pub trait Sequence {
    /// The handle type of the container's entries.
    type Id: Handle;

    fn first(&self) -> Option<Self::Id>;

    fn last(&self) -> Option<Self::Id>;

    fn next(&self, id: Self::Id) -> Option<Self::Id>;

    fn prev(&self, id: Self::Id) -> Option<Self::Id>;

    /// Returns the first and last entries whose key starts with `prefix`. Unkeyed containers
    /// treat every entry as matching.
    fn prefix_range(&self, prefix: KeyRef<'_>) -> Option<(Self::Id, Self::Id)> {
        let _ = prefix;
        Some((self.first()?, self.last()?))
    }

    /// Returns true if the key of `id` starts with `prefix`.
    fn has_prefix(&self, id: Self::Id, prefix: KeyRef<'_>) -> bool {
        let _ = (id, prefix);
        true
    }
}

/// A position between two entries of a [`Sequence`].
///
/// The cursor does not borrow its container; every movement takes the container as an argument
/// instead. This lets a cursor outlive structural changes, as long as its owner reports removals
/// through [`Cursor::on_remove`] before they happen.
#[derive(Debug, Clone)]
pub struct Cursor<I> {
    prev: Option<I>,
    next: Option<I>,
    prefix: Option<Key>,
}

impl<I: Handle> Cursor<I> {
    /// Creates a cursor before the first entry, or after the last one if `reverse` is set.
    pub fn new<S: Sequence<Id = I>>(seq: &S, reverse: bool) -> Self {
        let mut cursor = Self { prev: None, next: None, prefix: None };
        cursor.reset(seq, reverse);
        cursor
    }

    /// Moves the cursor to the start (or the end, if `reverse` is set) and drops any prefix
    /// restriction.
    pub fn reset<S: Sequence<Id = I>>(&mut self, seq: &S, reverse: bool) {
        self.prefix = None;
        if reverse {
            self.prev = seq.last();
            self.next = None;
        } else {
            self.prev = None;
            self.next = seq.first();
        }
    }

    /// Restricts the cursor to entries whose key starts with `prefix` and moves it to the start
    /// (or end) of that range. An empty prefix matches everything.
    pub fn reset_prefix<S: Sequence<Id = I>>(&mut self, seq: &S, prefix: KeyRef<'_>, reverse: bool) {
        if prefix.is_empty() {
            return self.reset(seq, reverse);
        }

        self.prefix = Some(prefix.to_key());
        self.prev = None;
        self.next = None;
        if let Some((first, last)) = seq.prefix_range(prefix) {
            if reverse {
                self.prev = Some(last);
            } else {
                self.next = Some(first);
            }
        }
    }

    /// Places the cursor between two explicit neighbours and drops any prefix restriction.
    pub fn place(&mut self, prev: Option<I>, next: Option<I>) {
        self.prefix = None;
        self.prev = prev;
        self.next = next;
    }

    /// Positions the cursor so that the next forward step returns `id`.
    pub fn set_cursor<S: Sequence<Id = I>>(&mut self, seq: &S, id: I) {
        self.next = Some(id);
        self.prev = self.admit(seq, seq.prev(id));
    }

    #[inline]
    pub const fn peek_next(&self) -> Option<I> {
        self.next
    }

    #[inline]
    pub const fn peek_prev(&self) -> Option<I> {
        self.prev
    }

    /// Steps forward over the next entry and returns it.
    pub fn next<S: Sequence<Id = I>>(&mut self, seq: &S) -> Option<I> {
        let id = self.next?;
        self.prev = Some(id);
        self.next = self.admit(seq, seq.next(id));
        Some(id)
    }

    /// Steps backward over the previous entry and returns it.
    pub fn prev<S: Sequence<Id = I>>(&mut self, seq: &S) -> Option<I> {
        let id = self.prev?;
        self.next = Some(id);
        self.prev = self.admit(seq, seq.prev(id));
        Some(id)
    }

    /// Moves the cursor's neighbours off `id`, which is about to be removed from `seq`.
    pub fn on_remove<S: Sequence<Id = I>>(&mut self, seq: &S, id: I) {
        if self.next == Some(id) {
            self.next = self.admit(seq, seq.next(id));
        }
        if self.prev == Some(id) {
            self.prev = self.admit(seq, seq.prev(id));
        }
    }

    /// Forgets both neighbours, as after the container was emptied.
    pub fn clear(&mut self) {
        self.prev = None;
        self.next = None;
    }

    fn admit<S: Sequence<Id = I>>(&self, seq: &S, id: Option<I>) -> Option<I> {
        let id = id?;
        match &self.prefix {
            Some(prefix) if !seq.has_prefix(id, prefix.as_key_ref()) => None,
            _ => Some(id),
        }
    }
}
