//! Queues over shared, reference-counted items.
//!
//! An [`Item`] can be a member of any number of queues at the same time, of any kind:
//!
//! - [`SimpleQueue`]: insertion-ordered, like a linked list.
//! - [`IndexedQueue`]: ordered by a unique key, with exact, closest and longest-prefix lookup.
//! - [`SortedQueue`]: ordered by a key that may repeat; equal keys keep their insertion order.
//!
//! Queues only hold weak references. Dropping the last handle to an item removes it from every
//! queue it belongs to, and dropping a queue releases all of its memberships.
//!
//! ```
//! use proto_queue::{IndexedQueue, Item, Key, KeyFn, Queue, SimpleQueue};
//!
//! let mut fifo = SimpleQueue::new();
//! let mut index = IndexedQueue::new(KeyFn::new(|name: &String| Key::from(name.as_str())));
//!
//! let item = Item::new(String::from("eth0"));
//! fifo.append(&item).unwrap();
//! index.insert(&item).unwrap();
//! assert!(index.find("eth0").is_some());
//!
//! drop(item);
//! assert!(fifo.is_empty() && index.is_empty());
//! ```

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use thiserror::Error;

pub use proto_common::{Endian, Key, KeyOrder, KeyRef};

mod container;
pub use container::{Backing, Container};

mod item;
pub use item::Item;

mod indexed;
pub use indexed::IndexedQueue;

mod iter;
pub use iter::{IndexedIter, Iter, SimpleIter, SortedIter};

mod key;
pub use key::{KeyFn, KeyProvider};

mod simple;
pub use simple::SimpleQueue;

mod sorted;
pub use sorted::SortedQueue;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Item is already a member of queue {0}")]
    AlreadyMember(QueueId),
    #[error("An item with an equivalent key is already in queue {0}")]
    DuplicateKey(QueueId),
    #[error("Reference item is not a member of queue {0}")]
    NotMember(QueueId),
}

/// Process-wide unique identity of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueId(u64);

impl QueueId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Options shared by all queue kinds.
#[derive(Debug, Clone, Default)]
pub struct QueueOptions {
    /// Number of containers to allocate up front.
    container_capacity: usize,
}

impl QueueOptions {
    /// Sets the number of containers allocated up front. Containers released by removals are
    /// always recycled, so this only avoids growth while the queue fills up.
    pub fn container_capacity(mut self, container_capacity: usize) -> Self {
        self.container_capacity = container_capacity;
        self
    }
}

/// Operations common to every queue kind.
pub trait Queue<T> {
    fn id(&self) -> QueueId;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `item` is currently a member of this queue.
    fn contains(&self, item: &Item<T>) -> bool;

    /// Removes `item` from this queue. Returns false, and does nothing, if it was not a member.
    fn remove(&mut self, item: &Item<T>) -> bool;

    /// Removes every item from this queue. The items themselves are left untouched.
    fn empty(&mut self);

    /// Removes every item from this queue and retires it: each item also leaves every other
    /// queue it belongs to.
    fn destroy(&mut self);
}
