use std::{
    cell::RefCell,
    fmt, mem,
    ops::Deref,
    rc::{Rc, Weak},
};

use rustc_hash::FxHashMap;

use crate::{container::Detach, Queue, QueueId};

/// Where an item sits in one queue.
pub(crate) struct Membership<T> {
    pub(crate) queue: Weak<dyn Detach<T>>,
    pub(crate) container: u32,
}

pub(crate) struct ItemCell<T> {
    /// One entry per queue the item is a member of.
    memberships: RefCell<FxHashMap<QueueId, Membership<T>>>,
    value: T,
}

impl<T> ItemCell<T> {
    #[inline]
    pub(crate) fn container(&self, queue: QueueId) -> Option<u32> {
        self.memberships.borrow().get(&queue).map(|membership| membership.container)
    }

    pub(crate) fn register(&self, queue: QueueId, membership: Membership<T>) {
        let previous = self.memberships.borrow_mut().insert(queue, membership);
        debug_assert!(previous.is_none(), "item registered twice in queue {queue}");
    }

    pub(crate) fn unregister(&self, queue: QueueId) -> Option<u32> {
        self.memberships.borrow_mut().remove(&queue).map(|membership| membership.container)
    }

    fn detach_from(memberships: FxHashMap<QueueId, Membership<T>>, value: &T) {
        for (_, membership) in memberships {
            if let Some(queue) = membership.queue.upgrade() {
                queue.detach(membership.container, value);
            }
        }
    }
}

impl<T> Drop for ItemCell<T> {
    fn drop(&mut self) {
        // Leave every queue before the value goes away.
        let memberships = mem::take(self.memberships.get_mut());
        Self::detach_from(memberships, &self.value);
    }
}

/// A shared handle to a value that can be queued.
///
/// Cloning the handle does not clone the value. The value lives until the last handle is
/// dropped, at which point it leaves every queue it is still a member of.
pub struct Item<T>(Rc<ItemCell<T>>);

impl<T> Item<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(ItemCell { memberships: RefCell::new(FxHashMap::default()), value }))
    }

    pub(crate) const fn from_cell(cell: Rc<ItemCell<T>>) -> Self {
        Self(cell)
    }

    #[inline]
    pub(crate) fn cell(&self) -> &ItemCell<T> {
        &self.0
    }

    #[inline]
    pub(crate) fn downgrade(&self) -> Weak<ItemCell<T>> {
        Rc::downgrade(&self.0)
    }

    #[inline]
    pub fn get(&self) -> &T {
        &self.0.value
    }

    /// Number of queues the item is a member of.
    pub fn queue_count(&self) -> usize {
        self.0.memberships.borrow().len()
    }

    pub fn is_queued(&self) -> bool {
        !self.0.memberships.borrow().is_empty()
    }

    /// Returns true if the item is a member of `queue`.
    pub fn is_in<Q: Queue<T> + ?Sized>(&self, queue: &Q) -> bool {
        self.0.container(queue.id()).is_some()
    }

    /// Returns true if the item is a member of any queue other than `queue`.
    pub fn is_in_other_queue<Q: Queue<T> + ?Sized>(&self, queue: &Q) -> bool {
        let memberships = self.0.memberships.borrow();
        memberships.len() > usize::from(memberships.contains_key(&queue.id()))
    }

    /// Removes the item from every queue it is a member of.
    pub fn detach_all(&self) {
        let memberships = mem::take(&mut *self.0.memberships.borrow_mut());
        ItemCell::detach_from(memberships, &self.0.value);
    }

    /// Returns true if both handles refer to the same item.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.0, &other.0)
    }
}

impl<T> Clone for Item<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> Deref for Item<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.get()
    }
}

impl<T: fmt::Debug> fmt::Debug for Item<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item").field("value", self.get()).field("queues", &self.queue_count()).finish()
    }
}
