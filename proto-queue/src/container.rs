use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use proto_tree::{Cursor, Handle, List, Sequence, SortedTrie, Trie};
use tracing::{error, trace, warn};

use crate::{
    item::{ItemCell, Membership},
    Item, QueueError, QueueId,
};

/// A queue's reference to one of its items.
pub struct Container<T> {
    item: Weak<ItemCell<T>>,
}

impl<T> Container<T> {
    fn new(item: &Item<T>) -> Self {
        Self { item: item.downgrade() }
    }

    /// Returns the item, unless it has been dropped.
    pub(crate) fn item(&self) -> Option<Item<T>> {
        self.item.upgrade().map(Item::from_cell)
    }
}

impl<T> fmt::Debug for Container<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container").field("live", &(self.item.strong_count() > 0)).finish()
    }
}

/// The ordered structure behind a queue.
pub trait Backing<T>: Sequence {
    fn len(&self) -> usize;

    fn container(&self, id: Self::Id) -> Option<&Container<T>>;

    fn unlink(&mut self, id: Self::Id) -> Option<Container<T>>;

    fn unlink_all(&mut self) -> Vec<Container<T>>;
}

impl<T> Backing<T> for List<Container<T>> {
    fn len(&self) -> usize {
        Self::len(self)
    }

    fn container(&self, id: Self::Id) -> Option<&Container<T>> {
        self.get(id)
    }

    fn unlink(&mut self, id: Self::Id) -> Option<Container<T>> {
        self.remove(id)
    }

    fn unlink_all(&mut self) -> Vec<Container<T>> {
        self.drain().collect()
    }
}

impl<T> Backing<T> for Trie<Container<T>> {
    fn len(&self) -> usize {
        Self::len(self)
    }

    fn container(&self, id: Self::Id) -> Option<&Container<T>> {
        self.get(id)
    }

    fn unlink(&mut self, id: Self::Id) -> Option<Container<T>> {
        self.remove(id).map(|(_, container)| container)
    }

    fn unlink_all(&mut self) -> Vec<Container<T>> {
        self.drain().map(|(_, container)| container).collect()
    }
}

impl<T> Backing<T> for SortedTrie<Container<T>> {
    fn len(&self) -> usize {
        Self::len(self)
    }

    fn container(&self, id: Self::Id) -> Option<&Container<T>> {
        self.get(id)
    }

    fn unlink(&mut self, id: Self::Id) -> Option<Container<T>> {
        self.remove(id)
    }

    fn unlink_all(&mut self) -> Vec<Container<T>> {
        self.drain().collect()
    }
}

/// Lets an item leave a queue without knowing the queue's type.
pub(crate) trait Detach<T> {
    /// Unlinks the container of the item holding `value`. The item's membership record is the
    /// caller's business.
    fn detach(&self, container: u32, value: &T);
}

pub(crate) type SharedCursor<I> = Rc<RefCell<Cursor<I>>>;

/// Called with the value of every item leaving a queue.
pub(crate) type DetachHook<T> = Rc<dyn Fn(&T)>;

/// The state of one queue: its backing structure and the cursors of its live iterators.
pub(crate) struct Core<T, B: Backing<T>> {
    id: QueueId,
    pub(crate) store: B,
    cursors: Vec<Weak<RefCell<Cursor<B::Id>>>>,
    on_detach: Option<DetachHook<T>>,
}

impl<T, B: Backing<T>> Core<T, B> {
    #[inline]
    pub(crate) const fn id(&self) -> QueueId {
        self.id
    }

    /// Unlinks a container, first moving any iterator positioned on it.
    pub(crate) fn unlink(&mut self, id: B::Id) -> Option<Container<T>> {
        let Self { store, cursors, .. } = self;
        cursors.retain(|cursor| match cursor.upgrade() {
            Some(cursor) => {
                cursor.borrow_mut().on_remove(&*store, id);
                true
            }
            None => false,
        });
        store.unlink(id)
    }

    pub(crate) fn unlink_all(&mut self) -> Vec<Container<T>> {
        self.cursors.retain(|cursor| match cursor.upgrade() {
            Some(cursor) => {
                cursor.borrow_mut().clear();
                true
            }
            None => false,
        });
        self.store.unlink_all()
    }

    pub(crate) fn register(&mut self, cursor: &SharedCursor<B::Id>) {
        self.cursors.retain(|cursor| cursor.strong_count() > 0);
        self.cursors.push(Rc::downgrade(cursor));
    }

    #[inline]
    pub(crate) fn hook(&self) -> Option<DetachHook<T>> {
        self.on_detach.clone()
    }

    #[inline]
    pub(crate) fn resolve(&self, id: Option<B::Id>) -> Option<Item<T>> {
        self.store.container(id?)?.item()
    }
}

impl<T, B: Backing<T>> Drop for Core<T, B> {
    fn drop(&mut self) {
        for container in self.store.unlink_all() {
            if let Some(item) = container.item() {
                item.cell().unregister(self.id);
            }
        }
    }
}

impl<T: 'static, B: Backing<T> + 'static> Detach<T> for RefCell<Core<T, B>> {
    fn detach(&self, container: u32, value: &T) {
        let hook = match self.try_borrow_mut() {
            Ok(mut core) => {
                if core.unlink(B::Id::from_raw(container)).is_none() {
                    warn!(queue = %core.id(), container, "Detached container was not linked");
                    return;
                }
                core.hook()
            }
            Err(_) => {
                error!(container, "Queue is busy, container left linked");
                return;
            }
        };
        // The core is released first, so the hook may look at the queue.
        if let Some(hook) = hook {
            hook(value);
        }
    }
}

/// The handle a queue keeps to its core.
pub(crate) struct Shared<T: 'static, B: Backing<T> + 'static> {
    id: QueueId,
    core: Rc<RefCell<Core<T, B>>>,
}

impl<T: 'static, B: Backing<T> + 'static> Shared<T, B> {
    pub(crate) fn new(store: B) -> Self {
        let id = QueueId::next();
        let core = Core { id, store, cursors: Vec::new(), on_detach: None };
        Self { id, core: Rc::new(RefCell::new(core)) }
    }

    #[inline]
    pub(crate) const fn id(&self) -> QueueId {
        self.id
    }

    pub(crate) fn len(&self) -> usize {
        self.core.borrow().store.len()
    }

    /// Sets the hook run for every item that leaves the queue, by any route but the queue's
    /// own drop.
    pub(crate) fn set_on_detach(&self, hook: DetachHook<T>) {
        self.core.borrow_mut().on_detach = Some(hook);
    }

    fn notify(&self, item: &Item<T>) {
        let hook = self.core.borrow().hook();
        if let Some(hook) = hook {
            hook(item.get());
        }
    }

    pub(crate) fn contains(&self, item: &Item<T>) -> bool {
        item.cell().container(self.id).is_some()
    }

    /// Links a new container for `item` through `link` and records the membership. Nothing is
    /// recorded if `link` fails.
    pub(crate) fn attach(
        &self,
        item: &Item<T>,
        link: impl FnOnce(&mut B, Container<T>) -> Result<B::Id, QueueError>,
    ) -> Result<B::Id, QueueError> {
        if self.contains(item) {
            warn!(queue = %self.id, "Item is already a member");
            return Err(QueueError::AlreadyMember(self.id));
        }

        let id = link(&mut self.core.borrow_mut().store, Container::new(item))?;
        let queue: Weak<dyn Detach<T>> = Rc::downgrade(&self.core) as Weak<dyn Detach<T>>;
        item.cell().register(self.id, Membership { queue, container: id.into_raw() });
        trace!(queue = %self.id, ?id, "Item attached");
        Ok(id)
    }

    /// Returns the handle of `item`'s container in this queue.
    pub(crate) fn container_of(&self, item: &Item<T>) -> Option<B::Id> {
        item.cell().container(self.id).map(B::Id::from_raw)
    }

    pub(crate) fn detach(&self, item: &Item<T>) -> bool {
        match item.cell().unregister(self.id) {
            Some(container) => {
                let unlinked = self.core.borrow_mut().unlink(B::Id::from_raw(container));
                debug_assert!(unlinked.is_some(), "membership without a container");
                trace!(queue = %self.id, container, "Item detached");
                self.notify(item);
                true
            }
            None => false,
        }
    }

    /// Detaches whatever item sits at `id` and returns it.
    pub(crate) fn take(&self, id: Option<B::Id>) -> Option<Item<T>> {
        let container = self.core.borrow_mut().unlink(id?)?;
        let item = container.item()?;
        item.cell().unregister(self.id);
        self.notify(&item);
        Some(item)
    }

    /// Resolves the entry picked by `find` to its item.
    pub(crate) fn lookup(&self, find: impl FnOnce(&B) -> Option<B::Id>) -> Option<Item<T>> {
        let core = self.core.borrow();
        core.resolve(find(&core.store))
    }

    pub(crate) fn with_store<R>(&self, f: impl FnOnce(&B) -> R) -> R {
        f(&self.core.borrow().store)
    }

    /// Detaches every item and returns the ones still alive.
    pub(crate) fn empty(&self) -> Vec<Item<T>> {
        let containers = self.core.borrow_mut().unlink_all();
        let items: Vec<_> = containers.iter().filter_map(Container::item).collect();
        for item in &items {
            item.cell().unregister(self.id);
            self.notify(item);
        }
        items
    }

    pub(crate) fn destroy(&self) {
        for item in self.empty() {
            item.detach_all();
        }
    }

    /// Creates a cursor placed by `place` and registers it with the core.
    pub(crate) fn cursor(&self, place: impl FnOnce(&B) -> Cursor<B::Id>) -> SharedCursor<B::Id> {
        let mut core = self.core.borrow_mut();
        let cursor = Rc::new(RefCell::new(place(&core.store)));
        core.register(&cursor);
        cursor
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<Core<T, B>>> {
        Rc::downgrade(&self.core)
    }
}

impl<T: 'static, B: Backing<T> + 'static> fmt::Debug for Shared<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue").field("id", &self.id).field("len", &self.len()).finish()
    }
}
