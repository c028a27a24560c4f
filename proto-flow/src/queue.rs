use std::{
    cell::{Ref, RefCell},
    fmt,
    rc::Rc,
};

use proto_common::{Key, KeyRef};
use proto_queue::{IndexedIter, IndexedQueue, Item, KeyProvider, Queue, QueueError, QueueId, QueueOptions};
use tracing::error;

use crate::{Description, Fields, FlowError, FlowSource, MaskLengthList, MatchIter, TableOptions};

/// A value that carries the flow description it is classified under.
pub trait FlowEntry {
    fn description(&self) -> &Description;
}

impl FlowEntry for Description {
    fn description(&self) -> &Description {
        self
    }
}

/// Indexes entries by their description key.
#[derive(Debug, Clone, Copy, Default)]
struct FlowKeys;

impl<T: FlowEntry> KeyProvider<T> for FlowKeys {
    fn key(&self, item: &T) -> Key {
        item.description().to_key()
    }
}

/// A flow table over shared [`Item`]s.
///
/// Unlike [`FlowTable`](crate::FlowTable), the table does not own its entries: an entry can be
/// a member of other queues at the same time, and dropping its last handle removes it from the
/// table. The mask lengths follow every entry out, however it leaves.
pub struct FlowQueue<T: 'static> {
    queue: IndexedQueue<T, FlowKeys>,
    masks: Rc<RefCell<MaskLengthList>>,
    options: TableOptions,
}

impl<T: FlowEntry + 'static> Default for FlowQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FlowEntry + 'static> FlowQueue<T> {
    pub fn new() -> Self {
        Self::with_options(TableOptions::default())
    }

    pub fn with_options(options: TableOptions) -> Self {
        let mut queue =
            IndexedQueue::with_options(FlowKeys, QueueOptions::default().container_capacity(options.capacity));
        let masks = Rc::new(RefCell::new(MaskLengthList::new()));
        let departed = Rc::clone(&masks);
        queue.on_detach(move |entry: &T| {
            departed.borrow_mut().remove(entry.description().prefix_size());
        });
        Self { queue, masks, options }
    }

    #[inline]
    pub const fn options(&self) -> &TableOptions {
        &self.options
    }

    /// The prefix lengths of the entries, with their counts.
    pub fn mask_lengths(&self) -> Ref<'_, MaskLengthList> {
        self.masks.borrow()
    }

    /// Inserts `item` under its description.
    pub fn insert(&mut self, item: &Item<T>) -> Result<(), FlowError> {
        let description = item.description();
        if !description.is_valid() {
            error!("Cannot insert a flow without a key");
            return Err(FlowError::InvalidDescription);
        }

        self.queue.insert(item).map_err(|e| match e {
            QueueError::DuplicateKey(_) => FlowError::DuplicateFlow,
            e => FlowError::Queue(e),
        })?;
        self.masks.borrow_mut().insert(description.prefix_size());
        Ok(())
    }

    /// Returns the entry with exactly `description`.
    pub fn find(&self, description: &Description) -> Option<Item<T>> {
        self.queue.find(description.key())
    }

    pub fn iter(&self) -> IndexedIter<T> {
        self.queue.iter()
    }

    /// Iterates over the entries matching `query` on all fields, using the table's
    /// bidirectional matching option.
    pub fn matches(&self, query: &Description) -> MatchIter<&Self> {
        self.matches_with(query, Fields::ALL, self.options.bimatch)
    }

    /// Iterates over the entries matching the `fields` of `query`.
    pub fn matches_with(&self, query: &Description, fields: Fields, bimatch: bool) -> MatchIter<&Self> {
        MatchIter::new(self, query, fields, bimatch)
    }

    /// Returns the entry best matching `query`, searching as deep as the table's options say.
    pub fn lookup(&self, query: &Description) -> Option<Item<T>> {
        self.best_match(query, self.options.deep_search)
    }

    /// Returns the entry best matching `query`. See [`MatchIter::best_match`].
    pub fn best_match(&self, query: &Description, deep_search: bool) -> Option<Item<T>> {
        MatchIter::new(self, query, Fields::ALL, true).best_match(deep_search)
    }
}

impl<T: FlowEntry + 'static> Queue<T> for FlowQueue<T> {
    fn id(&self) -> QueueId {
        self.queue.id()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn contains(&self, item: &Item<T>) -> bool {
        self.queue.contains(item)
    }

    fn remove(&mut self, item: &Item<T>) -> bool {
        self.queue.remove(item)
    }

    fn empty(&mut self) {
        self.queue.empty();
    }

    fn destroy(&mut self) {
        self.queue.destroy();
    }
}

impl<'a, T: FlowEntry + 'static> FlowSource for &'a FlowQueue<T> {
    type Entry = Item<T>;
    type Iter = IndexedIter<T>;

    fn next_mask_below(&self, length: u16) -> Option<u16> {
        self.masks.borrow().next_below(length)
    }

    fn iter_prefix(&self, prefix: KeyRef<'_>) -> IndexedIter<T> {
        self.queue.iter_prefix(prefix, false)
    }

    fn description(entry: &Item<T>) -> &Description {
        entry.get().description()
    }
}

impl<T: 'static> fmt::Debug for FlowQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowQueue")
            .field("queue", &self.queue)
            .field("masks", &*self.masks.borrow())
            .field("options", &self.options)
            .finish()
    }
}
