use std::fmt;

use proto_common::{KeyOrder, KeyRef};
use proto_tree::{trie, EntryId, Trie};
use tracing::{debug, error, warn};

use crate::{Description, Fields, FlowError, FlowSource, MaskLengthList, MatchIter};

/// Handle to an entry of a [`FlowTable`].
pub type FlowId = EntryId;

#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Number of entries to allocate up front.
    pub(crate) capacity: usize,
    /// Whether [`FlowTable::lookup`] keeps searching shorter destination prefixes after a match.
    pub(crate) deep_search: bool,
    /// Whether [`FlowTable::matches`] lets wildcards in the entries match.
    pub(crate) bimatch: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self { capacity: 0, deep_search: false, bimatch: true }
    }
}

impl TableOptions {
    /// Sets the number of entries allocated up front.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets whether lookups keep going after the longest matching destination prefix, so that
    /// a more specific source under a shorter destination prefix can win.
    pub fn deep_search(mut self, deep_search: bool) -> Self {
        self.deep_search = deep_search;
        self
    }

    /// Sets whether matches treat wildcards in the stored entries as matching any query value.
    pub fn bimatch(mut self, bimatch: bool) -> Self {
        self.bimatch = bimatch;
        self
    }
}

/// A failed insertion, handing back what was to be inserted.
pub struct Rejected<V> {
    pub error: FlowError,
    pub description: Description,
    pub value: V,
}

impl<V> fmt::Debug for Rejected<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<V> fmt::Display for Rejected<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rejected flow {}: {}", self.description, self.error)
    }
}

impl<V> std::error::Error for Rejected<V> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// A flow table owning its entries: each a [`Description`] with an associated value.
///
/// Entries are indexed by their description key, so no two entries can have an identical
/// description. The table keeps count of the prefix lengths in use to drive
/// bidirectional matching.
pub struct FlowTable<V> {
    entries: Trie<(Description, V)>,
    masks: MaskLengthList,
    options: TableOptions,
}

impl<V> Default for FlowTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FlowTable<V> {
    pub fn new() -> Self {
        Self::with_options(TableOptions::default())
    }

    pub fn with_options(options: TableOptions) -> Self {
        Self {
            entries: Trie::with_capacity(options.capacity, KeyOrder::unsigned()),
            masks: MaskLengthList::new(),
            options,
        }
    }

    #[inline]
    pub const fn options(&self) -> &TableOptions {
        &self.options
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The prefix lengths of the entries, with their counts.
    #[inline]
    pub const fn mask_lengths(&self) -> &MaskLengthList {
        &self.masks
    }

    /// Inserts an entry. Fails, handing the value back, if the description has no key or an
    /// entry with the same description exists.
    pub fn insert(&mut self, description: Description, value: V) -> Result<FlowId, Rejected<V>> {
        if !description.is_valid() {
            error!("Cannot insert a flow without a key");
            return Err(Rejected { error: FlowError::InvalidDescription, description, value });
        }

        let prefix_size = description.prefix_size();
        match self.entries.insert(description.to_key(), (description, value)) {
            Ok(id) => {
                self.masks.insert(prefix_size);
                debug!(?id, prefix_size, "Inserted flow");
                Ok(id)
            }
            Err(occupied) => {
                let (description, value) = occupied.value;
                warn!(flow = %description, "Duplicate flow");
                Err(Rejected { error: FlowError::DuplicateFlow, description, value })
            }
        }
    }

    /// Removes the entry `id`, returning its description and value.
    pub fn remove(&mut self, id: FlowId) -> Option<(Description, V)> {
        let (_, (description, value)) = self.entries.remove(id)?;
        self.masks.remove(description.prefix_size());
        debug!(?id, flow = %description, "Removed flow");
        Some((description, value))
    }

    /// Removes the entry with exactly `description`.
    pub fn remove_flow(&mut self, description: &Description) -> Option<(Description, V)> {
        let id = self.find(description)?;
        self.remove(id)
    }

    /// Returns the entry with exactly `description`.
    pub fn find(&self, description: &Description) -> Option<FlowId> {
        self.entries.find(description.key())
    }

    pub fn get(&self, id: FlowId) -> Option<(&Description, &V)> {
        self.entries.get(id).map(|(description, value)| (description, value))
    }

    pub fn get_mut(&mut self, id: FlowId) -> Option<&mut V> {
        self.entries.get_mut(id).map(|(_, value)| value)
    }

    /// Iterates over all entries in key order.
    pub fn iter(&self) -> TableIter<'_, V> {
        TableIter { inner: self.entries.iter() }
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
    pub fn lookup(&self, query: &Description) -> Option<(FlowId, &Description, &V)> {
        self.best_match(query, self.options.deep_search)
    }

    /// Returns the entry best matching `query`. See [`MatchIter::best_match`].
    pub fn best_match(&self, query: &Description, deep_search: bool) -> Option<(FlowId, &Description, &V)> {
        MatchIter::new(self, query, Fields::ALL, true).best_match(deep_search)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.masks.clear();
    }
}

impl<V> fmt::Debug for FlowTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowTable")
            .field("len", &self.len())
            .field("masks", &self.masks)
            .field("options", &self.options)
            .finish()
    }
}

impl<'a, V> IntoIterator for &'a FlowTable<V> {
    type Item = (FlowId, &'a Description, &'a V);
    type IntoIter = TableIter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, V> FlowSource for &'a FlowTable<V> {
    type Entry = (FlowId, &'a Description, &'a V);
    type Iter = TableIter<'a, V>;

    fn next_mask_below(&self, length: u16) -> Option<u16> {
        self.masks.next_below(length)
    }

    fn iter_prefix(&self, prefix: KeyRef<'_>) -> TableIter<'a, V> {
        let table: &'a FlowTable<V> = *self;
        TableIter { inner: table.entries.iter_prefix(prefix) }
    }

    fn description(entry: &Self::Entry) -> &Description {
        entry.1
    }
}

/// Iterator over the entries of a [`FlowTable`] in key order.
#[derive(Debug)]
pub struct TableIter<'a, V> {
    inner: trie::Iter<'a, (Description, V)>,
}

impl<'a, V> Iterator for TableIter<'a, V> {
    type Item = (FlowId, &'a Description, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(id, _, (description, value))| (id, description, value))
    }
}

impl<V> DoubleEndedIterator for TableIter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(id, _, (description, value))| (id, description, value))
    }
}
