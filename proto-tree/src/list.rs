use crate::{slab::Slab, Handle, Sequence};

/// Handle to an entry of a [`List`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListId(u32);

impl Handle for ListId {
    #[inline]
    fn into_raw(self) -> u32 {
        self.0
    }

    #[inline]
    fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

#[derive(Debug)]
struct Link<V> {
    value: V,
    prev: Option<u32>,
    next: Option<u32>,
}

/// A doubly linked list whose links live in a recycled arena.
#[derive(Debug)]
pub struct List<V> {
    links: Slab<Link<V>>,
    head: Option<u32>,
    tail: Option<u32>,
}

impl<V> Default for List<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> List<V> {
    pub const fn new() -> Self {
        Self { links: Slab::new(), head: None, tail: None }
    }

    /// Creates a list with room for `capacity` entries before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { links: Slab::with_capacity(capacity), head: None, tail: None }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.links.len()
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.links.len() == 0
    }

    pub fn push_back(&mut self, value: V) -> ListId {
        ListId(self.link(value, self.tail, None))
    }

    pub fn push_front(&mut self, value: V) -> ListId {
        ListId(self.link(value, None, self.head))
    }

    /// Inserts `value` right before `at`. Hands the value back if `at` is not in the list.
    pub fn insert_before(&mut self, at: ListId, value: V) -> Result<ListId, V> {
        match self.links.get(at.0) {
            Some(link) => {
                let prev = link.prev;
                Ok(ListId(self.link(value, prev, Some(at.0))))
            }
            None => Err(value),
        }
    }

    /// Inserts `value` right after `at`. Hands the value back if `at` is not in the list.
    pub fn insert_after(&mut self, at: ListId, value: V) -> Result<ListId, V> {
        match self.links.get(at.0) {
            Some(link) => {
                let next = link.next;
                Ok(ListId(self.link(value, Some(at.0), next)))
            }
            None => Err(value),
        }
    }

    fn link(&mut self, value: V, prev: Option<u32>, next: Option<u32>) -> u32 {
        let index = self.links.insert(Link { value, prev, next });
        match prev.and_then(|p| self.links.get_mut(p)) {
            Some(link) => link.next = Some(index),
            None => self.head = Some(index),
        }
        match next.and_then(|n| self.links.get_mut(n)) {
            Some(link) => link.prev = Some(index),
            None => self.tail = Some(index),
        }
        index
    }

    pub fn remove(&mut self, id: ListId) -> Option<V> {
        let link = self.links.remove(id.0)?;
        match link.prev.and_then(|p| self.links.get_mut(p)) {
            Some(prev) => prev.next = link.next,
            None => self.head = link.next,
        }
        match link.next.and_then(|n| self.links.get_mut(n)) {
            Some(next) => next.prev = link.prev,
            None => self.tail = link.prev,
        }
        Some(link.value)
    }

    pub fn pop_front(&mut self) -> Option<V> {
        self.remove(ListId(self.head?))
    }

    pub fn pop_back(&mut self) -> Option<V> {
        self.remove(ListId(self.tail?))
    }

    #[inline]
    pub fn get(&self, id: ListId) -> Option<&V> {
        self.links.get(id.0).map(|link| &link.value)
    }

    #[inline]
    pub fn get_mut(&mut self, id: ListId) -> Option<&mut V> {
        self.links.get_mut(id.0).map(|link| &mut link.value)
    }

    #[inline]
    pub fn contains(&self, id: ListId) -> bool {
        self.links.get(id.0).is_some()
    }

    pub fn first(&self) -> Option<ListId> {
        self.head.map(ListId)
    }

    pub fn last(&self) -> Option<ListId> {
        self.tail.map(ListId)
    }

    pub fn next(&self, id: ListId) -> Option<ListId> {
        self.links.get(id.0)?.next.map(ListId)
    }

    pub fn prev(&self, id: ListId) -> Option<ListId> {
        self.links.get(id.0)?.prev.map(ListId)
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter { list: self, front: self.head, back: self.tail }
    }

    pub fn clear(&mut self) {
        self.links.clear();
        self.head = None;
        self.tail = None;
    }

    /// Removes every value, in no particular order.
    pub fn drain(&mut self) -> impl Iterator<Item = V> {
        self.head = None;
        self.tail = None;
        self.links.drain().map(|link| link.value)
    }
}

impl<V> Sequence for List<V> {
    type Id = ListId;

    fn first(&self) -> Option<ListId> {
        Self::first(self)
    }

    fn last(&self) -> Option<ListId> {
        Self::last(self)
    }

    fn next(&self, id: ListId) -> Option<ListId> {
        Self::next(self, id)
    }

    fn prev(&self, id: ListId) -> Option<ListId> {
        Self::prev(self, id)
    }
}

/// Iterator over the entries of a [`List`], front to back.
#[derive(Debug)]
pub struct Iter<'a, V> {
    list: &'a List<V>,
    front: Option<u32>,
    back: Option<u32>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (ListId, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.front?;
        let link = self.list.links.get(index)?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = link.next;
        }
        Some((ListId(index), &link.value))
    }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let index = self.back?;
        let link = self.list.links.get(index)?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.back = link.prev;
        }
        Some((ListId(index), &link.value))
    }
}

impl<'a, V> IntoIterator for &'a List<V> {
    type Item = (ListId, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
