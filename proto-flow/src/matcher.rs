use std::fmt;

use proto_common::{Key, KeyRef};
use tracing::trace;

use crate::{Description, Fields, CLASS_ANY, PROTOCOL_ANY};

/// A store of flow entries that can be matched against.
///
/// Implemented by shared references to the flow tables of this crate.
pub trait FlowSource: Copy {
    /// What a match yields.
    type Entry;
    /// Iterator over the entries whose key starts with a prefix, in key order.
    type Iter: Iterator<Item = Self::Entry>;

    /// The longest prefix length in use that is strictly shorter than `length`.
    fn next_mask_below(&self, length: u16) -> Option<u16>;

    fn iter_prefix(&self, prefix: KeyRef<'_>) -> Self::Iter;

    fn description(entry: &Self::Entry) -> &Description;
}

/// Where a match is in its walk down the mask lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Entries under the full query prefix, with a prefix at least that long.
    Specific,
    /// Entries whose prefix is exactly this long.
    Exact(u16),
    Done,
}

/// The query side of a match.
#[derive(Debug, Clone)]
struct Query {
    key: Key,
    prefix_size: u16,
    /// Source bytes and mask, when the source takes part in the match.
    src: Option<(Vec<u8>, u8)>,
    class: u8,
    protocol: u8,
    bimatch: bool,
}

impl Query {
    fn new(description: &Description, fields: Fields, bimatch: bool) -> Self {
        let query = description.select(fields);
        let src = query.fields();
        let src = (!src.src.is_empty()).then(|| (src.src.to_vec(), src.src_mask));
        Self {
            prefix_size: query.prefix_size(),
            class: query.class(),
            protocol: query.protocol(),
            key: query.to_key(),
            src,
            bimatch,
        }
    }

    fn prefix(&self, bits: u16) -> KeyRef<'_> {
        KeyRef::new(self.key.as_bytes(), usize::from(bits))
    }

    fn accepts(&self, pass: Pass, entry: &Description) -> bool {
        if self.prefix_size != 0 {
            let accepted = match pass {
                Pass::Specific => entry.prefix_size() >= self.prefix_size,
                Pass::Exact(length) => entry.prefix_size() == length,
                Pass::Done => false,
            };
            if !accepted {
                return false;
            }
        }

        if let Some((src, mask)) = &self.src {
            let fields = entry.fields();
            if fields.src.is_empty() {
                if !self.bimatch {
                    return false;
                }
            } else {
                // Compared over the shorter of the two masks, so either side may be a subnet.
                let bits = usize::from((*mask).min(fields.src_mask));
                if fields.src.len() != src.len() || KeyRef::new(fields.src, bits) != KeyRef::new(src, bits) {
                    return false;
                }
            }
        }

        field_matches(entry.class(), self.class, CLASS_ANY, self.bimatch) &&
            field_matches(entry.protocol(), self.protocol, PROTOCOL_ANY, self.bimatch)
    }
}

/// A wildcard in the query matches anything. A wildcard in the entry matches anything only
/// when matching both ways.
fn field_matches(entry: u8, query: u8, any: u8, bimatch: bool) -> bool {
    query == any || entry == query || (bimatch && entry == any)
}

/// Weight bonus for a class or protocol: 2 for an exact match, 1 for an entry wildcard. A
/// specific entry value under a query wildcard earns nothing and disqualifies the entry.
fn bonus(entry: u8, query: u8, any: u8) -> Option<u32> {
    if entry == any {
        Some(1)
    } else if entry == query {
        Some(2)
    } else {
        None
    }
}

/// Iterates over the entries of a flow table matching a query, most specific first.
///
/// The first pass walks the entries under the query's full prefix. With bidirectional matching
/// it then steps down through the shorter mask lengths registered in the table, longest first,
/// yielding the entries with exactly that prefix length: these are the entries that cover the
/// query with a wildcard or a shorter mask. [`MatchIter::current_mask_length`] tells which pass
/// an entry came from.
///
/// Candidates are then filtered on source prefix, class and protocol. The interface index only
/// takes part through the prefix.
pub struct MatchIter<S: FlowSource> {
    source: S,
    query: Query,
    pass: Pass,
    current: u16,
    inner: Option<S::Iter>,
}

impl<S: FlowSource> MatchIter<S> {
    /// Starts a match of `description` against `source`, considering only `fields` of the
    /// query. With `bimatch` set, wildcards in the entries match too. A description without a
    /// key matches nothing.
    pub fn new(source: S, description: &Description, fields: Fields, bimatch: bool) -> Self {
        let query = Query::new(description, fields, bimatch);
        let (pass, inner) = if description.is_valid() {
            (Pass::Specific, Some(source.iter_prefix(query.prefix(query.prefix_size))))
        } else {
            (Pass::Done, None)
        };
        Self { source, current: query.prefix_size, query, pass, inner }
    }

    /// Restarts the match with a new query.
    pub fn reset(&mut self, description: &Description, fields: Fields, bimatch: bool) {
        *self = Self::new(self.source, description, fields, bimatch);
    }

    /// The prefix length the last returned entry was matched at.
    #[inline]
    pub const fn current_mask_length(&self) -> u16 {
        self.current
    }

    /// Moves to the next shorter mask length.
    fn step_down(&mut self) {
        let next = if self.query.bimatch && self.query.prefix_size != 0 {
            self.source.next_mask_below(self.current)
        } else {
            None
        };
        match next {
            Some(length) => {
                trace!(length, "Matching at shorter mask length");
                self.pass = Pass::Exact(length);
                self.current = length;
                self.inner = Some(self.source.iter_prefix(self.query.prefix(length)));
            }
            None => {
                self.pass = Pass::Done;
                self.inner = None;
            }
        }
    }

    /// Returns the best matching entry.
    ///
    /// Each match is weighted by its destination plus source mask length, plus 2 for an exact or
    /// 1 for a wildcard class, and the same for the protocol. Matches with a specific class or
    /// protocol where the query has a wildcard are passed over. On equal weight an exact class
    /// match wins. Unless `deep_search` is set, the search ends as soon as the walk drops below
    /// the mask length of a match, so the longest destination prefix wins; a deep search lets a
    /// longer source prefix under a shorter destination prefix win.
    pub fn best_match(mut self, deep_search: bool) -> Option<S::Entry> {
        let (class, protocol) = (self.query.class, self.query.protocol);
        let mut best: Option<(S::Entry, u32)> = None;
        let mut last = self.current;
        while let Some(entry) = self.next() {
            if best.is_some() && self.current < last && !deep_search {
                break;
            }
            last = self.current;

            let description = S::description(&entry);
            let (Some(class_bonus), Some(protocol_bonus)) = (
                bonus(description.class(), class, CLASS_ANY),
                bonus(description.protocol(), protocol, PROTOCOL_ANY),
            ) else {
                continue;
            };
            let weight = u32::from(description.dst_mask()) +
                u32::from(description.src_mask()) +
                class_bonus +
                protocol_bonus;
            let replace = match &best {
                None => true,
                Some((_, best_weight)) => {
                    weight > *best_weight || (weight == *best_weight && description.class() == class)
                }
            };
            if replace {
                best = Some((entry, weight));
            }
        }
        best.map(|(entry, _)| entry)
    }
}

impl<S: FlowSource> Iterator for MatchIter<S> {
    type Item = S::Entry;

    fn next(&mut self) -> Option<S::Entry> {
        loop {
            let Self { query, pass, inner, .. } = self;
            let iter = inner.as_mut()?;
            if let Some(entry) = iter.find(|entry| query.accepts(*pass, S::description(entry))) {
                return Some(entry);
            }
            self.step_down();
        }
    }
}

impl<S: FlowSource> fmt::Debug for MatchIter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchIter")
            .field("prefix_size", &self.query.prefix_size)
            .field("current", &self.current)
            .field("pass", &self.pass)
            .field("bimatch", &self.query.bimatch)
            .finish_non_exhaustive()
    }
}
