//! Ordered containers used as queue backings.
//!
//! - [`List`]: a doubly linked list in a recycled arena.
//! - [`Trie`]: a binary radix trie over bit-string keys, with unique keys.
//! - [`SortedTrie`]: the same trie allowing duplicate keys, kept in insertion order.
//!
//! All three hand out small copyable handles and implement [`Sequence`], so a [`Cursor`] can
//! walk any of them and survive removals reported to it.

pub use proto_common::{Endian, Key, KeyOrder, KeyRef};

mod cursor;
pub use cursor::{Cursor, Handle, Sequence};

pub mod list;
pub use list::{List, ListId};

mod slab;

pub mod sorted;
pub use sorted::{SortedId, SortedTrie};

pub mod trie;
pub use trie::{EntryId, Occupied, Trie};
