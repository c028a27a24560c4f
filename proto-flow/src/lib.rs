//! Flow classification tables.
//!
//! A [`Description`] packs a flow tuple (destination, source, traffic class, protocol and
//! interface index) into a bit-string key. Any field can be wildcarded, and the addresses can
//! carry a prefix mask, so one description can stand for a whole subnet. Descriptions are built
//! from fields, from an IP header ([`Description::init_from_pkt`]), or from text such as
//! `10.0.0.0/8->192.168.1.1,6,0`.
//!
//! A [`FlowTable`] (or a [`FlowQueue`] of shared items) stores descriptions in a trie and
//! matches queries against them: longest destination prefix first, then source prefix, with
//! wildcards honoured on the query side and, in bidirectional mode, on the entry side too.
//!
//! ```
//! use proto_flow::{Description, FlowTable};
//!
//! let mut table = FlowTable::new();
//! table.insert("10.0.0.0/8".parse().unwrap(), "wide").unwrap();
//! table.insert("10.1.0.0/16".parse().unwrap(), "narrow").unwrap();
//!
//! let query: Description = "10.1.2.3".parse().unwrap();
//! assert_eq!(table.lookup(&query).map(|(_, _, v)| *v), Some("narrow"));
//! ```

use proto_queue::QueueError;
use thiserror::Error;

pub use proto_common::{Key, KeyRef};

mod description;
pub use description::{AddressFamily, Description, Fields, KeyFields};

mod mask;
pub use mask::MaskLengthList;

mod matcher;
pub use matcher::{FlowSource, MatchIter};

mod packet;
pub use packet::{IpHeader, IpHeaderView};

mod queue;
pub use queue::{FlowEntry, FlowQueue};

mod table;
pub use table::{FlowId, FlowTable, Rejected, TableIter, TableOptions};

mod text;
pub use text::{AddressResolver, LiteralResolver, ParseError};

/// Maximum size of a flow key in bytes: length and mask bytes plus up to 16 address bytes for
/// each address, then class, protocol and a 4 byte interface index.
pub const KEY_MAX: usize = 1 + 16 + 1 + 1 + 16 + 1 + 1 + 1 + 4;

/// The traffic class value meaning "any class". Only the ECN bits are set, which no real class
/// selector does.
pub const CLASS_ANY: u8 = 0x03;

/// The protocol value meaning "any protocol" (the reserved IP protocol number).
pub const PROTOCOL_ANY: u8 = 255;

/// The interface index meaning "any interface".
pub const INDEX_ANY: u32 = 0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("Flow key of {0} bytes exceeds the {KEY_MAX} byte maximum")]
    KeyTooLong(usize),
    #[error("Mask length {mask} exceeds the {bits} bit address")]
    InvalidMask { mask: u8, bits: usize },
    #[error("Invalid IP version: {0}")]
    IpVersion(u8),
    #[error("IP header truncated at {0} bytes")]
    Truncated(usize),
    #[error("Description has no key")]
    InvalidDescription,
    #[error("An entry with an identical description already exists")]
    DuplicateFlow,
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}
