//! Bit-keyed tries, multi-membership queues and flow classification tables.
//!
//! This crate bundles the protokit crates:
//!
//! - [`proto_common`]: bit-string keys and their ordering policies.
//! - [`proto_tree`]: the list and trie containers.
//! - [`proto_queue`]: queues whose items can be members of many queues at once.
//! - [`proto_flow`]: flow descriptions and longest-prefix flow tables.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub use proto_common::*;
pub use proto_flow::*;
pub use proto_queue::*;
pub use proto_tree::*;

pub use proto_common;
pub use proto_flow;
pub use proto_queue;
pub use proto_tree;
