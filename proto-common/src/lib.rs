//! Keys and ordering policies shared by the protokit containers.
//!
//! Every keyed structure stores items under a byte string plus a bit length. How those bits
//! compare is decided by a [`KeyOrder`]: the byte order, and whether the first bit is a sign
//! bit (two's complement or sign-magnitude).

mod key;
pub use key::*;

mod order;
pub use order::*;
