use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    ops::BitOr,
};

use bytes::{BufMut, BytesMut};
use proto_common::{Key, KeyRef};
use tracing::error;

use crate::{FlowError, CLASS_ANY, INDEX_ANY, KEY_MAX, PROTOCOL_ANY};

/// A set of description fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fields(u8);

impl Fields {
    pub const NONE: Self = Self(0x00);
    pub const DST: Self = Self(0x01);
    pub const SRC: Self = Self(0x02);
    pub const CLASS: Self = Self(0x04);
    pub const PROTO: Self = Self(0x08);
    pub const INDEX: Self = Self(0x10);
    pub const ALL: Self = Self(0x1f);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Builds a set from raw flag bits, ignoring unknown ones.
    #[inline]
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }
}

impl Default for Fields {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for Fields {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// The address family of a description, inferred from its address lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    pub const fn from_len(len: usize) -> Option<Self> {
        match len {
            4 => Some(Self::Ipv4),
            16 => Some(Self::Ipv6),
            _ => None,
        }
    }

    /// Address length in bytes.
    pub const fn address_len(self) -> usize {
        match self {
            Self::Ipv4 => 4,
            Self::Ipv6 => 16,
        }
    }
}

/// The raw fields of a flow key.
///
/// An empty address slice means "any address"; its mask is then ignored. Masks count the
/// leading bits of the address that are significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyFields<'a> {
    pub dst: &'a [u8],
    pub dst_mask: u8,
    pub src: &'a [u8],
    pub src_mask: u8,
    pub class: u8,
    pub protocol: u8,
    pub index: u32,
}

impl Default for KeyFields<'_> {
    fn default() -> Self {
        Self { dst: &[], dst_mask: 0, src: &[], src_mask: 0, class: CLASS_ANY, protocol: PROTOCOL_ANY, index: INDEX_ANY }
    }
}

impl<'a> KeyFields<'a> {
    /// Size of the encoded key in bytes.
    pub const fn encoded_len(&self) -> usize {
        let dst = if self.dst.is_empty() { 1 } else { 2 + self.dst.len() };
        let src = if self.src.is_empty() { 1 } else { 2 + self.src.len() };
        dst + src + 2 + 4
    }

    /// Number of leading key bits usable for prefix matching.
    ///
    /// The prefix covers each field in key order for as long as the fields are present with a
    /// full-length mask. It ends inside the first partially masked address, and before the first
    /// wildcard.
    pub fn prefix_size(&self) -> u16 {
        let mut size = 0;
        if self.dst.is_empty() {
            return 0;
        }
        size += 8 + usize::from(self.dst_mask);
        if usize::from(self.dst_mask) != self.dst.len() * 8 {
            return size as u16;
        }
        size += 8;

        if self.src.is_empty() {
            return size as u16;
        }
        size += 8 + usize::from(self.src_mask);
        if usize::from(self.src_mask) != self.src.len() * 8 {
            return size as u16;
        }
        size += 8;

        if self.class == CLASS_ANY {
            return size as u16;
        }
        size += 8;
        if self.protocol == PROTOCOL_ANY {
            return size as u16;
        }
        size += 8;
        if self.index != INDEX_ANY {
            size += 32;
        }
        size as u16
    }

    /// Keeps the fields in `fields` and wildcards the others.
    pub const fn select(self, fields: Fields) -> Self {
        Self {
            dst: if fields.contains(Fields::DST) { self.dst } else { &[] },
            dst_mask: if fields.contains(Fields::DST) { self.dst_mask } else { 0 },
            src: if fields.contains(Fields::SRC) { self.src } else { &[] },
            src_mask: if fields.contains(Fields::SRC) { self.src_mask } else { 0 },
            class: if fields.contains(Fields::CLASS) { self.class } else { CLASS_ANY },
            protocol: if fields.contains(Fields::PROTO) { self.protocol } else { PROTOCOL_ANY },
            index: if fields.contains(Fields::INDEX) { self.index } else { INDEX_ANY },
        }
    }

    fn validate(&self) -> Result<(), FlowError> {
        let len = self.encoded_len();
        if len > KEY_MAX {
            return Err(FlowError::KeyTooLong(len));
        }
        for (address, mask) in [(self.dst, self.dst_mask), (self.src, self.src_mask)] {
            if !address.is_empty() && usize::from(mask) > address.len() * 8 {
                return Err(FlowError::InvalidMask { mask, bits: address.len() * 8 });
            }
        }
        Ok(())
    }

    /// Encodes `[dlen][dst dmask][slen][src smask][class][protocol][index]`, with the address
    /// and mask bytes present only for non-empty addresses and the index in network order.
    fn encode(&self) -> Key {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        for (address, mask) in [(self.dst, self.dst_mask), (self.src, self.src_mask)] {
            buf.put_u8(address.len() as u8);
            if !address.is_empty() {
                buf.put_slice(address);
                buf.put_u8(mask);
            }
        }
        buf.put_u8(self.class);
        buf.put_u8(self.protocol);
        buf.put_u32(self.index);
        Key::from_bytes(buf.freeze())
    }

    fn decode(bytes: &'a [u8]) -> Option<Self> {
        fn address<'b>(bytes: &'b [u8], at: &mut usize) -> Option<(&'b [u8], u8)> {
            let len = usize::from(*bytes.get(*at)?);
            *at += 1;
            if len == 0 {
                return Some((&[], 0));
            }
            let address = bytes.get(*at..*at + len)?;
            let mask = *bytes.get(*at + len)?;
            *at += len + 1;
            Some((address, mask))
        }

        let mut at = 0;
        let (dst, dst_mask) = address(bytes, &mut at)?;
        let (src, src_mask) = address(bytes, &mut at)?;
        let tail = bytes.get(at..at + 6)?;
        Some(Self {
            dst,
            dst_mask,
            src,
            src_mask,
            class: tail[0],
            protocol: tail[1],
            index: u32::from_be_bytes([tail[2], tail[3], tail[4], tail[5]]),
        })
    }
}

fn octets(address: Option<IpAddr>) -> Vec<u8> {
    match address {
        Some(IpAddr::V4(address)) => address.octets().to_vec(),
        Some(IpAddr::V6(address)) => address.octets().to_vec(),
        None => Vec::new(),
    }
}

fn to_address(bytes: &[u8]) -> Option<IpAddr> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        Some(Ipv4Addr::from(octets).into())
    } else if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        Some(Ipv6Addr::from(octets).into())
    } else {
        None
    }
}

/// The flow tuple a table entry or a query stands for, encoded as a bit-string key.
///
/// Once inserted into a table, a description must not change: its key is what the table is
/// indexed by.
#[derive(Clone, PartialEq, Eq)]
pub struct Description {
    key: Key,
    prefix_size: u16,
}

impl Default for Description {
    /// A description matching any flow.
    fn default() -> Self {
        Self::encode(&KeyFields::default())
    }
}

impl Description {
    /// Builds a description with full-length masks. `None` addresses and the `*_ANY` constants
    /// act as wildcards.
    pub fn new(dst: Option<IpAddr>, src: Option<IpAddr>, class: u8, protocol: u8, index: u32) -> Self {
        let (dst, src) = (octets(dst), octets(src));
        Self::encode(&KeyFields {
            dst: &dst,
            dst_mask: (dst.len() * 8) as u8,
            src: &src,
            src_mask: (src.len() * 8) as u8,
            class,
            protocol,
            index,
        })
    }

    /// A description without a key. It is rejected by tables and prints as `*`.
    pub fn invalid() -> Self {
        Self { key: Key::default(), prefix_size: 0 }
    }

    pub fn from_fields(fields: &KeyFields<'_>) -> Result<Self, FlowError> {
        fields.validate()?;
        Ok(Self::encode(fields))
    }

    fn encode(fields: &KeyFields<'_>) -> Self {
        Self { key: fields.encode(), prefix_size: fields.prefix_size() }
    }

    /// Replaces the key with one built from `fields`. On failure the description is left
    /// without a key.
    pub fn set_key(&mut self, fields: &KeyFields<'_>) -> Result<(), FlowError> {
        match Self::from_fields(fields) {
            Ok(description) => {
                *self = description;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Invalid flow key");
                *self = Self::invalid();
                Err(e)
            }
        }
    }

    /// Copies the fields of `other` selected by `fields`, wildcarding the rest.
    pub fn init_from_description(&mut self, other: &Self, fields: Fields) {
        *self = other.select(fields);
    }

    /// Returns a copy with only the fields in `fields` kept.
    pub fn select(&self, fields: Fields) -> Self {
        if fields == Fields::ALL || !self.is_valid() {
            return self.clone();
        }
        Self::encode(&self.fields().select(fields))
    }

    /// Sets the destination prefix length. Does nothing if the destination is a wildcard.
    pub fn set_dst_mask_length(&mut self, mask: u8) -> Result<(), FlowError> {
        let fields = self.fields();
        if fields.dst.is_empty() {
            return Ok(());
        }
        *self = Self::from_fields(&KeyFields { dst_mask: mask, ..fields })?;
        Ok(())
    }

    /// Sets the source prefix length. Does nothing if the source is a wildcard.
    pub fn set_src_mask_length(&mut self, mask: u8) -> Result<(), FlowError> {
        let fields = self.fields();
        if fields.src.is_empty() {
            return Ok(());
        }
        *self = Self::from_fields(&KeyFields { src_mask: mask, ..fields })?;
        Ok(())
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        !self.key.is_empty()
    }

    #[inline]
    pub fn key(&self) -> KeyRef<'_> {
        self.key.as_key_ref()
    }

    /// Returns the key, sharing its buffer.
    #[inline]
    pub fn to_key(&self) -> Key {
        self.key.clone()
    }

    /// Size of the key in bits.
    #[inline]
    pub const fn key_bits(&self) -> usize {
        self.key.bits()
    }

    /// Number of leading key bits usable for prefix matching. See [`KeyFields::prefix_size`].
    #[inline]
    pub const fn prefix_size(&self) -> u16 {
        self.prefix_size
    }

    /// Decodes the key. A description without a key decodes to all wildcards.
    pub fn fields(&self) -> KeyFields<'_> {
        KeyFields::decode(self.key.as_bytes()).unwrap_or_default()
    }

    pub fn dst_len(&self) -> usize {
        self.fields().dst.len()
    }

    pub fn dst_bytes(&self) -> &[u8] {
        self.fields().dst
    }

    pub fn dst_mask(&self) -> u8 {
        self.fields().dst_mask
    }

    /// The destination address, unless it is a wildcard.
    pub fn dst_addr(&self) -> Option<IpAddr> {
        to_address(self.fields().dst)
    }

    pub fn src_len(&self) -> usize {
        self.fields().src.len()
    }

    pub fn src_bytes(&self) -> &[u8] {
        self.fields().src
    }

    pub fn src_mask(&self) -> u8 {
        self.fields().src_mask
    }

    /// The source address, unless it is a wildcard.
    pub fn src_addr(&self) -> Option<IpAddr> {
        to_address(self.fields().src)
    }

    pub fn class(&self) -> u8 {
        self.fields().class
    }

    pub fn protocol(&self) -> u8 {
        self.fields().protocol
    }

    pub fn index(&self) -> u32 {
        self.fields().index
    }

    /// The family of the destination address, or of the source if the destination is a
    /// wildcard.
    pub fn address_family(&self) -> Option<AddressFamily> {
        let fields = self.fields();
        let len = if fields.dst.is_empty() { fields.src.len() } else { fields.dst.len() };
        AddressFamily::from_len(len)
    }
}

fn write_address(f: &mut fmt::Formatter<'_>, address: &[u8], mask: u8) -> fmt::Result {
    match to_address(address) {
        Some(ip) => write!(f, "{ip}")?,
        None => {
            for byte in address {
                write!(f, "{byte:02x}")?;
            }
        }
    }
    if usize::from(mask) != address.len() * 8 {
        write!(f, "/{mask}")?;
    }
    Ok(())
}

impl fmt::Display for Description {
    /// Writes `src[/mask]->dst[/mask],protocol,class,index`, with `*` for wildcards and trailing
    /// wildcards left out. The class is written as two hex digits, with a `0x` prefix in the
    /// alternate form (`{:#}`), which is the form that parses back to the same class.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return f.write_str("*");
        }

        let fields = self.fields();
        let count = if fields.index != INDEX_ANY {
            5
        } else if fields.class != CLASS_ANY {
            4
        } else if fields.protocol != PROTOCOL_ANY {
            3
        } else if !fields.dst.is_empty() || !fields.src.is_empty() {
            2
        } else {
            1
        };

        if fields.src.is_empty() {
            f.write_str("*")?;
        } else {
            write_address(f, fields.src, fields.src_mask)?;
        }
        if count < 2 {
            return Ok(());
        }

        f.write_str("->")?;
        if fields.dst.is_empty() {
            f.write_str("*")?;
        } else {
            write_address(f, fields.dst, fields.dst_mask)?;
        }
        if count < 3 {
            return Ok(());
        }

        match fields.protocol {
            PROTOCOL_ANY => f.write_str(",*")?,
            protocol => write!(f, ",{protocol}")?,
        }
        if count < 4 {
            return Ok(());
        }

        match fields.class {
            CLASS_ANY => f.write_str(",*")?,
            class if f.alternate() => write!(f, ",{class:#04x}")?,
            class => write!(f, ",{class:02x}")?,
        }
        if count < 5 {
            return Ok(());
        }

        write!(f, ",{}", fields.index)
    }
}

impl fmt::Debug for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Description")
            .field("flow", &format_args!("{self}"))
            .field("key", &self.key)
            .field("prefix_size", &self.prefix_size)
            .finish()
    }
}
