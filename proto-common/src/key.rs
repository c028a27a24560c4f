use std::fmt;

use bytes::Bytes;

use crate::KeyOrder;

/// Returns the number of bytes spanned by `bits` bits.
#[inline]
pub const fn byte_len(bits: usize) -> usize {
    (bits + 7) >> 3
}

/// A borrowed key: a byte buffer and the number of significant bits in it.
#[derive(Clone, Copy)]
pub struct KeyRef<'a> {
    bytes: &'a [u8],
    bits: usize,
}

impl<'a> KeyRef<'a> {
    /// Creates a key over the first `bits` bits of `bytes`. The bit length is clamped to the
    /// size of the buffer.
    #[inline]
    pub fn new(bytes: &'a [u8], bits: usize) -> Self {
        debug_assert!(bits <= bytes.len() << 3, "key length exceeds buffer");
        Self { bytes, bits: bits.min(bytes.len() << 3) }
    }

    #[inline]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline]
    pub const fn bits(&self) -> usize {
        self.bits
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Copies the key into an owned [`Key`].
    pub fn to_key(&self) -> Key {
        let len = byte_len(self.bits);
        Key { bytes: Bytes::copy_from_slice(&self.bytes[..len]), bits: self.bits }
    }
}

impl<'a> From<&'a [u8]> for KeyRef<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self { bytes, bits: bytes.len() << 3 }
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for KeyRef<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Self::from(&bytes[..])
    }
}

impl<'a> From<&'a str> for KeyRef<'a> {
    fn from(s: &'a str) -> Self {
        Self::from(s.as_bytes())
    }
}

impl<'a> From<&'a Key> for KeyRef<'a> {
    fn from(key: &'a Key) -> Self {
        key.as_key_ref()
    }
}

impl PartialEq for KeyRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        KeyOrder::unsigned().equal(*self, *other)
    }
}

impl Eq for KeyRef<'_> {}

impl fmt::Debug for KeyRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.bytes[..byte_len(self.bits)] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "/{}", self.bits)
    }
}

/// An owned key. Keys are cheap to clone.
#[derive(Clone, Default)]
pub struct Key {
    bytes: Bytes,
    bits: usize,
}

impl Key {
    /// Creates a key over the first `bits` bits of `bytes`.
    pub fn new(bytes: impl Into<Bytes>, bits: usize) -> Self {
        let bytes = bytes.into();
        debug_assert!(bits <= bytes.len() << 3, "key length exceeds buffer");
        let bits = bits.min(bytes.len() << 3);
        Self { bytes, bits }
    }

    /// Creates a key spanning all bits of `bytes`.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let bits = bytes.len() << 3;
        Self { bytes, bits }
    }

    /// Copies a key spanning all bits of `bytes`.
    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        Self::from_bytes(Bytes::copy_from_slice(bytes))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub const fn bits(&self) -> usize {
        self.bits
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    #[inline]
    pub fn as_key_ref(&self) -> KeyRef<'_> {
        KeyRef { bytes: &self.bytes, bits: self.bits }
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::copy_from_slice(s.as_bytes())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::from_bytes(s.into_bytes())
    }
}

impl From<KeyRef<'_>> for Key {
    fn from(key: KeyRef<'_>) -> Self {
        key.to_key()
    }
}

macro_rules! impl_from_uint {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Key {
                /// Big endian encoding, which sorts numerically under the default order.
                fn from(value: $ty) -> Self {
                    Self::copy_from_slice(&value.to_be_bytes())
                }
            }
        )*
    };
}

impl_from_uint!(u8, u16, u32, u64, u128);

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.as_key_ref() == other.as_key_ref()
    }
}

impl Eq for Key {}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.as_key_ref(), f)
    }
}
