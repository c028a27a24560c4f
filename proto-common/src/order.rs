use std::cmp::Ordering;

use crate::{byte_len, KeyRef};

/// Byte order in which the bytes of a key are consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    /// The first byte in memory is the most significant one.
    #[default]
    Big,
    /// The last byte in memory is the most significant one.
    Little,
}

impl Endian {
    /// The byte order of the target platform.
    pub const NATIVE: Self = if cfg!(target_endian = "little") { Self::Little } else { Self::Big };
}

/// The ordering policy of a keyed structure.
///
/// Keys are compared bit by bit, starting at the most significant bit of the most significant
/// byte (as selected by [`Endian`]). When the sign bit is in use, the first bit is inverted so
/// that negative values order before positive ones. Without two's complement (sign-magnitude,
/// e.g. IEEE floats), the remaining bits of negative values are inverted as well.
///
/// A key that ends where another one continues orders first, so a prefix always sorts before
/// its extensions and the zero-length key is the smallest of all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyOrder {
    endian: Endian,
    sign_bit: bool,
    complement2: bool,
}

impl Default for KeyOrder {
    fn default() -> Self {
        Self::unsigned()
    }
}

impl KeyOrder {
    /// Plain lexicographic bit order, big endian.
    pub const fn unsigned() -> Self {
        Self { endian: Endian::Big, sign_bit: false, complement2: true }
    }

    /// Two's complement signed integers, big endian.
    pub const fn signed() -> Self {
        Self { endian: Endian::Big, sign_bit: true, complement2: true }
    }

    /// Sign-magnitude values such as IEEE floating point numbers, big endian.
    pub const fn sign_magnitude() -> Self {
        Self { endian: Endian::Big, sign_bit: true, complement2: false }
    }

    /// Sets the byte order.
    pub const fn with_endian(self, endian: Endian) -> Self {
        Self { endian, ..self }
    }

    /// Sets whether the first bit is interpreted as a sign bit.
    pub const fn with_sign_bit(self, sign_bit: bool) -> Self {
        Self { sign_bit, ..self }
    }

    /// Sets whether signed values use two's complement (as opposed to sign-magnitude).
    pub const fn with_complement2(self, complement2: bool) -> Self {
        Self { complement2, ..self }
    }

    #[inline]
    pub const fn endian(&self) -> Endian {
        self.endian
    }

    #[inline]
    pub const fn uses_sign_bit(&self) -> bool {
        self.sign_bit
    }

    #[inline]
    pub const fn uses_complement2(&self) -> bool {
        self.complement2
    }

    /// Memory index of the `n`th most significant byte of the key.
    #[inline]
    fn byte_index(&self, key: KeyRef<'_>, n: usize) -> usize {
        match self.endian {
            Endian::Big => n,
            Endian::Little => byte_len(key.bits()) - 1 - n,
        }
    }

    #[inline]
    fn flip_mask(&self, key: KeyRef<'_>, n: usize) -> u8 {
        if !self.sign_bit {
            return 0;
        }

        let negative = key.as_bytes()[self.byte_index(key, 0)] & 0x80 != 0;
        if negative && !self.complement2 {
            0xff
        } else if n == 0 {
            0x80
        } else {
            0
        }
    }

    /// Returns the `n`th byte of the key in ordering position, with the policy applied and the
    /// bits past the end of the key cleared. Comparing these bytes as unsigned values yields the
    /// policy's order.
    #[inline]
    pub fn ordered_byte(&self, key: KeyRef<'_>, n: usize) -> u8 {
        debug_assert!(n < byte_len(key.bits()));
        let byte = key.as_bytes()[self.byte_index(key, n)] ^ self.flip_mask(key, n);
        let valid = key.bits() - (n << 3);
        if valid >= 8 {
            byte
        } else {
            byte & (0xffu8 << (8 - valid))
        }
    }

    /// Returns the ordering bit at `index`, where 0 is the most significant bit.
    #[inline]
    pub fn bit(&self, key: KeyRef<'_>, index: usize) -> bool {
        debug_assert!(index < key.bits());
        self.ordered_byte(key, index >> 3) & (0x80 >> (index & 7)) != 0
    }

    /// Returns the index of the first bit at which the keys differ. The end of the shorter key
    /// counts as a difference. Identical keys return `None`.
    pub fn first_difference(&self, a: KeyRef<'_>, b: KeyRef<'_>) -> Option<usize> {
        let common = a.bits().min(b.bits());
        for n in 0..byte_len(common) {
            let diff = self.ordered_byte(a, n) ^ self.ordered_byte(b, n);
            if diff != 0 {
                let index = (n << 3) + diff.leading_zeros() as usize;
                if index < common {
                    return Some(index);
                }
                break;
            }
        }

        if a.bits() == b.bits() {
            None
        } else {
            Some(common)
        }
    }

    /// Compares two keys under this policy.
    pub fn compare(&self, a: KeyRef<'_>, b: KeyRef<'_>) -> Ordering {
        match self.first_difference(a, b) {
            None => Ordering::Equal,
            Some(index) if index == a.bits() => Ordering::Less,
            Some(index) if index == b.bits() => Ordering::Greater,
            Some(index) => {
                if self.bit(a, index) {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
        }
    }

    /// Returns true if `key` starts with all bits of `prefix`.
    pub fn has_prefix(&self, key: KeyRef<'_>, prefix: KeyRef<'_>) -> bool {
        if prefix.bits() > key.bits() {
            return false;
        }

        match self.first_difference(key, prefix) {
            None => true,
            Some(index) => index == prefix.bits(),
        }
    }

    /// Returns true if both keys have the same length and the same bits.
    #[inline]
    pub fn equal(&self, a: KeyRef<'_>, b: KeyRef<'_>) -> bool {
        a.bits() == b.bits() && self.first_difference(a, b).is_none()
    }
}
