use tracing::{error, warn};

use crate::KEY_MAX;

/// The prefix lengths present in a table, with the number of entries using each.
///
/// Lengths are kept longest first, which is the order a match walks them in.
#[derive(Debug, Clone, Default)]
pub struct MaskLengthList {
    lengths: Vec<(u16, usize)>,
}

impl MaskLengthList {
    /// The longest prefix a flow key can have, in bits.
    pub const MAX: u16 = (KEY_MAX * 8) as u16;

    pub const fn new() -> Self {
        Self { lengths: Vec::new() }
    }

    fn position(&self, length: u16) -> Result<usize, usize> {
        self.lengths.binary_search_by(|(probe, _)| length.cmp(probe))
    }

    /// Adds a reference to `length`. Returns false, changing nothing, if the length is out of
    /// range.
    pub fn insert(&mut self, length: u16) -> bool {
        if length > Self::MAX {
            error!(length, "Invalid mask length");
            return false;
        }
        match self.position(length) {
            Ok(index) => self.lengths[index].1 += 1,
            Err(index) => self.lengths.insert(index, (length, 1)),
        }
        true
    }

    /// Drops a reference to `length`, forgetting the length with its last reference. Returns
    /// false if the length was not present.
    pub fn remove(&mut self, length: u16) -> bool {
        match self.position(length) {
            Ok(index) => {
                let count = &mut self.lengths[index].1;
                *count -= 1;
                if *count == 0 {
                    self.lengths.remove(index);
                }
                true
            }
            Err(_) => {
                warn!(length, "Removed mask length was not present");
                false
            }
        }
    }

    pub fn contains(&self, length: u16) -> bool {
        self.position(length).is_ok()
    }

    /// Number of references to `length`.
    pub fn count(&self, length: u16) -> usize {
        self.position(length).map_or(0, |index| self.lengths[index].1)
    }

    /// Number of distinct lengths.
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// The longest length strictly shorter than `length`.
    pub fn next_below(&self, length: u16) -> Option<u16> {
        let index = match self.position(length) {
            Ok(index) => index + 1,
            Err(index) => index,
        };
        self.lengths.get(index).map(|(length, _)| *length)
    }

    /// Iterates over the distinct lengths, longest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = u16> + '_ {
        self.lengths.iter().map(|(length, _)| *length)
    }

    pub fn clear(&mut self) {
        self.lengths.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_list_sorted_and_counted() {
        let mut masks = MaskLengthList::new();
        for length in [16, 48, 16, 0, 24, 48, 48] {
            assert!(masks.insert(length));
        }
        assert_eq!(masks.iter().collect::<Vec<_>>(), vec![48, 24, 16, 0]);
        assert_eq!(masks.count(48), 3);
        assert_eq!(masks.count(16), 2);
        assert_eq!(masks.count(17), 0);

        assert!(masks.remove(16));
        assert!(masks.contains(16));
        assert!(masks.remove(16));
        assert!(!masks.contains(16));
        assert!(!masks.remove(16));
        assert_eq!(masks.len(), 3);
    }

    #[test]
    fn mask_list_bounds() {
        let mut masks = MaskLengthList::new();
        assert!(masks.insert(MaskLengthList::MAX));
        assert!(!masks.insert(MaskLengthList::MAX + 1));
        assert_eq!(masks.len(), 1);
    }

    #[test]
    fn next_below() {
        let mut masks = MaskLengthList::new();
        for length in [8, 16, 40] {
            masks.insert(length);
        }
        assert_eq!(masks.next_below(100), Some(40));
        assert_eq!(masks.next_below(40), Some(16));
        assert_eq!(masks.next_below(17), Some(16));
        assert_eq!(masks.next_below(16), Some(8));
        assert_eq!(masks.next_below(8), None);
        assert_eq!(masks.next_below(0), None);
    }
}
