use proptest::prelude::*;
use proto_tree::{Key, KeyOrder, KeyRef, SortedTrie, Trie};

#[test]
fn round_trip_ascending_and_reverse() {
    let mut trie = Trie::new();
    for v in [5u32, 1, 9, 3] {
        trie.insert(Key::from(v), v).unwrap();
    }
    assert_eq!(trie.iter().map(|(_, _, v)| *v).collect::<Vec<_>>(), vec![1, 3, 5, 9]);
    assert_eq!(trie.iter().rev().map(|(_, _, v)| *v).collect::<Vec<_>>(), vec![9, 5, 3, 1]);
}

#[test]
fn signed_sign_magnitude_integers() {
    // Sign-magnitude encoding: the top bit is the sign, the rest the magnitude.
    fn encode(v: i32) -> Key {
        let raw = if v < 0 { 0x8000_0000 | v.unsigned_abs() } else { v as u32 };
        Key::from(raw)
    }

    let order = KeyOrder::unsigned().with_sign_bit(true).with_complement2(false);
    let mut trie = SortedTrie::with_order(order);
    for v in [-5, 3, -1, 0] {
        trie.insert(encode(v), v);
    }
    assert_eq!(trie.iter().map(|(_, v)| *v).collect::<Vec<_>>(), vec![-5, -1, 0, 3]);
}

#[test]
fn zero_length_key_sorts_first() {
    let mut trie = Trie::new();
    trie.insert(Key::from(0u8), "zero").unwrap();
    trie.insert(Key::default(), "empty").unwrap();
    assert_eq!(trie.iter().next().map(|(_, _, v)| *v), Some("empty"));
    assert!(trie.find(KeyRef::new(&[], 0)).is_some());
}

proptest! {
    #[test]
    fn trie_iterates_in_sorted_order(mut values in proptest::collection::vec(any::<u16>(), 0..200)) {
        let mut trie = Trie::new();
        for v in &values {
            let _ = trie.insert(Key::from(*v), *v);
        }
        values.sort_unstable();
        values.dedup();
        prop_assert_eq!(trie.iter().map(|(_, _, v)| *v).collect::<Vec<_>>(), values);
    }

    #[test]
    fn sorted_trie_is_stable(values in proptest::collection::vec((0u8..8, any::<u32>()), 0..100)) {
        let mut trie = SortedTrie::new();
        for (key, tag) in &values {
            trie.insert(Key::from(*key), (*key, *tag));
        }
        let mut expected = values.clone();
        expected.sort_by_key(|(key, _)| *key);
        prop_assert_eq!(trie.iter().map(|(_, v)| *v).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn longest_prefix_matches_linear_scan(
        prefixes in proptest::collection::vec((any::<u32>(), 0usize..=32), 1..40),
        probe: u32,
    ) {
        let mut trie = Trie::new();
        for (addr, len) in &prefixes {
            let masked = if *len == 0 { 0 } else { addr & (u32::MAX << (32 - len)) };
            let _ = trie.insert(Key::new(masked.to_be_bytes().to_vec(), *len), *len);
        }

        let expected = prefixes
            .iter()
            .filter(|(addr, len)| *len == 0 || (addr ^ probe) >> (32 - len) == 0)
            .map(|(_, len)| *len)
            .max();
        let probe = probe.to_be_bytes();
        let found = trie.find_prefix(&probe).and_then(|id| trie.get(id)).copied();
        prop_assert_eq!(found, expected);
    }
}
