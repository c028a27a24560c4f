use proto_queue::{IndexedQueue, Item, Key, KeyFn, KeyOrder, Queue, SortedQueue};
use rand::{seq::SliceRandom, Rng};

#[test]
fn indexed_round_trip() {
    let mut queue = IndexedQueue::new(KeyFn::new(|v: &u32| Key::from(*v)));
    let items: Vec<_> = [5u32, 1, 9, 3].into_iter().map(Item::new).collect();
    for item in &items {
        queue.insert(item).unwrap();
    }

    assert_eq!(queue.iter().map(|item| *item).collect::<Vec<_>>(), vec![1, 3, 5, 9]);
    assert_eq!(queue.iter_rev().map(|item| *item).collect::<Vec<_>>(), vec![9, 5, 3, 1]);
}

#[test]
fn sorted_round_trip() {
    let mut queue = SortedQueue::new(KeyFn::new(|v: &u32| Key::from(*v)));
    let items: Vec<_> = [5u32, 1, 9, 3].into_iter().map(Item::new).collect();
    for item in &items {
        queue.insert(item).unwrap();
    }

    assert_eq!(queue.iter().map(|item| *item).collect::<Vec<_>>(), vec![1, 3, 5, 9]);
    assert_eq!(queue.iter_rev().map(|item| *item).collect::<Vec<_>>(), vec![9, 5, 3, 1]);
    assert_eq!(queue.head().map(|item| *item), Some(1));
    assert_eq!(queue.tail().map(|item| *item), Some(9));
}

#[test]
fn sign_magnitude_order() {
    fn encode(v: &i32) -> Key {
        let raw = if *v < 0 { 0x8000_0000 | v.unsigned_abs() } else { *v as u32 };
        Key::from(raw)
    }

    let mut queue = SortedQueue::new(KeyFn::new(encode).with_order(KeyOrder::sign_magnitude()));
    let items: Vec<_> = [-5, 3, -1, 0].into_iter().map(Item::new).collect();
    for item in &items {
        queue.insert(item).unwrap();
    }

    assert_eq!(queue.iter().map(|item| *item).collect::<Vec<_>>(), vec![-5, -1, 0, 3]);
}

#[test]
fn little_endian_keys() {
    let keys = KeyFn::new(|v: &u16| Key::from(v.to_le_bytes().to_vec())).with_order(KeyOrder::unsigned().with_endian(proto_queue::Endian::Little));
    let mut queue = IndexedQueue::new(keys);
    let items: Vec<_> = [0x0100u16, 0x00ff, 0x0200, 0x0001].into_iter().map(Item::new).collect();
    for item in &items {
        queue.insert(item).unwrap();
    }

    assert_eq!(queue.iter().map(|item| *item).collect::<Vec<_>>(), vec![0x0001, 0x00ff, 0x0100, 0x0200]);
}

#[test]
fn random_sorted_queue_matches_stable_sort() {
    let mut rng = rand::thread_rng();
    let mut queue = SortedQueue::new(KeyFn::new(|v: &(u16, usize)| Key::from(v.0)));

    let mut values: Vec<(u16, usize)> = (0..500).map(|i| (rng.gen_range(0..64), i)).collect();
    let items: Vec<_> = values.iter().copied().map(Item::new).collect();
    for item in &items {
        queue.insert(item).unwrap();
    }

    // Remove a random third of them.
    let mut doomed: Vec<_> = items.iter().collect();
    doomed.shuffle(&mut rng);
    for item in doomed.into_iter().take(items.len() / 3) {
        assert!(queue.remove(item));
        values.retain(|v| *v != **item);
    }

    values.sort_by_key(|v| v.0);
    let queued: Vec<_> = queue.iter().map(|item| *item).collect();
    assert_eq!(queued, values);

    values.reverse();
    let queued: Vec<_> = queue.iter_rev().map(|item| *item).collect();
    assert_eq!(queued, values);
}
