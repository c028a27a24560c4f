use proto_queue::{IndexedQueue, Item, Key, KeyFn, Queue, QueueError, SimpleQueue, SortedQueue};

#[derive(Debug)]
struct Session {
    name: &'static str,
    priority: u8,
}

fn session(name: &'static str, priority: u8) -> Item<Session> {
    Item::new(Session { name, priority })
}

#[test]
fn item_in_three_queues() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut fifo = SimpleQueue::new();
    let mut by_name = IndexedQueue::new(KeyFn::new(|s: &Session| Key::from(s.name)));
    let mut by_priority = SortedQueue::new(KeyFn::new(|s: &Session| Key::from(s.priority)));

    let a = session("alpha", 2);
    let b = session("beta", 1);
    for item in [&a, &b] {
        fifo.append(item).unwrap();
        by_name.insert(item).unwrap();
        by_priority.insert(item).unwrap();
    }

    assert_eq!(a.queue_count(), 3);
    assert!(a.is_in(&fifo) && a.is_in(&by_name) && a.is_in(&by_priority));
    assert_eq!(by_priority.head().map(|s| s.name), Some("beta"));

    // Leaving one queue leaves the others untouched.
    assert!(by_name.remove(&a));
    assert!(!by_name.remove(&a));
    assert!(a.is_in(&fifo));
    assert!(a.is_in_other_queue(&fifo));
    assert!(a.is_in_other_queue(&by_name));
    assert_eq!(a.queue_count(), 2);

    fifo.remove(&a);
    assert!(!a.is_in_other_queue(&by_priority));
}

#[test]
fn dropping_an_item_leaves_every_queue() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut fifo = SimpleQueue::new();
    let mut by_name = IndexedQueue::new(KeyFn::new(|s: &Session| Key::from(s.name)));
    let a = session("alpha", 0);
    let b = session("beta", 0);
    for item in [&a, &b] {
        fifo.append(item).unwrap();
        by_name.insert(item).unwrap();
    }

    drop(a);
    assert_eq!(fifo.len(), 1);
    assert_eq!(by_name.len(), 1);
    assert!(by_name.find("alpha").is_none());
    assert_eq!(fifo.head().map(|s| s.name), Some("beta"));
}

#[test]
fn dropping_a_queue_releases_memberships() {
    let mut fifo = SimpleQueue::new();
    let item = session("alpha", 0);
    {
        let mut other = SimpleQueue::new();
        fifo.append(&item).unwrap();
        other.append(&item).unwrap();
        assert_eq!(item.queue_count(), 2);
    }
    assert_eq!(item.queue_count(), 1);
    assert!(item.is_in(&fifo));
}

#[test]
fn empty_keeps_items_in_other_queues() {
    let mut first = SimpleQueue::new();
    let mut second = SimpleQueue::new();
    let items: Vec<_> = (0..4).map(Item::new).collect();
    for item in &items {
        first.append(item).unwrap();
        second.append(item).unwrap();
    }

    first.empty();
    assert!(first.is_empty());
    assert_eq!(second.len(), 4);
    assert!(items.iter().all(|item| item.queue_count() == 1));

    // The emptied queue is still usable.
    first.append(&items[0]).unwrap();
    assert_eq!(first.len(), 1);
}

#[test]
fn destroy_retires_items_everywhere() {
    let mut first = SimpleQueue::new();
    let mut second = SimpleQueue::new();
    let mut third = SimpleQueue::new();
    let items: Vec<_> = (0..4).map(Item::new).collect();
    for item in &items {
        first.append(item).unwrap();
        second.append(item).unwrap();
    }
    let bystander = Item::new(99);
    second.append(&bystander).unwrap();
    third.append(&bystander).unwrap();

    first.destroy();
    assert!(first.is_empty());
    assert_eq!(second.len(), 1);
    assert!(items.iter().all(|item| !item.is_queued()));
    assert_eq!(bystander.queue_count(), 2);
    assert_eq!(third.len(), 1);
}

#[test]
fn failed_insert_registers_nothing() {
    let mut by_name = IndexedQueue::new(KeyFn::new(|s: &Session| Key::from(s.name)));
    let mut fifo = SimpleQueue::new();
    let a = session("alpha", 0);
    let twin = session("alpha", 1);

    by_name.insert(&a).unwrap();
    fifo.append(&twin).unwrap();
    assert_eq!(by_name.insert(&twin), Err(QueueError::DuplicateKey(by_name.id())));
    assert_eq!(twin.queue_count(), 1);
    assert!(!twin.is_in(&by_name));

    // Once the original leaves, the key is free again.
    by_name.remove(&a);
    by_name.insert(&twin).unwrap();
    assert!(Item::ptr_eq(&by_name.find("alpha").unwrap(), &twin));
}

#[test]
fn iterator_outlives_queue() {
    let item = Item::new(1);
    let mut iter = {
        let mut fifo = SimpleQueue::new();
        fifo.append(&item).unwrap();
        fifo.iter()
    };
    assert!(iter.next().is_none());
    assert!(!item.is_queued());
}

#[test]
fn iterator_survives_neighbour_removal() {
    let mut by_name = IndexedQueue::new(KeyFn::new(|s: &Session| Key::from(s.name)));
    let names = ["a", "b", "c", "d", "e"];
    let items: Vec<_> = names.into_iter().map(|name| session(name, 0)).collect();
    for item in &items {
        by_name.insert(item).unwrap();
    }

    let mut iter = by_name.iter();
    assert_eq!(iter.next_item().map(|s| s.name), Some("a"));
    assert_eq!(iter.next_item().map(|s| s.name), Some("b"));

    // Cursor sits between "b" and "c"; remove both neighbours.
    by_name.remove(&items[1]);
    by_name.remove(&items[2]);
    assert_eq!(iter.peek_next().map(|s| s.name), Some("d"));
    assert_eq!(iter.prev_item().map(|s| s.name), Some("a"));
    assert_eq!(iter.next_item().map(|s| s.name), Some("a"));
    assert_eq!(iter.next_item().map(|s| s.name), Some("d"));

    // Dropping an item also moves the cursor.
    drop(items);
    assert!(iter.next_item().is_none());
    assert!(by_name.is_empty());
}
