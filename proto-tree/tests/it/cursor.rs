use proto_tree::{Cursor, Key, KeyRef, List, SortedTrie, Trie};

fn word_trie(words: &[&'static str]) -> Trie<&'static str> {
    let mut trie = Trie::new();
    for word in words {
        trie.insert(Key::from(*word), *word).unwrap();
    }
    trie
}

#[test]
fn cursor_walks_both_ways() {
    let trie = word_trie(&["a", "b", "c", "d"]);
    let mut cursor = Cursor::new(&trie, false);

    let a = cursor.next(&trie).unwrap();
    let b = cursor.next(&trie).unwrap();
    assert_eq!(trie.get(a), Some(&"a"));
    assert_eq!(trie.get(b), Some(&"b"));

    // Turning around returns the entry just passed.
    assert_eq!(cursor.prev(&trie), Some(b));
    assert_eq!(cursor.prev(&trie), Some(a));
    assert_eq!(cursor.prev(&trie), None);
    assert_eq!(cursor.peek_next(), Some(a));
}

#[test]
fn reversed_cursor_starts_at_the_end() {
    let trie = word_trie(&["a", "b", "c"]);
    let mut cursor = Cursor::new(&trie, true);
    let mut seen = Vec::new();
    while let Some(id) = cursor.prev(&trie) {
        seen.push(*trie.get(id).unwrap());
    }
    assert_eq!(seen, vec!["c", "b", "a"]);
}

#[test]
fn cursor_survives_removal_of_its_neighbours() {
    let mut trie = word_trie(&["a", "b", "c", "d", "e"]);
    let mut cursor = Cursor::new(&trie, false);
    let a = cursor.next(&trie).unwrap();

    let b = trie.find("b").unwrap();
    cursor.on_remove(&trie, b);
    trie.remove(b);
    cursor.on_remove(&trie, a);
    trie.remove(a);

    let rest: Vec<_> = std::iter::from_fn(|| cursor.next(&trie)).map(|id| *trie.get(id).unwrap()).collect();
    assert_eq!(rest, vec!["c", "d", "e"]);
}

#[test]
fn prefix_cursor() {
    let trie = word_trie(&["ca", "car", "carbon", "cart", "cat", "dog"]);
    let mut cursor = Cursor::new(&trie, false);
    cursor.reset_prefix(&trie, KeyRef::from("car"), false);

    let forward: Vec<_> = std::iter::from_fn(|| cursor.next(&trie)).map(|id| *trie.get(id).unwrap()).collect();
    assert_eq!(forward, vec!["car", "carbon", "cart"]);

    cursor.reset_prefix(&trie, KeyRef::from("car"), true);
    let backward: Vec<_> = std::iter::from_fn(|| cursor.prev(&trie)).map(|id| *trie.get(id).unwrap()).collect();
    assert_eq!(backward, vec!["cart", "carbon", "car"]);

    cursor.reset_prefix(&trie, KeyRef::from("z"), false);
    assert_eq!(cursor.next(&trie), None);
}

#[test]
fn set_cursor_positions_before_entry() {
    let trie = word_trie(&["a", "b", "c"]);
    let b = trie.find("b").unwrap();
    let mut cursor = Cursor::new(&trie, false);
    cursor.set_cursor(&trie, b);
    assert_eq!(cursor.next(&trie), Some(b));
    assert_eq!(cursor.next(&trie), trie.find("c"));

    cursor.set_cursor(&trie, b);
    assert_eq!(cursor.prev(&trie), trie.find("a"));
}

#[test]
fn cursor_over_sorted_trie_and_list() {
    let mut sorted = SortedTrie::new();
    for v in [3u8, 1, 3, 2] {
        sorted.insert(Key::from(v), v);
    }
    let mut cursor = Cursor::new(&sorted, false);
    let values: Vec<_> = std::iter::from_fn(|| cursor.next(&sorted)).map(|id| *sorted.get(id).unwrap()).collect();
    assert_eq!(values, vec![1, 2, 3, 3]);

    let mut list = List::new();
    list.push_back('x');
    list.push_front('w');
    let mut cursor = Cursor::new(&list, true);
    assert_eq!(cursor.prev(&list).and_then(|id| list.get(id)), Some(&'x'));
    assert_eq!(cursor.prev(&list).and_then(|id| list.get(id)), Some(&'w'));
}
