use proto_flow::{Description, Fields, FlowTable, IpHeaderView, TableOptions};

fn flow(text: &str) -> Description {
    text.parse().unwrap()
}

fn names<'a>(iter: impl Iterator<Item = (proto_flow::FlowId, &'a Description, &'a &'static str)>) -> Vec<&'static str> {
    iter.map(|(_, _, name)| *name).collect()
}

#[test]
fn longest_destination_prefix() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut table = FlowTable::new();
    table.insert(flow("10.0.0.0/8"), "wide").unwrap();
    table.insert(flow("10.1.0.0/16"), "narrow").unwrap();

    let lookup = |text: &str| table.lookup(&flow(text)).map(|(_, _, name)| *name);
    assert_eq!(lookup("10.1.2.3"), Some("narrow"));
    assert_eq!(lookup("10.2.2.3"), Some("wide"));
    assert_eq!(lookup("11.0.0.0"), None);

    let mut iter = table.matches(&flow("10.1.2.3"));
    let mut seen = Vec::new();
    while let Some((_, _, name)) = iter.next() {
        seen.push((*name, iter.current_mask_length()));
    }
    assert_eq!(seen, vec![("narrow", 24), ("wide", 16)]);

    iter.reset(&flow("10.200.0.1"), Fields::ALL, true);
    assert_eq!(names(iter), vec!["wide"]);
}

#[test]
fn partial_query_mask_covers_entries() {
    let mut table = FlowTable::with_options(TableOptions::default().bimatch(false));
    table.insert(flow("10.0.0.0/8"), "wide").unwrap();
    table.insert(flow("10.1.0.0/16"), "narrow").unwrap();
    table.insert(flow("10.1.2.3"), "host").unwrap();

    // Without bidirectional matching an entry's mask does not cover a more specific query.
    assert_eq!(names(table.matches(&flow("10.1.2.3"))), vec!["host"]);
    assert_eq!(names(table.matches(&flow("10.1.0.0/16"))), vec!["narrow", "host"]);
    assert_eq!(names(table.matches(&flow("10.0.0.0/8"))), vec!["wide", "narrow", "host"]);
    assert!(names(table.matches(&flow("10.2.0.1"))).is_empty());
}

#[test]
fn query_wildcards_match_specific_entries() {
    let mut table = FlowTable::new();
    table.insert(flow("*->10.0.0.1,6"), "tcp").unwrap();
    table.insert(flow("1.2.3.4->10.0.0.1,17"), "udp").unwrap();

    let query = flow("*->10.0.0.1");
    assert_eq!(names(table.matches_with(&query, Fields::ALL, false)), vec!["tcp", "udp"]);

    let query = flow("1.2.3.0/24->10.0.0.1,17");
    assert_eq!(names(table.matches_with(&query, Fields::ALL, false)), vec!["udp"]);
}

#[test]
fn entry_wildcards_match_only_both_ways() {
    let mut table = FlowTable::new();
    table.insert(flow("*->10.0.0.1"), "any").unwrap();

    let query = flow("*->10.0.0.1,6");
    assert!(names(table.matches_with(&query, Fields::ALL, false)).is_empty());
    assert_eq!(names(table.matches_with(&query, Fields::ALL, true)), vec!["any"]);

    let query = flow("1.2.3.4->10.0.0.1");
    assert!(names(table.matches_with(&query, Fields::ALL, false)).is_empty());
    assert_eq!(names(table.matches_with(&query, Fields::ALL, true)), vec!["any"]);

    // Unselected query fields are wildcards.
    assert_eq!(names(table.matches_with(&query, Fields::DST, false)), vec!["any"]);
}

#[test]
fn mismatched_fields_never_match() {
    let mut table = FlowTable::new();
    table.insert(flow("5.6.7.8->10.0.0.1,17"), "other").unwrap();

    for query in ["1.2.3.4->10.0.0.1", "5.6.7.8->10.0.0.1,6", "5.6.7.8->10.0.0.2"] {
        assert!(table.lookup(&flow(query)).is_none(), "{query}");
    }
    assert!(table.lookup(&flow("5.6.7.0/24->10.0.0.1")).is_some());
}

#[test]
fn best_match_prefers_exact_class() {
    let mut table = FlowTable::new();
    table.insert(flow("*->10.1.0.0/16,6"), "protocol").unwrap();
    table.insert(flow("*->10.1.0.0/16,*,46"), "class").unwrap();

    // Both weigh 19: one exact and one wildcard field each.
    let query = flow("*->10.1.2.3,6,46");
    assert_eq!(names(table.matches(&query)).len(), 2);
    assert_eq!(table.lookup(&query).map(|(_, _, name)| *name), Some("class"));

    table.insert(flow("*->10.1.0.0/16,6,46"), "both").unwrap();
    assert_eq!(table.lookup(&query).map(|(_, _, name)| *name), Some("both"));

    // A longer destination prefix outweighs any class or protocol.
    table.insert(flow("*->10.1.2.0/24"), "subnet").unwrap();
    assert_eq!(table.lookup(&query).map(|(_, _, name)| *name), Some("subnet"));
}

#[test]
fn best_match_passes_over_specific_fields_for_wildcard_query() {
    let mut table = FlowTable::new();
    table.insert(flow("*->10.1.0.0/16,6"), "tcp").unwrap();
    table.insert(flow("*->10.0.0.0/8"), "wide").unwrap();

    // Both match a query with no protocol, but only the entry without one is a candidate.
    let query = flow("*->10.1.2.3");
    assert_eq!(names(table.matches(&query)), vec!["tcp", "wide"]);
    assert_eq!(table.lookup(&query).map(|(_, _, name)| *name), Some("wide"));
    assert_eq!(table.lookup(&flow("*->10.1.2.3,6")).map(|(_, _, name)| *name), Some("tcp"));

    table.remove_flow(&flow("*->10.0.0.0/8")).unwrap();
    assert!(table.lookup(&query).is_none());
}

#[test]
fn deep_search_finds_longer_source() {
    let mut table = FlowTable::new();
    table.insert(flow("*->10.1.0.0/16"), "destination").unwrap();
    table.insert(flow("1.2.3.4->10.0.0.0/8"), "source").unwrap();

    let query = flow("1.2.3.4->10.1.2.3");
    assert_eq!(table.best_match(&query, false).map(|(_, _, name)| *name), Some("destination"));
    assert_eq!(table.best_match(&query, true).map(|(_, _, name)| *name), Some("source"));

    let mut deep = FlowTable::with_options(TableOptions::default().deep_search(true));
    for (id, description, name) in &table {
        assert!(table.get(id).is_some());
        deep.insert(description.clone(), *name).unwrap();
    }
    assert_eq!(deep.lookup(&query).map(|(_, _, name)| *name), Some("source"));
}

#[test]
fn classify_packets() {
    let mut table = FlowTable::new();
    table.insert(flow("*->10.0.0.0/8,17"), "udp").unwrap();
    table.insert(flow("*->10.0.0.0/8,6"), "tcp").unwrap();
    table.insert(flow("*->10.0.0.0/8"), "any").unwrap();

    let classify = |protocol: u8| {
        let mut bytes = vec![0x45, 0x00, 0, 20, 0, 0, 0, 0, 64, protocol, 0, 0];
        bytes.extend_from_slice(&[192, 168, 0, 1, 10, 0, 0, 2]);
        let header = IpHeaderView::new(&bytes).unwrap();
        let query = Description::from_packet(&header, 1, Fields::ALL).unwrap();
        table.lookup(&query).map(|(_, _, name)| *name)
    };
    assert_eq!(classify(17), Some("udp"));
    assert_eq!(classify(6), Some("tcp"));
    assert_eq!(classify(1), Some("any"));
}
