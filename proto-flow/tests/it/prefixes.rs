use std::{
    collections::BTreeSet,
    net::{IpAddr, Ipv4Addr},
};

use proptest::prelude::*;
use proto_flow::{Description, FlowQueue, FlowTable, CLASS_ANY, INDEX_ANY, PROTOCOL_ANY};
use proto_queue::Item;

fn subnet(address: u32, mask: u8) -> Description {
    let address = IpAddr::V4(Ipv4Addr::from(address));
    let mut description = Description::new(Some(address), None, CLASS_ANY, PROTOCOL_ANY, INDEX_ANY);
    description.set_dst_mask_length(mask).unwrap();
    description
}

fn covers(address: u32, mask: u8, query: u32) -> bool {
    mask == 0 || (address ^ query) >> (32 - u32::from(mask)) == 0
}

/// Subnets, and a query address near one of them.
fn subnets_and_query() -> impl Strategy<Value = (Vec<(u32, u8)>, u32)> {
    (prop::collection::vec((any::<u32>(), 0u8..=32), 1..48), any::<prop::sample::Index>(), any::<u32>(), 0u32..32)
        .prop_map(|(subnets, pick, noise, shift)| {
            let query = subnets[pick.index(subnets.len())].0 ^ (noise >> shift);
            (subnets, query)
        })
}

proptest! {
    #[test]
    fn lookup_finds_longest_covering_prefix((subnets, query) in subnets_and_query()) {
        let mut table = FlowTable::new();
        let mut queue = FlowQueue::new();
        let mut items = Vec::new();
        for &(address, mask) in &subnets {
            let _ = table.insert(subnet(address, mask), ());
            let item = Item::new(subnet(address, mask));
            let _ = queue.insert(&item);
            items.push(item);
        }

        let expected = subnets.iter().filter(|(address, mask)| covers(*address, *mask, query)).map(|(_, mask)| *mask).max();
        let query = subnet(query, 32);
        prop_assert_eq!(table.lookup(&query).map(|(_, description, _)| description.dst_mask()), expected);
        prop_assert_eq!(queue.lookup(&query).map(|item| item.dst_mask()), expected);
    }

    #[test]
    fn matches_yield_every_covering_prefix_once((subnets, query) in subnets_and_query()) {
        let mut table = FlowTable::new();
        for &(address, mask) in &subnets {
            let _ = table.insert(subnet(address, mask), (address, mask));
        }

        let expected: BTreeSet<_> = subnets.iter().copied().filter(|(address, mask)| covers(*address, *mask, query)).collect();
        let found: Vec<_> = table.matches(&subnet(query, 32)).map(|(_, _, value)| *value).collect();

        prop_assert_eq!(found.len(), expected.len());
        prop_assert_eq!(found.iter().copied().collect::<BTreeSet<_>>(), expected);
        prop_assert!(found.windows(2).all(|pair| pair[0].1 >= pair[1].1));
    }
}
