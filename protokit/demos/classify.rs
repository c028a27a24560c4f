use protokit::{Description, FlowTable, IpHeaderView, TableOptions};
use tracing::{info, warn};

fn main() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut table = FlowTable::with_options(TableOptions::default().deep_search(true));
    for (text, queue) in [
        ("*->10.0.0.0/8", "bulk"),
        ("*->10.1.0.0/16,17", "voice"),
        ("*->10.1.0.0/16,*,184", "expedited"),
        ("192.168.0.0/24->10.0.0.0/8,6", "backup"),
    ] {
        let description: Description = text.parse().expect("valid flow");
        table.insert(description, queue).expect("unique flow");
    }

    // Raw IPv4 headers: TOS, protocol, source and destination.
    let packets = [
        (0x00, 17, [172, 16, 0, 1], [10, 1, 2, 3]),
        (0xb8, 6, [172, 16, 0, 1], [10, 1, 2, 3]),
        (0x00, 6, [192, 168, 0, 7], [10, 9, 9, 9]),
        (0x00, 6, [192, 168, 0, 7], [11, 0, 0, 1]),
    ];
    for (tos, protocol, src, dst) in packets {
        let mut bytes = vec![0x45, tos, 0, 20, 0, 0, 0, 0, 64, protocol, 0, 0];
        bytes.extend_from_slice(&src);
        bytes.extend_from_slice(&dst);

        let header = IpHeaderView::new(&bytes).expect("valid header");
        let flow = Description::from_packet(&header, 0, Default::default()).expect("valid flow");
        match table.lookup(&flow) {
            Some((_, entry, queue)) => info!(%flow, %entry, queue, "Classified"),
            None => warn!(%flow, "No matching flow"),
        }
    }
}
