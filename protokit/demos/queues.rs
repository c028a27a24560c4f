use protokit::{IndexedQueue, Item, Key, KeyFn, KeyOrder, Queue, SimpleQueue, SortedQueue};
use tracing::info;

#[derive(Debug)]
struct Timer {
    name: &'static str,
    deadline: i32,
}

fn main() {
    let _ = tracing_subscriber::fmt::try_init();

    // The same timers, in arrival order, by name, and by (signed) deadline.
    let mut arrivals = SimpleQueue::new();
    let mut by_name = IndexedQueue::new(KeyFn::new(|timer: &Timer| Key::from(timer.name)));
    let mut by_deadline = SortedQueue::new(
        KeyFn::new(|timer: &Timer| Key::from(timer.deadline as u32)).with_order(KeyOrder::signed()),
    );

    let timers: Vec<_> = [("flush", 50), ("retry", -5), ("probe", 50), ("expire", 10)]
        .into_iter()
        .map(|(name, deadline)| Item::new(Timer { name, deadline }))
        .collect();
    for timer in &timers {
        arrivals.append(timer).unwrap();
        by_name.insert(timer).unwrap();
        by_deadline.insert(timer).unwrap();
    }

    let names = |iter: &mut dyn Iterator<Item = Item<Timer>>| iter.map(|timer| timer.name).collect::<Vec<_>>();
    info!("arrivals: {:?}", names(&mut arrivals.iter()));
    info!("by name: {:?}", names(&mut by_name.iter()));
    info!("by deadline: {:?}", names(&mut by_deadline.iter()));

    // Cancelling a timer takes it out of every queue.
    if let Some(timer) = by_name.find("probe") {
        timer.detach_all();
    }
    info!("after cancel: {:?}", names(&mut by_deadline.iter()));

    while let Some(timer) = by_deadline.remove_head() {
        info!(name = timer.name, deadline = timer.deadline, still_queued = timer.is_queued(), "Fired");
    }
    info!(arrivals = arrivals.len(), by_name = by_name.len(), "Remaining");
}
