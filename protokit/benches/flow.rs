use std::{
    net::{IpAddr, Ipv4Addr},
    time::Duration,
};

use criterion::{
    criterion_group, criterion_main, measurement::WallTime, BenchmarkGroup, BenchmarkId, Criterion,
    Throughput,
};
use pprof::criterion::Output;
use rand::Rng;

use protokit::{Description, FlowTable, TableOptions, CLASS_ANY, INDEX_ANY, PROTOCOL_ANY};

// Using jemalloc improves performance by ~10%
#[cfg(all(not(windows), not(target_env = "musl")))]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

const N_QUERIES: usize = 10_000;

fn host(address: u32) -> Description {
    Description::new(Some(IpAddr::V4(Ipv4Addr::from(address))), None, CLASS_ANY, PROTOCOL_ANY, INDEX_ANY)
}

/// A table of random routes with prefix lengths spread over 8 to 32 bits.
fn routing_table(routes: usize, options: TableOptions) -> FlowTable<u32> {
    let mut rng = rand::thread_rng();
    let mut table = FlowTable::with_options(options.capacity(routes));
    for route in 0..routes {
        let mut description = host(rng.gen());
        let _ = description.set_dst_mask_length(rng.gen_range(8..=32));
        let _ = table.insert(description, route as u32);
    }
    table
}

fn bench_lookup(mut group: BenchmarkGroup<'_, WallTime>, deep_search: bool) {
    let mut rng = rand::thread_rng();
    let queries: Vec<_> = (0..N_QUERIES).map(|_| host(rng.gen())).collect();

    for routes in [100, 1_000, 10_000] {
        let table = routing_table(routes, TableOptions::default().deep_search(deep_search));
        group.throughput(Throughput::Elements(N_QUERIES as u64));
        group.bench_function(BenchmarkId::from_parameter(routes), |b| {
            b.iter(|| queries.iter().filter(|query| table.lookup(query).is_some()).count());
        });
    }

    group.finish();
}

fn bench_parse(mut group: BenchmarkGroup<'_, WallTime>) {
    let texts = ["10.0.0.0/8->192.168.1.1,6,0", "224.1.2.3", "2001:db8::1/64->ff02::1,17,0x2e,3"];
    for text in texts {
        group.bench_function(BenchmarkId::from_parameter(text), |b| {
            b.iter(|| text.parse::<Description>().is_ok());
        });
    }

    group.finish();
}

fn flow_table(c: &mut Criterion) {
    let _ = tracing_subscriber::fmt::try_init();

    bench_lookup(c.benchmark_group("flow_lookup"), false);
    bench_lookup(c.benchmark_group("flow_lookup_deep"), true);
    bench_parse(c.benchmark_group("flow_parse"));
}

criterion_group! {
    name = benches;
    config = Criterion::default().warm_up_time(Duration::from_secs(1)).with_profiler(pprof::criterion::PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = flow_table
}

// Runs the flow table lookup and parsing benchmarks.
criterion_main!(benches);
