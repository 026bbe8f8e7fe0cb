//! Performance benchmarks for hostsweep

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hostsweep::{
    config::ReconConfig,
    engine::{is_valid_hostname, sort_records, BoxedProbe, FnProbe, ReconEngine},
    output::{format_clean, format_csv, format_json},
    utils::parse_addresses_simple,
    ProbeError, Record,
};
use tokio::runtime::Runtime;

fn records(count: u32) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let offset = i.wrapping_mul(2_654_435_761) >> 8;
            let ip = std::net::Ipv4Addr::from(0x0a00_0000u32.wrapping_add(offset));
            Record::new("reverse", ip.to_string(), format!("host-{}.example.com", i % 997))
        })
        .collect()
}

/// Benchmark ordering of result sets
fn bench_sorting(c: &mut Criterion) {
    let mut group = c.benchmark_group("sorting");

    for size in [100u32, 10_000, 100_000] {
        let input = records(size);
        group.bench_with_input(BenchmarkId::new("sort_records", size), &input, |b, input| {
            b.iter(|| {
                let mut batch = input.clone();
                sort_records(&mut batch);
                black_box(batch)
            })
        });
    }
    group.finish();
}

/// Benchmark target expansion and hostname checks
fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");

    group.bench_function("expand_slash_16", |b| {
        b.iter(|| black_box(parse_addresses_simple(&["10.1.0.0/16"]).unwrap()))
    });

    group.bench_function("hostname_validation", |b| {
        let names = ["sub.example.com", "bad_host!", "a-b.c-d.example", "-nope.example"];
        b.iter(|| {
            for name in names.iter() {
                black_box(is_valid_hostname(black_box(name)));
            }
        })
    });
    group.finish();
}

/// Benchmark the output renderers
fn bench_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("rendering");
    let mut input = records(10_000);
    sort_records(&mut input);

    group.bench_function("csv", |b| b.iter(|| black_box(format_csv(&input).unwrap())));
    group.bench_function("clean", |b| b.iter(|| black_box(format_clean(&input))));
    group.bench_function("json", |b| b.iter(|| black_box(format_json(&input).unwrap())));
    group.finish();
}

/// Benchmark the worker pool with probes that return immediately
fn bench_engine(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("engine");
    group.sample_size(10);

    for workers in [10usize, 100, 500] {
        group.bench_with_input(BenchmarkId::new("10k_probes", workers), &workers, |b, &workers| {
            b.iter(|| {
                rt.block_on(async {
                    let config = ReconConfig::default().with_concurrency(workers);
                    let engine = ReconEngine::new(&config, None).unwrap();
                    let probes: Vec<BoxedProbe> = records(10_000)
                        .into_iter()
                        .map(|record| {
                            FnProbe::boxed("bench", move || {
                                let record = record.clone();
                                async move { Ok::<_, ProbeError>(vec![record]) }
                            })
                        })
                        .collect();
                    black_box(engine.run(probes).await.unwrap())
                })
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sorting, bench_parsing, bench_rendering, bench_engine);

criterion_main!(benches);
