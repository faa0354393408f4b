//! Benchmarks for route table construction and lookup.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rw_site::{Route, RouteTable, SiteBuilder};

/// Create `count` patterns mixing static, parameterized and catch-all routes.
fn patterns(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 3 {
            0 => format!("/section-{i}/page"),
            1 => format!("/section-{i}/:slug"),
            _ => format!("/section-{i}/**"),
        })
        .collect()
}

fn bench_route_table_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_table_build");

    for count in [10, 100, 1000] {
        let patterns = patterns(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &patterns, |b, patterns| {
            b.iter(|| RouteTable::build(patterns.iter().map(String::as_str)));
        });
    }

    group.finish();
}

fn bench_route_table_lookup(c: &mut Criterion) {
    let patterns = patterns(300);
    let table = RouteTable::build(patterns.iter().map(String::as_str));

    let mut group = c.benchmark_group("route_table_lookup");

    group.bench_function("static_hit", |b| b.iter(|| table.lookup("/section-0/page")));
    group.bench_function("param_hit", |b| b.iter(|| table.lookup("/section-1/hello")));
    group.bench_function("catch_all_hit", |b| {
        b.iter(|| table.lookup("/section-2/a/b/c"));
    });
    group.bench_function("miss", |b| b.iter(|| table.lookup("/nonexistent/path")));

    group.finish();
}

fn bench_site_lookup_cached(c: &mut Criterion) {
    let site = patterns(300)
        .into_iter()
        .fold(SiteBuilder::<()>::default(), |builder, pattern| {
            builder.route(Route::page(pattern, |cx| async move { Ok(cx.path) }))
        })
        .build();

    c.bench_function("site_lookup_cached", |b| {
        b.iter(|| site.lookup("/section-1/hello"));
    });
}

criterion_group!(
    benches,
    bench_route_table_build,
    bench_route_table_lookup,
    bench_site_lookup_cached
);
criterion_main!(benches);
