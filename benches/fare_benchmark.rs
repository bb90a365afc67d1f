use criterion::{criterion_group, criterion_main, Criterion};
use fleet_rentals::cache::{CachedStationRepository, CacheTtls, MemoryCache};
use fleet_rentals::db::{MemoryDb, StationStore};
use fleet_rentals::models::Money;
use fleet_rentals::services::calculate_fare;
use std::hint::black_box;
use std::sync::Arc;

fn benchmark_fares(c: &mut Criterion) {
    let rate = Money::from_units(4500);
    let mut group = c.benchmark_group("fares");

    group.bench_function("short_rental", |b| {
        b.iter(|| calculate_fare(black_box(rate), black_box(45)))
    });

    // Crosses the long-rental discount threshold
    group.bench_function("long_rental_discounted", |b| {
        b.iter(|| calculate_fare(black_box(rate), black_box(600)))
    });

    group.finish();
}

fn benchmark_cached_reads(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");
    let db = runtime
        .block_on(MemoryDb::load_fixture("data/fleet.json"))
        .expect("Failed to load fleet fixture");
    let db = Arc::new(db);
    let cached = CachedStationRepository::new(
        db.clone(),
        Arc::new(MemoryCache::new()),
        CacheTtls::default(),
    );

    let mut group = c.benchmark_group("station_availability");

    group.bench_function("store", |b| {
        b.iter(|| runtime.block_on(db.get_availability(black_box(1))))
    });

    group.bench_function("cache_hit", |b| {
        b.iter(|| runtime.block_on(cached.get_availability(black_box(1))))
    });

    group.finish();
}

criterion_group!(benches, benchmark_fares, benchmark_cached_reads);
criterion_main!(benches);
