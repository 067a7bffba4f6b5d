//! Scalability benchmarks for the crowd core
//!
//! Measures the spatial grid, the flocking step and the full frame at crowd
//! sizes up to the population ceiling.
//!
//! Run with: cargo bench --bench scalability

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use crowd_runner_core::config::CrowdConfig;
use crowd_runner_core::crowd::gate::{Gate, GateOp};
use crowd_runner_core::crowd::oracle::{FenceSpan, FenceTrack};
use crowd_runner_core::crowd::pool::AgentHandle;
use crowd_runner_core::crowd::spatial::SpatialHashGrid;
use crowd_runner_core::crowd::store::AgentStore;
use crowd_runner_core::crowd::systems::FlockingSolver;
use crowd_runner_core::crowd::CrowdSession;
use crowd_runner_core::util::vec2::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SIZES: [usize; 4] = [500, 1000, 2000, 4999];

/// Store with `count` agents packed roughly the way a settled crowd is
fn create_store(count: usize) -> AgentStore {
    let mut rng = StdRng::seed_from_u64(7);
    let mut store = AgentStore::with_capacity(count);
    // About 0.5 units between neighbors over a road 12 units wide
    let columns = 24;
    for i in 0..count {
        let x = (i % columns) as f32 * 0.5 - 6.0 + rng.gen_range(-0.1..0.1);
        let z = (i / columns) as f32 * 0.5 + rng.gen_range(-0.1..0.1);
        store.push(AgentHandle(i as u32), Vec2::new(x, z), 0.0);
    }
    store
}

/// Benchmark grid rebuild plus one neighbor query per agent
fn bench_spatial_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_grid");
    group.sample_size(50);

    for count in SIZES {
        let store = create_store(count);
        let mut grid = SpatialHashGrid::default();
        let mut buffer = vec![0u32; 200];

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("rebuild_and_query", count), &count, |b, _| {
            b.iter(|| {
                grid.rebuild(store.pos_x(), store.pos_z());
                let mut found = 0;
                for i in 0..store.len() {
                    let p = store.position(i);
                    found += grid.query_neighbors(p.x, p.z, &mut buffer);
                }
                black_box(found)
            })
        });
    }
    group.finish();
}

/// Benchmark one fixed flocking step
fn bench_flocking_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("flocking");
    group.sample_size(50);

    let config = CrowdConfig::default();
    for count in SIZES {
        let mut store = create_store(count);
        let mut solver = FlockingSolver::new(&config);
        let interval = solver.interval();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("step", count), &count, |b, _| {
            b.iter(|| black_box(solver.step(&mut store, interval)))
        });
    }
    group.finish();
}

/// Benchmark a full frame (spawns drained, logic step when due, integration)
fn bench_session_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");
    group.sample_size(30);

    for count in SIZES {
        let track = FenceTrack::with_spans([FenceSpan::new(-1.0e6, 1.0e6, 0.75)]);
        let mut session = match CrowdSession::start(CrowdConfig::default(), track) {
            Ok(session) => session,
            Err(e) => panic!("invalid default config: {e}"),
        };
        session.apply_gate(Gate::new(GateOp::Add, count as f64));
        while session.population().pending() > 0 {
            session.tick(1.0 / 60.0);
        }

        let mut z = 0.0;
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("tick", count), &count, |b, _| {
            b.iter(|| {
                z -= 0.1;
                session.set_leader_position(Vec2::new(0.0, z));
                session.tick(black_box(1.0 / 60.0));
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_spatial_grid, bench_flocking_step, bench_session_tick);
criterion_main!(benches);
