//! Criterion benchmarks for area assembly.
//!
//! Measures a full `WithAreas` pass over a synthetic multipolygon whose outer
//! rings are each split into two half-ways, so every ring needs chaining.
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench --package osmarea-core
//! ```

#![allow(missing_docs, reason = "Criterion macros generate undocumented code")]

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use osmarea_core::{
    Entity, HandlerTable, Location, Member, MemorySource, Mode, Node, Pipeline, PipelineConfig,
    Relation, Way, collect_tags,
};

/// Number of rings in the benchmarked multipolygon.
const RING_COUNTS: &[i64] = &[16, 128, 1024];

/// Side of each square cell in raw fixed-point units.
const CELL: i32 = 1_000;

/// Build a row of disjoint squares, each drawn as two open half-ways.
fn split_squares(rings: i64) -> Vec<Entity> {
    let mut nodes = Vec::new();
    let mut ways = Vec::new();
    let mut members = Vec::new();
    let mut x = 0_i32;
    for ring in 0..rings {
        let first = ring * 4 + 1;
        let corners = [(x, 0), (x + CELL, 0), (x + CELL, CELL), (x, CELL)];
        for (id, (cx, cy)) in (first..).zip(corners) {
            nodes.push(Node::new(id, Location::new(cx, cy)).into());
        }
        let lower = ring * 2 + 1;
        let upper = lower + 1;
        ways.push(Way::new(lower, [first, first + 1, first + 2]).into());
        ways.push(Way::new(upper, [first + 2, first + 3, first]).into());
        members.push(Member::way(lower, "outer"));
        members.push(Member::way(upper, "outer"));
        x += 2 * CELL;
    }
    let relation = Relation::new(1, members)
        .with_tags(collect_tags([("type", "multipolygon"), ("landuse", "farmland")]));
    nodes
        .into_iter()
        .chain(ways)
        .chain(std::iter::once(relation.into()))
        .collect()
}

fn bench_area_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("area_pass");
    group.measurement_time(Duration::from_secs(5));
    let pipeline = Pipeline::new(Mode::WithAreas, PipelineConfig::default());

    for &rings in RING_COUNTS {
        let source = MemorySource::with_block_size(split_squares(rings), 8_000);
        group.throughput(Throughput::Elements(rings.unsigned_abs()));
        group.bench_with_input(BenchmarkId::new("rings", rings), &rings, |b, _| {
            b.iter(|| {
                let mut table = HandlerTable::new().on_area(|_| Ok(()));
                #[expect(
                    clippy::let_underscore_must_use,
                    reason = "Benchmarking pass throughput, the report is discarded"
                )]
                let _ = pipeline.run(&source, &mut table);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_area_pass);
criterion_main!(benches);
