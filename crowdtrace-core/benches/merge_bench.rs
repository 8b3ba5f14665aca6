use chrono::{DateTime, TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use crowdtrace_core::{Cluster, Individual, SampleStore, StoreHandle, StoreIter, union_all};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Gauge {
    at: DateTime<Utc>,
    value: u64,
}

impl Individual for Gauge {
    fn captured_at(&self) -> DateTime<Utc> {
        self.at
    }

    fn merge(self, other: Self) -> Self {
        Self {
            at: self.at.max(other.at),
            value: self.value + other.value,
        }
    }
}

struct StoreCluster(StoreHandle<Gauge>);

impl Cluster for StoreCluster {
    type Individual = Gauge;

    fn iter(&self) -> Box<dyn Iterator<Item = Gauge> + '_> {
        Box::new(StoreIter::new(Rc::clone(&self.0)))
    }
}

fn cluster_with(snapshot_count: u32, phase: u32) -> StoreCluster {
    let epoch = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let mut store = SampleStore::new();
    for n in 0..snapshot_count {
        store.append(Gauge {
            at: epoch + chrono::Duration::hours((n * 3 + phase) as i64),
            value: n as u64,
        });
    }
    StoreCluster(Rc::new(RefCell::new(store)))
}

fn bench_binary_union(c: &mut Criterion) {
    let union = cluster_with(500, 0).union(cluster_with(500, 1));
    c.bench_function("binary union, 2x500 snapshots", |b| {
        b.iter(|| union.iter().map(|g| g.value).sum::<u64>())
    });
}

fn bench_wide_union(c: &mut Criterion) {
    let union = union_all(
        (0..16).map(|phase| Box::new(cluster_with(100, phase)) as Box<dyn Cluster<Individual = Gauge>>),
    );
    c.bench_function("16-way union, 100 snapshots each", |b| {
        b.iter(|| union.iter().map(|g| g.value).sum::<u64>())
    });
}

criterion_group!(benches, bench_binary_union, bench_wide_union);
criterion_main!(benches);
