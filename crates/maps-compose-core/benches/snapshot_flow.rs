use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use futures::{FutureExt, StreamExt};
use maps_compose_core::{intersects, snapshot_flow, ApplyNotifier, MutableState, StateIdSet};

const READ_SET_SIZES: &[usize] = &[1, 8, 64, 512];
const BATCH_SIZE: usize = 4096;
const CELL_COUNT: usize = 32;

fn id_set(cells: &[MutableState<usize>]) -> StateIdSet {
    cells.iter().map(MutableState::id).collect()
}

fn bench_intersection(c: &mut Criterion) {
    let notifier = ApplyNotifier::new();
    let batch_cells: Vec<MutableState<usize>> =
        (0..BATCH_SIZE).map(|i| MutableState::new(i, &notifier)).collect();
    let batch = id_set(&batch_cells);

    let mut group = c.benchmark_group("read_set_intersection");
    for &size in READ_SET_SIZES {
        let read_cells: Vec<MutableState<usize>> =
            (0..size).map(|i| MutableState::new(i, &notifier)).collect();
        let reads = id_set(&read_cells);
        group.bench_with_input(BenchmarkId::from_parameter(size), &reads, |b, reads| {
            b.iter(|| black_box(intersects(black_box(reads), black_box(&batch))));
        });
    }
    group.finish();
}

fn bench_reevaluation(c: &mut Criterion) {
    let notifier = ApplyNotifier::new();
    let cells: Vec<MutableState<usize>> =
        (0..CELL_COUNT).map(|i| MutableState::new(i, &notifier)).collect();
    let flow = snapshot_flow(&notifier, {
        let cells = cells.clone();
        move || cells.iter().map(MutableState::get).sum::<usize>()
    });
    let mut values = flow.values();
    black_box(values.next().now_or_never());

    let mut tick = 0usize;
    c.bench_function("snapshot_flow_reevaluate", |b| {
        b.iter(|| {
            tick += 1;
            cells[tick % CELL_COUNT].set(tick);
            notifier.send_apply_notifications();
            black_box(values.next().now_or_never());
        });
    });

    let unrelated = MutableState::new(0usize, &notifier);
    c.bench_function("snapshot_flow_skip_unrelated", |b| {
        b.iter(|| {
            tick += 1;
            unrelated.set(tick);
            notifier.send_apply_notifications();
            black_box(values.next().now_or_never());
        });
    });
}

criterion_group!(snapshot_flow_benches, bench_intersection, bench_reevaluation);
criterion_main!(snapshot_flow_benches);
