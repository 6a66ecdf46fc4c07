/// Execution graph construction benchmarks
///
/// Synthetic fork/join traces: every location enters one parallel region,
/// location 0 creates all tasks inside a single construct and waits for them,
/// and the tasks run round-robin inside the closing barrier.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use execgraph::assembly::{contract, PartialGraph};
use execgraph::chunk_graph::build_chunk_graph;
use execgraph::chunker::chunks;
use execgraph::event::{Event, RegionKind};
use execgraph::{build_execution_graph, GraphConfig};

fn fork_join_trace(threads: u64, tasks: u64) -> Vec<Event> {
    let wait_at = 100 + tasks + 1;
    let mut events = Vec::new();
    for loc in 0..threads {
        let implicit = 100 + loc;
        if loc == 0 {
            events.push(Event::enter(0, 1, RegionKind::InitialTask, 1));
        }
        events.push(Event::enter(loc, 2, RegionKind::Parallel, 10));
        events.push(Event::enter(loc, 3, RegionKind::ImplicitTask, implicit).encountered_by(1));
        if loc == 0 {
            events.push(Event::enter(0, 4, RegionKind::SingleExecutor, 50));
            for task in 0..tasks {
                events.push(Event::create(0, 100 + task, 1000 + task, implicit));
            }
            events.push(Event::enter(0, wait_at, RegionKind::Taskwait, 40).encountered_by(implicit));
            events.push(Event::leave(0, wait_at + 1, RegionKind::Taskwait, 40).encountered_by(implicit));
            events.push(Event::leave(0, wait_at + 2, RegionKind::SingleExecutor, 50));
        } else {
            events.push(Event::enter(loc, 4, RegionKind::SingleOther, 50));
            events.push(Event::leave(loc, wait_at + 2, RegionKind::SingleOther, 50));
        }

        let mut time = wait_at + 10;
        events.push(Event::enter(loc, time, RegionKind::BarrierImplicit, 30));
        for task in (loc..tasks).step_by(threads as usize) {
            events.push(Event::enter(loc, time + 1, RegionKind::ExplicitTask, 1000 + task));
            events.push(Event::enter(loc, time + 2, RegionKind::Loop, 5000 + task));
            events.push(Event::leave(loc, time + 3, RegionKind::Loop, 5000 + task));
            events.push(Event::leave(loc, time + 4, RegionKind::ExplicitTask, 1000 + task));
            time += 4;
        }
        events.push(Event::leave(loc, time + 1, RegionKind::BarrierImplicit, 30));
        events.push(Event::leave(loc, time + 2, RegionKind::ImplicitTask, implicit));
        events.push(Event::leave(loc, time + 3, RegionKind::Parallel, 10));
        if loc == 0 {
            events.push(Event::leave(0, time + 4, RegionKind::InitialTask, 1));
        }
    }
    events
}

/// Initial task creates every task, then one taskwait collects them all
fn fan_in_trace(tasks: u64) -> Vec<Event> {
    let wait_at = tasks + 2;
    let mut events = vec![Event::enter(0, 1, RegionKind::InitialTask, 1)];
    for task in 0..tasks {
        events.push(Event::create(0, 2 + task, 1000 + task, 1));
    }
    events.push(Event::enter(0, wait_at, RegionKind::Taskwait, 40).encountered_by(1));
    events.push(Event::leave(0, 5 * tasks + 10, RegionKind::Taskwait, 40).encountered_by(1));
    events.push(Event::leave(0, 5 * tasks + 11, RegionKind::InitialTask, 1));
    for task in 0..tasks {
        let time = wait_at + 1 + 4 * task;
        events.push(Event::enter(1, time, RegionKind::ExplicitTask, 1000 + task));
        events.push(Event::enter(1, time + 1, RegionKind::Loop, 60));
        events.push(Event::leave(1, time + 2, RegionKind::Loop, 60));
        events.push(Event::leave(1, time + 3, RegionKind::ExplicitTask, 1000 + task));
    }
    events
}

fn bench_chunking(c: &mut Criterion) {
    let events = fork_join_trace(8, 1024);
    let mut group = c.benchmark_group("chunking");
    group.throughput(Throughput::Elements(events.len() as u64));
    group.bench_function("8_threads_1k_tasks", |b| {
        b.iter(|| {
            let count = chunks(black_box(events.clone())).count();
            black_box(count)
        });
    });
    group.finish();
}

fn bench_contraction(c: &mut Criterion) {
    let graphs: Vec<PartialGraph> = chunks(fork_join_trace(8, 1024))
        .filter_map(Result::ok)
        .filter_map(|chunk| build_chunk_graph(&chunk).ok())
        .map(|output| output.graph)
        .collect();
    let union = PartialGraph::disjoint_union(graphs);

    let mut group = c.benchmark_group("contraction");
    group.throughput(Throughput::Elements(union.vertex_count() as u64));
    group.bench_function("8_threads_1k_tasks", |b| {
        b.iter(|| contract(black_box(union.clone())));
    });
    group.finish();
}

fn bench_pipeline_scaling(c: &mut Criterion) {
    let config = GraphConfig::default();
    let mut group = c.benchmark_group("pipeline");
    for tasks in [64u64, 256, 1024, 4096] {
        let events = fork_join_trace(8, tasks);
        group.throughput(Throughput::Elements(events.len() as u64));
        group.bench_with_input(BenchmarkId::new("tasks", tasks), &events, |b, events| {
            b.iter(|| build_execution_graph(black_box(events.clone()), &config));
        });
    }
    group.finish();
}

fn bench_thread_scaling(c: &mut Criterion) {
    let config = GraphConfig::default();
    let mut group = c.benchmark_group("threads");
    for threads in [1u64, 4, 16, 64] {
        let events = fork_join_trace(threads, 512);
        group.bench_with_input(BenchmarkId::new("threads", threads), &events, |b, events| {
            b.iter(|| build_execution_graph(black_box(events.clone()), &config));
        });
    }
    group.finish();
}

fn bench_fan_in(c: &mut Criterion) {
    let config = GraphConfig::default();
    let mut group = c.benchmark_group("taskwait_fan_in");
    group.sample_size(10);
    for tasks in [1000u64, 4000, 16000] {
        let events = fan_in_trace(tasks);
        group.throughput(Throughput::Elements(events.len() as u64));
        group.bench_with_input(BenchmarkId::new("tasks", tasks), &events, |b, events| {
            b.iter(|| build_execution_graph(black_box(events.clone()), &config));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_chunking,
    bench_contraction,
    bench_pipeline_scaling,
    bench_thread_scaling,
    bench_fan_in
);

criterion_main!(benches);
