/*!
 * Pipe and Spawn Benchmarks
 *
 * Pipe round-trip cost by payload size, and spawn-to-reap latency
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use procpipe::{create_pipe, read, write_all, ProcessHandle, ReadOutcome};

fn bench_pipe_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipe_round_trip");

    for size in [64usize, 1024, 8 * 1024, 32 * 1024] {
        let payload = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            let pipe = create_pipe().unwrap();
            b.iter(|| {
                write_all(pipe.write_end, payload).unwrap();
                let mut remaining = payload.len();
                while remaining > 0 {
                    match read(pipe.read_end, remaining).unwrap() {
                        ReadOutcome::Data(bytes) => remaining -= black_box(bytes).len(),
                        other => panic!("unexpected read outcome: {:?}", other),
                    }
                }
            });
            pipe.close().unwrap();
        });
    }

    group.finish();
}

fn bench_spawn_and_wait(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn_and_wait");
    group.sample_size(20);

    for redirect in [false, true] {
        group.bench_with_input(
            BenchmarkId::from_parameter(if redirect { "redirected" } else { "inherited" }),
            &redirect,
            |b, &redirect| {
                b.iter(|| {
                    let mut child =
                        ProcessHandle::spawn("/bin/true", &["true"], None, redirect).unwrap();
                    black_box(child.wait_until_exit().unwrap());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_pipe_round_trip, bench_spawn_and_wait);
criterion_main!(benches);
