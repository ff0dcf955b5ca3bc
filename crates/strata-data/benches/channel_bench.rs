// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use std::thread;
use strata_core::CancellationToken;
use strata_data::{
    ring_channel, CapacityPolicy, DoubleBufferedQueue, RingOptions, SnapshotChannel,
    SnapshotOptions,
};

const BATCH: u64 = 10_000;

fn bench_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("Ring Channel");
    group.throughput(Throughput::Elements(BATCH));

    group.bench_function("single thread write/read", |b| {
        let (mut writer, mut reader) = ring_channel::<u64>(1024, RingOptions::default()).unwrap();
        b.iter(|| {
            for i in 0..BATCH {
                let mut item = i;
                while let Err(error) = writer.try_write(item) {
                    black_box(reader.drain().count());
                    item = error.into_inner();
                }
            }
            black_box(reader.drain().count());
        });
    });

    group.bench_function("cross thread", |b| {
        b.iter(|| {
            let (mut writer, mut reader) =
                ring_channel::<u64>(1024, RingOptions::default()).unwrap();
            let token = CancellationToken::new();
            let consumer = thread::spawn(move || {
                let mut received = 0;
                while received < BATCH {
                    if let Some(value) = reader.try_read() {
                        black_box(value);
                        received += 1;
                    }
                }
            });
            for i in 0..BATCH {
                let _ = writer.write(i, &token);
            }
            let _ = consumer.join();
        });
    });

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("Snapshot Channel");
    let channel = SnapshotChannel::<[f32; 16]>::new(SnapshotOptions::default()).unwrap();
    let mut publisher = channel.claim_publisher().unwrap();

    group.bench_function("publish", |b| {
        let mut frame = 0.0f32;
        b.iter(|| {
            frame += 1.0;
            publisher.publish(black_box([frame; 16]))
        });
    });

    group.bench_function("read", |b| b.iter(|| black_box(channel.read())));
    group.finish();
}

fn bench_double_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("Double Buffered Queue");
    group.throughput(Throughput::Elements(BATCH));

    group.bench_function("push and swap", |b| {
        let mut queue = DoubleBufferedQueue::with_capacity(1024, CapacityPolicy::Grow).unwrap();
        b.iter(|| {
            for i in 0..BATCH {
                queue.push(i);
            }
            black_box(queue.swap_and_read().len());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_ring, bench_snapshot, bench_double_buffer);
criterion_main!(benches);
