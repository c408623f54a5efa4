use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ringchannel::{Channel, Config, Mode};
use std::sync::Arc;
use std::thread;

const MSG_PER_PRODUCER: u64 = 1_000_000;
const BATCH_SIZE: usize = 4096;

fn bench_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    group.throughput(Throughput::Elements(MSG_PER_PRODUCER));

    group.bench_function("reserve_commit", |b| {
        b.iter(|| {
            let channel = Arc::new(Channel::<u32>::new(
                Config::new(1 << 16, Mode::Spsc, false).unwrap(),
            ));

            let ch = Arc::clone(&channel);
            let producer = thread::spawn(move || {
                let mut sent = 0u64;
                while sent < MSG_PER_PRODUCER {
                    let want = BATCH_SIZE.min((MSG_PER_PRODUCER - sent) as usize);
                    if let Some(mut r) = ch.reserve_batch(want) {
                        let len = r.len();
                        for (i, slot) in r.as_mut_slice().iter_mut().enumerate() {
                            slot.write((sent + i as u64) as u32);
                        }
                        r.commit();
                        sent += len as u64;
                    } else {
                        std::hint::spin_loop();
                    }
                }
            });

            let mut received = 0u64;
            while received < MSG_PER_PRODUCER {
                let batch = channel.try_receive_batch(BATCH_SIZE);
                if batch.is_empty() {
                    std::hint::spin_loop();
                } else {
                    received += batch.len() as u64;
                    for item in batch {
                        black_box(item);
                    }
                }
            }

            producer.join().unwrap();
        });
    });

    group.finish();
}

fn bench_mpsc_fan_in(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpsc");

    for num_producers in [2usize, 4, 8] {
        let total = MSG_PER_PRODUCER * num_producers as u64;
        group.throughput(Throughput::Elements(total));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{num_producers}P_1C")),
            &num_producers,
            |b, &n| {
                b.iter(|| {
                    let channel = Arc::new(Channel::<u32>::new(
                        Config::new(
                            1 << 14,
                            Mode::Mpsc {
                                max_producers: n,
                            },
                            false,
                        )
                        .unwrap(),
                    ));

                    let producers: Vec<_> = (0..n)
                        .map(|_| channel.register_producer().unwrap())
                        .collect();
                    let handles: Vec<_> = producers
                        .into_iter()
                        .map(|producer| {
                            thread::spawn(move || {
                                let mut sent = 0u64;
                                while sent < MSG_PER_PRODUCER {
                                    let want =
                                        BATCH_SIZE.min((MSG_PER_PRODUCER - sent) as usize);
                                    if let Some(mut r) = producer.reserve_batch(want) {
                                        let len = r.len();
                                        for (i, slot) in
                                            r.as_mut_slice().iter_mut().enumerate()
                                        {
                                            slot.write((sent + i as u64) as u32);
                                        }
                                        r.commit();
                                        sent += len as u64;
                                    } else {
                                        std::hint::spin_loop();
                                    }
                                }
                            })
                        })
                        .collect();

                    let target = MSG_PER_PRODUCER * n as u64;
                    let mut received = 0u64;
                    while received < target {
                        let batch = channel.try_receive_batch(BATCH_SIZE);
                        if batch.is_empty() {
                            std::hint::spin_loop();
                        } else {
                            received += batch.len() as u64;
                            for item in batch {
                                black_box(item);
                            }
                        }
                    }

                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_batch_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_sizes");
    group.throughput(Throughput::Elements(MSG_PER_PRODUCER));

    for batch_size in [256usize, 1024, 4096, 16384] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("batch_{batch_size}")),
            &batch_size,
            |b, &batch| {
                b.iter(|| {
                    let channel = Arc::new(Channel::<u32>::new(
                        Config::new(1 << 16, Mode::Spsc, false).unwrap(),
                    ));

                    let ch = Arc::clone(&channel);
                    let producer = thread::spawn(move || {
                        let mut sent = 0u64;
                        while sent < MSG_PER_PRODUCER {
                            let want = batch.min((MSG_PER_PRODUCER - sent) as usize);
                            if let Some(mut r) = ch.reserve_batch(want) {
                                let len = r.len();
                                for (i, slot) in r.as_mut_slice().iter_mut().enumerate() {
                                    slot.write((sent + i as u64) as u32);
                                }
                                r.commit();
                                sent += len as u64;
                            } else {
                                std::hint::spin_loop();
                            }
                        }
                    });

                    let mut received = 0u64;
                    while received < MSG_PER_PRODUCER {
                        let out = channel.try_receive_batch(batch);
                        if out.is_empty() {
                            std::hint::spin_loop();
                        } else {
                            received += out.len() as u64;
                            for item in out {
                                black_box(item);
                            }
                        }
                    }

                    producer.join().unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_spmc_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("spmc");

    for num_consumers in [2usize, 4, 8] {
        let msgs = 200_000u64;
        group.throughput(Throughput::Elements(msgs));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("1P_{num_consumers}C")),
            &num_consumers,
            |b, &n| {
                b.iter(|| {
                    let channel = Arc::new(Channel::<u32>::new(
                        Config::new(1 << 12, Mode::Spmc, false).unwrap(),
                    ));

                    let ch = Arc::clone(&channel);
                    let producer = thread::spawn(move || {
                        for i in 0..msgs {
                            while ch.try_send(i as u32).is_err() {
                                std::hint::spin_loop();
                            }
                        }
                        ch.close();
                    });

                    let consumers: Vec<_> = (0..n)
                        .map(|_| {
                            let ch = Arc::clone(&channel);
                            thread::spawn(move || {
                                let mut count = 0u64;
                                while let Some(item) = ch.receive() {
                                    black_box(item);
                                    count += 1;
                                }
                                count
                            })
                        })
                        .collect();

                    producer.join().unwrap();
                    let total: u64 = consumers.into_iter().map(|h| h.join().unwrap()).sum();
                    assert_eq!(total, msgs);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_spsc,
    bench_mpsc_fan_in,
    bench_batch_sizes,
    bench_spmc_contention
);
criterion_main!(benches);
