//! Drives all three topologies back to back and reports aggregate
//! throughput, mirroring the teacher's own `examples/basic.rs` walkthrough.

use ringchannel::{Channel, Config, Mode};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const N_PRODUCERS: usize = 4;
const ITEMS_PER_PRODUCER: usize = 200_000;

fn run_mpsc() {
    println!("--- Mpsc: {N_PRODUCERS} producers, 1 consumer ---");
    let channel = Arc::new(Channel::<u64>::new(
        Config::new(
            1 << 14,
            Mode::Mpsc {
                max_producers: N_PRODUCERS,
            },
            false,
        )
        .unwrap(),
    ));

    let start = Instant::now();
    let mut handles = Vec::new();
    for id in 0..N_PRODUCERS {
        let ch = Arc::clone(&channel);
        handles.push(thread::spawn(move || {
            let producer = ch.register_producer().unwrap();
            for i in 0..ITEMS_PER_PRODUCER {
                while !producer.send((id * ITEMS_PER_PRODUCER + i) as u64) {
                    thread::yield_now();
                }
            }
        }));
    }

    let consumer_channel = Arc::clone(&channel);
    let consumer = thread::spawn(move || {
        let mut total = 0usize;
        let mut sum = 0u64;
        while total < N_PRODUCERS * ITEMS_PER_PRODUCER {
            match consumer_channel.receive() {
                Some(item) => {
                    sum += item;
                    total += 1;
                }
                None => break,
            }
        }
        (total, sum)
    });

    for handle in handles {
        handle.join().unwrap();
    }
    let (total, sum) = consumer.join().unwrap();
    let elapsed = start.elapsed();
    println!("  delivered {total} items, sum {sum}, in {elapsed:?}");
}

fn run_spmc() {
    const N_CONSUMERS: usize = 4;
    println!("--- Spmc: 1 producer, {N_CONSUMERS} consumers ---");
    let channel = Arc::new(Channel::<u64>::new(Config::new(1 << 14, Mode::Spmc, false).unwrap()));

    let producer_channel = Arc::clone(&channel);
    let producer = thread::spawn(move || {
        for i in 0..(ITEMS_PER_PRODUCER * N_PRODUCERS) as u64 {
            while !producer_channel.send(i) {
                thread::yield_now();
            }
        }
        producer_channel.close();
    });

    let mut handles = Vec::new();
    for _ in 0..N_CONSUMERS {
        let ch = Arc::clone(&channel);
        handles.push(thread::spawn(move || {
            let mut count = 0u64;
            while ch.receive().is_some() {
                count += 1;
            }
            count
        }));
    }

    producer.join().unwrap();
    let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    println!("  {N_CONSUMERS} consumers split {total} items");
}

fn main() {
    println!("ringchannel demo\n");
    run_mpsc();
    run_spmc();
}
