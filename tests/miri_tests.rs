//! Miri-compatible tests exercising the crate's unsafe code paths.
//!
//! Run with: `cargo +nightly miri test --test miri_tests`
//!
//! Miri catches uninitialized-memory reads, out-of-bounds slot access,
//! use-after-free, and misaligned pointer dereferences in the `unsafe`
//! blocks behind `reserve_batch`/`commit`, the raw slot pointers, and the
//! consumer's `assume_init_read` calls.

use ringchannel::{Channel, Config, Mode};
use std::mem::MaybeUninit;

#[test]
fn miri_reserve_commit_then_drain() {
    let channel = Channel::<u64>::new(Config::new(4, Mode::Spsc, false).unwrap());
    let mut reservation = channel.reserve_batch(2).expect("room for 2");
    let slice = reservation.as_mut_slice();
    slice[0] = MaybeUninit::new(100);
    slice[1] = MaybeUninit::new(200);
    reservation.commit();

    let mut sum = 0u64;
    while let Some(item) = channel.try_receive() {
        sum += item;
    }
    assert_eq!(sum, 300);
}

#[test]
fn miri_wrap_around_across_multiple_fill_drain_cycles() {
    let channel = Channel::<u32>::new(Config::new(4, Mode::Spsc, false).unwrap());
    for round in 0..3u32 {
        for i in 0..4u32 {
            assert!(channel.try_send(round * 10 + i).is_ok());
        }
        let drained = channel.try_receive_batch(4);
        assert_eq!(drained.len(), 4);
    }
}

#[test]
fn miri_reservation_truncates_at_the_wrap_point() {
    let channel = Channel::<u64>::new(Config::new(4, Mode::Spsc, false).unwrap());
    for i in 0..3 {
        assert!(channel.try_send(i).is_ok());
    }
    let drained = channel.try_receive_batch(2);
    assert_eq!(drained.len(), 2);

    // head=2, tail=3, capacity=4: reserving 3 must truncate at the wrap
    // point rather than read/write past the buffer's end.
    if let Some(mut reservation) = channel.reserve_batch(3) {
        let len = reservation.len();
        assert!(len <= 3, "expected a truncated reservation, got {len}");
        for slot in reservation.as_mut_slice().iter_mut() {
            slot.write(999);
        }
        reservation.commit();
    }
}

#[test]
fn miri_mpsc_multi_producer_fan_in() {
    // Capacity is split across the 4 producer slots (spec.md §3's global
    // bound), so this needs more than 4 total to give each producer room
    // for 2 outstanding sends.
    let channel = Channel::<u64>::new(
        Config::new(16, Mode::Mpsc { max_producers: 4 }, false).unwrap(),
    );
    let p1 = channel.register_producer().unwrap();
    let p2 = channel.register_producer().unwrap();

    assert!(p1.try_send(1).is_ok());
    assert!(p1.try_send(2).is_ok());
    assert!(p2.try_send(10).is_ok());
    assert!(p2.try_send(20).is_ok());

    let mut sum = 0u64;
    while let Some(item) = channel.try_receive() {
        sum += item;
    }
    assert_eq!(sum, 33);
}

#[test]
fn miri_drop_with_unconsumed_items_runs_destructors() {
    let channel = Channel::<String>::new(Config::new(4, Mode::Spsc, false).unwrap());
    {
        let mut reservation = channel.reserve_batch(2).expect("room for 2");
        let slice = reservation.as_mut_slice();
        slice[0] = MaybeUninit::new(String::from("hello"));
        slice[1] = MaybeUninit::new(String::from("world"));
        reservation.commit();
    }

    let first = channel.try_receive();
    assert_eq!(first, Some(String::from("hello")));
    // `channel` drops here with one unconsumed String still in the ring;
    // Core::drop must run its destructor exactly once.
}

#[test]
fn miri_reservation_dropped_without_commit_publishes_nothing() {
    let channel = Channel::<u64>::new(Config::new(4, Mode::Spsc, false).unwrap());
    {
        let reservation = channel.reserve_batch(2);
        assert!(reservation.is_some());
        // Dropped here without calling commit().
    }
    assert_eq!(channel.try_receive(), None);
}

#[test]
fn miri_receive_batch_boundary_conditions() {
    let channel = Channel::<u64>::new(Config::new(4, Mode::Spsc, false).unwrap());
    for i in 0..3 {
        assert!(channel.try_send(i).is_ok());
    }

    assert_eq!(channel.try_receive_batch(0), Vec::<u64>::new());

    let drained = channel.try_receive_batch(100);
    assert_eq!(drained, vec![0, 1, 2]);
}
