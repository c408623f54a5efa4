//! Property tests for the quantified invariants in spec.md §8.
//!
//! These exercise the public `Channel<T>` API directly (not the internal
//! `ring::Core`), since that API is what every one of spec.md §8's
//! properties is actually phrased against.

use proptest::prelude::*;
use ringchannel::{Channel, Config, Mode};

/// INV: `0 <= effective_tail - consumer_head <= C` for all observed
/// snapshots. We can't observe the internal counters directly from outside
/// the crate, so we check the externally-visible corollary: the channel
/// never accepts more than `capacity` undrained items, and it never
/// delivers an item it wasn't sent.
fn bounded_count_holds<const CAP: usize>(writes: usize, reads: usize) {
    let channel = Channel::<u64>::new(Config::new(CAP, Mode::Spsc, false).unwrap());
    let capacity = channel.capacity();

    let mut accepted = 0usize;
    for i in 0..writes {
        if channel.try_send(i as u64).is_ok() {
            accepted += 1;
        }
    }
    assert!(accepted <= capacity);

    let drained = channel.try_receive_batch(reads);
    assert!(drained.len() <= accepted);
    assert!(drained.len() <= reads);
}

proptest! {
    #[test]
    fn prop_bounded_count(writes in 0usize..200, reads in 0usize..200) {
        bounded_count_holds::<64>(writes, reads);
    }
}

proptest! {
    /// Round-trip: for any input sequence, sending it on a single producer
    /// and draining yields the same sequence back (spec.md §8 "Round-trip").
    #[test]
    fn prop_round_trip_spsc(xs in prop::collection::vec(any::<u64>(), 0..300)) {
        let channel = Channel::<u64>::new(Config::new(32, Mode::Spsc, false).unwrap());
        let mut ys = Vec::with_capacity(xs.len());
        for &x in &xs {
            loop {
                if channel.try_send(x).is_ok() {
                    break;
                }
                ys.extend(channel.try_receive_batch(32));
            }
        }
        while ys.len() < xs.len() {
            let batch = channel.try_receive_batch(xs.len() - ys.len());
            prop_assert!(!batch.is_empty(), "drain stalled before all items arrived");
            ys.extend(batch);
        }
        prop_assert_eq!(xs, ys);
    }
}

proptest! {
    /// Round-trip through a single MPSC producer: per-producer FIFO means
    /// this must hold exactly like the SPSC case.
    #[test]
    fn prop_round_trip_single_producer_mpsc(xs in prop::collection::vec(any::<u64>(), 0..300)) {
        let channel = Channel::<u64>::new(
            Config::new(32, Mode::Mpsc { max_producers: 1 }, false).unwrap(),
        );
        let producer = channel.register_producer().unwrap();
        let mut ys = Vec::with_capacity(xs.len());
        for &x in &xs {
            loop {
                if producer.try_send(x).is_ok() {
                    break;
                }
                ys.extend(channel.try_receive_batch(32));
            }
        }
        while ys.len() < xs.len() {
            let batch = channel.try_receive_batch(xs.len() - ys.len());
            prop_assert!(!batch.is_empty(), "drain stalled before all items arrived");
            ys.extend(batch);
        }
        prop_assert_eq!(xs, ys);
    }
}

proptest! {
    /// `reserve_batch` never hands back more slots than were free, and
    /// never more than requested (spec.md §4.4.3, §8 "reserve_batch slots
    /// are exclusive").
    #[test]
    fn prop_reserve_batch_respects_request_and_capacity(
        request_size in 1usize..100,
        pre_fill in 0usize..50,
    ) {
        let channel = Channel::<u64>::new(Config::new(64, Mode::Spsc, false).unwrap());
        let capacity = channel.capacity();

        let actual_fill = pre_fill.min(capacity);
        for i in 0..actual_fill {
            let _ = channel.try_send(i as u64);
        }
        let available_before = capacity - actual_fill.min(capacity);

        if let Some(reservation) = channel.reserve_batch(request_size) {
            let got = reservation.len();
            prop_assert!(got <= request_size);
            prop_assert!(got <= available_before);
            prop_assert!(got > 0);
            // Dropping without commit abandons the reservation -- spec.md
            // §4.4.3 "abandoning a reservation... is permitted".
        }
    }
}

proptest! {
    /// A batch send never accepts more than `items.len()`, and never more
    /// than fits (spec.md §4.4.1, §8 scenario 5 "Batch overflow").
    #[test]
    fn prop_send_batch_truncates_to_available_room(
        n_items in 0usize..300,
        capacity_pow in 2usize..10usize,
    ) {
        let capacity = 1usize << capacity_pow;
        let channel = Channel::<u64>::new(Config::new(capacity, Mode::Spsc, false).unwrap());
        let items: Vec<u64> = (0..n_items as u64).collect();
        let accepted = channel.try_send_batch(items.clone());
        prop_assert!(accepted <= items.len());
        prop_assert!(accepted <= capacity);
        let drained = channel.try_receive_batch(accepted);
        prop_assert_eq!(drained, items[..accepted].to_vec());
    }
}

proptest! {
    /// Idempotent close: repeated `close()` calls never un-close the
    /// channel, and a closed empty channel always reports drained (spec.md
    /// §8 "Idempotent close").
    #[test]
    fn prop_close_is_idempotent(close_calls in 1usize..10) {
        let channel = Channel::<u64>::new(Config::new(16, Mode::Spsc, false).unwrap());
        for _ in 0..close_calls {
            channel.close();
        }
        prop_assert!(channel.is_closed());
        prop_assert_eq!(channel.try_receive(), None);
    }
}
