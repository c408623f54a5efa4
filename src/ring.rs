//! Ring storage and the send/receive algorithms for all three topologies.
//!
//! [`Core`] is the engine behind [`crate::Channel`]: it owns the buffer(s),
//! the atomic position counters, the waiter words, and the blocking
//! discipline. `Channel` and `Producer` are thin, mode-checked handles around
//! a shared `Core`.
//!
//! Spsc and Spmc share one physical buffer ([`SharedRing`]): a single
//! producer advances `tail`, and either a single consumer or several racing
//! consumers advance `head`. Mpsc cannot use one shared buffer with
//! independent per-producer tails — nothing would stop two producers from
//! claiming the same slot. Instead each registered producer owns a private
//! ring ([`ProducerSlot`]), sized to a fraction of the channel's configured
//! capacity so the total across all producers still honors the channel's
//! bound, and the consumer fans in across all of them. This is the same
//! decomposition the futex-backed MPSC channel in the broader pack uses; it
//! trades one buffer for P_max of them in exchange for actually being
//! correct.

use crate::invariants;
use crate::metrics::Metrics;
use crate::{Config, Mode, MetricsSnapshot};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};

/// Pads `T` out to a 64-byte cache line so that independent hot fields never
/// false-share. 64 bytes matches the common x86/ARM cache line size; the
/// broader pack leans on 128 bytes for a deeper prefetcher margin, but this
/// crate only has two cache-contended fields per ring (`head` and `tail`),
/// so one line each is enough.
#[repr(align(64))]
pub(crate) struct CacheAligned<T>(pub(crate) T);

impl<T> std::ops::Deref for CacheAligned<T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> std::ops::DerefMut for CacheAligned<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

fn make_buffer<T>(capacity: usize) -> Box<[UnsafeCell<MaybeUninit<T>>]> {
    let mut v = Vec::with_capacity(capacity);
    for _ in 0..capacity {
        v.push(UnsafeCell::new(MaybeUninit::uninit()));
    }
    v.into_boxed_slice()
}

/// One physically shared ring, backing Spsc and Spmc.
struct SharedRing<T> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: u64,
    /// Published by the consumer side (single consumer in Spsc, raced over
    /// by CAS in Spmc); read by the producer to compute free space.
    head: CacheAligned<AtomicU64>,
    /// Published by the single producer; read by the consumer(s).
    tail: CacheAligned<AtomicU64>,
    /// Producer-private: how far the producer has handed out in reservations
    /// that may not have committed yet. Always `>= tail`. Single-writer,
    /// single-reader (the producer only), so a plain cell is sound.
    reserve_cursor: UnsafeCell<u64>,
    /// Producer-private cache of the last head value it observed, to avoid
    /// re-loading the atomic on every reservation when there is obviously
    /// still room.
    cached_head: UnsafeCell<u64>,
}

unsafe impl<T: Send> Send for SharedRing<T> {}
unsafe impl<T: Send> Sync for SharedRing<T> {}

impl<T> SharedRing<T> {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: make_buffer(capacity),
            mask: capacity as u64 - 1,
            head: CacheAligned(AtomicU64::new(0)),
            tail: CacheAligned(AtomicU64::new(0)),
            reserve_cursor: UnsafeCell::new(0),
            cached_head: UnsafeCell::new(0),
        }
    }

    #[inline]
    fn slot(&self, seq: u64) -> *mut MaybeUninit<T> {
        self.buffer[(seq & self.mask) as usize].get()
    }

    /// Producer side: claims up to `n` contiguous slots. Never straddles the
    /// end of the buffer (a reservation that would wrap is truncated to the
    /// slots remaining before the wrap point), so the returned range is
    /// always a single contiguous slice. Returns `(start, count)`, or `None`
    /// if there is no room at all.
    fn reserve_batch(&self, n: usize) -> Option<(u64, usize)> {
        let capacity = self.mask + 1;
        // SAFETY: single producer, single writer of these cells.
        let cursor = unsafe { *self.reserve_cursor.get() };
        let mut head = unsafe { *self.cached_head.get() };
        if cursor.wrapping_sub(head) >= capacity {
            head = self.head.load(Ordering::Acquire);
            unsafe {
                *self.cached_head.get() = head;
            }
        }
        let space = capacity - (cursor - head);
        if space == 0 {
            return None;
        }
        let contiguous = capacity - (cursor & self.mask);
        let want = (n as u64).min(space).min(contiguous);
        if want == 0 {
            return None;
        }
        unsafe {
            *self.reserve_cursor.get() = cursor + want;
        }
        Some((cursor, want as usize))
    }

    /// Producer side: publishes `n` items starting at `start`, which must be
    /// the current `tail` (reservations are committed in order). `reserved`
    /// is how many slots the reservation originally claimed; any slots past
    /// `n` are abandoned and returned to the pool by rewinding
    /// `reserve_cursor` back to `start + n` (spec.md §4.4.3 "Abandoning a
    /// reservation... returns the slots to the pool implicitly").
    fn commit(&self, start: u64, n: usize, reserved: usize) {
        let old_tail = self.tail.load(Ordering::Relaxed);
        invariants::debug_assert_commit_matches_reserved!(n, reserved);
        let new_tail = start + n as u64;
        invariants::debug_assert_monotonic!("tail", old_tail, new_tail);
        invariants::debug_assert_no_wrap!("tail", old_tail, new_tail);
        if n < reserved {
            // SAFETY: single producer, single writer of this cell.
            unsafe {
                *self.reserve_cursor.get() = new_tail;
            }
        }
        self.tail.fetch_add(n as u64, Ordering::Release);
    }

    /// Single-consumer receive: claims and returns the next item, if any.
    fn try_receive_spsc(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        invariants::debug_assert_bounded_count!(tail - head, self.mask + 1);
        invariants::debug_assert_initialized_read!(head, head, tail);
        let item = unsafe { (*self.slot(head)).assume_init_read() };
        invariants::debug_assert_head_not_past_tail!(head + 1, tail);
        self.head.store(head + 1, Ordering::Release);
        Some(item)
    }

    fn try_receive_batch_spsc(&self, out: &mut Vec<T>, max: usize) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let available = (tail - head).min(max as u64);
        for i in 0..available {
            let item = unsafe { (*self.slot(head + i)).assume_init_read() };
            out.push(item);
        }
        if available > 0 {
            self.head.store(head + available, Ordering::Release);
        }
        available as usize
    }

    /// Multi-consumer receive: races other consumers for the next slot via
    /// CAS on `head`.
    fn try_receive_spmc(&self) -> Option<T> {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            if head == tail {
                return None;
            }
            match self.head.compare_exchange_weak(
                head,
                head + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let item = unsafe { (*self.slot(head)).assume_init_read() };
                    return Some(item);
                }
                Err(actual) => head = actual,
            }
        }
    }

    /// Drops any initialized-but-undrained items, used by `Drop`.
    fn drain_remaining(&mut self) {
        let head = *self.head.get_mut();
        let tail = *self.tail.get_mut();
        let mut pos = head;
        while pos != tail {
            unsafe {
                (*self.slot(pos)).assume_init_drop();
            }
            pos += 1;
        }
    }
}

/// One producer's private ring, used only in `Mode::Mpsc`.
struct ProducerSlot<T> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: u64,
    /// Producer-private: single writer (this producer only).
    tail_private: UnsafeCell<u64>,
    /// Published by the producer; read by the fan-in consumer.
    tail: CacheAligned<AtomicU64>,
    /// Published by the consumer; read by the producer to compute space.
    head: CacheAligned<AtomicU64>,
    /// Bumped by the producer every commit, so the consumer's fast path can
    /// tell "nothing changed here" from a cheap load without touching
    /// `tail` itself (the generation-cached min-tail scan).
    gen: CacheAligned<AtomicU64>,
    reserve_cursor: UnsafeCell<u64>,
    cached_head: UnsafeCell<u64>,
    active: AtomicBool,
}

unsafe impl<T: Send> Send for ProducerSlot<T> {}
unsafe impl<T: Send> Sync for ProducerSlot<T> {}

impl<T> ProducerSlot<T> {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: make_buffer(capacity),
            mask: capacity as u64 - 1,
            tail_private: UnsafeCell::new(0),
            tail: CacheAligned(AtomicU64::new(0)),
            head: CacheAligned(AtomicU64::new(0)),
            gen: CacheAligned(AtomicU64::new(0)),
            reserve_cursor: UnsafeCell::new(0),
            cached_head: UnsafeCell::new(0),
            active: AtomicBool::new(false),
        }
    }

    #[inline]
    fn slot(&self, seq: u64) -> *mut MaybeUninit<T> {
        self.buffer[(seq & self.mask) as usize].get()
    }

    fn reserve_batch(&self, n: usize) -> Option<(u64, usize)> {
        let capacity = self.mask + 1;
        let cursor = unsafe { *self.reserve_cursor.get() };
        let mut head = unsafe { *self.cached_head.get() };
        if cursor.wrapping_sub(head) >= capacity {
            head = self.head.load(Ordering::Acquire);
            unsafe {
                *self.cached_head.get() = head;
            }
        }
        let space = capacity - (cursor - head);
        if space == 0 {
            return None;
        }
        let contiguous = capacity - (cursor & self.mask);
        let want = (n as u64).min(space).min(contiguous);
        if want == 0 {
            return None;
        }
        unsafe {
            *self.reserve_cursor.get() = cursor + want;
        }
        Some((cursor, want as usize))
    }

    fn commit(&self, start: u64, n: usize, reserved: usize) {
        invariants::debug_assert_commit_matches_reserved!(n, reserved);
        let new_tail = start + n as u64;
        unsafe {
            *self.tail_private.get() = new_tail;
            if n < reserved {
                *self.reserve_cursor.get() = new_tail;
            }
        }
        self.tail.fetch_add(n as u64, Ordering::Release);
        self.gen.fetch_add(1, Ordering::Release);
    }

    fn drain_remaining(&mut self) {
        let head = *self.head.get_mut();
        let tail = *self.tail.get_mut();
        let mut pos = head;
        while pos != tail {
            unsafe {
                (*self.slot(pos)).assume_init_drop();
            }
            pos += 1;
        }
    }
}

/// Per-consumer cached view of one producer slot, used by the generation
/// scan. Not atomic: there is exactly one consumer in Mpsc, so this cache is
/// consumer-private.
struct SlotCache {
    cached_gen: u64,
    cached_tail: u64,
    /// The `head` value this slot had the last time the consumer advanced
    /// past it, so a later scan can assert genuine cross-call monotonicity
    /// (INV-CH-01) instead of comparing two values computed in the same
    /// statement.
    last_head: u64,
}

/// The fan-in side of `Mode::Mpsc`: a fixed table of producer slots plus the
/// bookkeeping to hand out producer ids.
struct Sharded<T> {
    slots: Box<[ProducerSlot<T>]>,
    /// Monotonically increasing: once an id is issued it is never handed
    /// out again, even after its producer unregisters (spec.md §7, "slot
    /// indices are assigned monotonically and are not reused within a
    /// single channel's lifetime"). `max_producers` therefore bounds the
    /// number of producers ever registered, not just the number
    /// concurrently active.
    next_id: AtomicUsize,
    active_producers: AtomicUsize,
    /// Consumer-private: one entry per slot, indexed the same way.
    scan_cache: UnsafeCell<Box<[SlotCache]>>,
    /// Consumer-private: rotates the scan's starting slot so a producer at
    /// a high index is never starved by one that always fires first.
    scan_rotor: UnsafeCell<usize>,
}

unsafe impl<T: Send> Send for Sharded<T> {}
unsafe impl<T: Send> Sync for Sharded<T> {}

impl<T> Sharded<T> {
    fn new(max_producers: usize, capacity: usize) -> Self {
        // Each producer gets its own private ring, so naively giving every
        // one of them the full `capacity` would let an Mpsc channel buffer
        // `max_producers * capacity` items instead of `capacity` (spec.md §3
        // "0 ≤ effective_tail - consumer_head ≤ C"). Split the configured
        // capacity across the slot table instead: `producers_pow2` rounds
        // `max_producers` up to a power of two so the shift stays exact, and
        // shifting a power-of-two `capacity` right by that many bits always
        // yields another power of two (or the floor of 1), so per-producer
        // masking still works.
        let producers_pow2 = max_producers.next_power_of_two();
        let shift = producers_pow2.trailing_zeros();
        let per_producer_capacity = (capacity >> shift).max(1);

        let mut slots = Vec::with_capacity(max_producers);
        let mut cache = Vec::with_capacity(max_producers);
        for _ in 0..max_producers {
            slots.push(ProducerSlot::new(per_producer_capacity));
            cache.push(SlotCache {
                cached_gen: 0,
                cached_tail: 0,
                last_head: 0,
            });
        }
        Self {
            slots: slots.into_boxed_slice(),
            next_id: AtomicUsize::new(0),
            active_producers: AtomicUsize::new(0),
            scan_cache: UnsafeCell::new(cache.into_boxed_slice()),
            scan_rotor: UnsafeCell::new(0),
        }
    }

    fn register(&self) -> Option<usize> {
        let id = self.next_id.fetch_add(1, Ordering::AcqRel);
        if id >= self.slots.len() {
            // Already handed out every id this channel will ever issue;
            // give back the slot we just (over-)claimed so the counter
            // doesn't keep climbing forever under repeated failed attempts.
            self.next_id.fetch_sub(1, Ordering::AcqRel);
            return None;
        }
        let slot = &self.slots[id];
        slot.tail.store(0, Ordering::Relaxed);
        slot.head.store(0, Ordering::Relaxed);
        slot.gen.store(0, Ordering::Relaxed);
        unsafe {
            *slot.tail_private.get() = 0;
            *slot.reserve_cursor.get() = 0;
            *slot.cached_head.get() = 0;
        }
        slot.active.store(true, Ordering::Release);
        self.active_producers.fetch_add(1, Ordering::AcqRel);
        Some(id)
    }

    fn unregister(&self, id: usize) {
        self.slots[id].active.store(false, Ordering::Release);
        self.active_producers.fetch_sub(1, Ordering::AcqRel);
    }

    /// Fan-in receive: scans every slot, not only the ones currently marked
    /// `active` — a producer that unregisters while it still has undrained
    /// items must not have those items starved for as long as any other
    /// producer stays active. Uses the generation cache to skip an atomic
    /// `tail` load when a slot provably has not changed since it was last
    /// visited.
    fn try_receive(&self) -> Option<T> {
        let n = self.slots.len();
        if n == 0 {
            return None;
        }
        let cache = unsafe { &mut *self.scan_cache.get() };
        let start = unsafe { *self.scan_rotor.get() } % n;
        for offset in 0..n {
            let idx = (start + offset) % n;
            let slot = &self.slots[idx];
            let entry = &mut cache[idx];

            let current_gen = slot.gen.load(Ordering::Acquire);
            if current_gen != entry.cached_gen {
                entry.cached_tail = slot.tail.load(Ordering::Acquire);
                entry.cached_gen = current_gen;
            }
            let head = slot.head.load(Ordering::Relaxed);
            if entry.cached_tail == head {
                continue;
            }
            invariants::debug_assert_initialized_read!(head, head, entry.cached_tail);
            invariants::debug_assert_fifo_count!(idx, entry.last_head, head);
            let item = unsafe { (*slot.slot(head)).assume_init_read() };
            slot.head.store(head + 1, Ordering::Release);
            entry.last_head = head + 1;
            unsafe {
                *self.scan_rotor.get() = idx + 1;
            }
            return Some(item);
        }
        None
    }

    fn try_receive_batch(&self, out: &mut Vec<T>, max: usize) -> usize {
        let mut taken = 0;
        while taken < max {
            match self.try_receive() {
                Some(item) => {
                    out.push(item);
                    taken += 1;
                }
                None => break,
            }
        }
        taken
    }

    fn drain_remaining(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.drain_remaining();
        }
    }
}

enum Storage<T> {
    Shared(SharedRing<T>),
    Sharded(Sharded<T>),
}

impl<T> Storage<T> {
    #[inline]
    fn shared(&self) -> &SharedRing<T> {
        match self {
            Storage::Shared(r) => r,
            Storage::Sharded(_) => unreachable!("channel mode mismatch: expected Spsc/Spmc"),
        }
    }

    #[inline]
    fn sharded(&self) -> &Sharded<T> {
        match self {
            Storage::Sharded(s) => s,
            Storage::Shared(_) => unreachable!("channel mode mismatch: expected Mpsc"),
        }
    }
}

/// Where a [`crate::Reservation`] sends its data on commit.
pub(crate) enum CommitTarget<'a, T> {
    Shared(&'a SharedRing<T>, u64),
    Producer(&'a ProducerSlot<T>, u64),
}

impl<'a, T> CommitTarget<'a, T> {
    pub(crate) fn commit(&self, n: usize, reserved: usize) {
        match self {
            CommitTarget::Shared(ring, start) => ring.commit(*start, n, reserved),
            CommitTarget::Producer(slot, start) => slot.commit(*start, n, reserved),
        }
    }
}

enum Attempt<R> {
    Got(R),
    Retry,
    Done,
}

/// The shared engine behind [`crate::Channel`] and [`crate::Producer`].
pub struct Core<T> {
    config: Config,
    closed: AtomicBool,
    producer_waiters: AtomicU32,
    consumer_waiters: AtomicU32,
    metrics: Metrics,
    storage: Storage<T>,
}

unsafe impl<T: Send> Send for Core<T> {}
unsafe impl<T: Send> Sync for Core<T> {}

impl<T> Core<T> {
    pub(crate) fn new(config: Config) -> Self {
        let storage = match config.mode() {
            Mode::Spsc | Mode::Spmc => Storage::Shared(SharedRing::new(config.capacity())),
            Mode::Mpsc { max_producers } => {
                Storage::Sharded(Sharded::new(max_producers, config.capacity()))
            }
        };
        Self {
            config,
            closed: AtomicBool::new(false),
            producer_waiters: AtomicU32::new(0),
            consumer_waiters: AtomicU32::new(0),
            metrics: Metrics::new(),
            storage,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.config.capacity()
    }

    #[inline]
    pub(crate) fn mode(&self) -> Mode {
        self.config.mode()
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.wake_producers_if_waiting();
        self.wake_consumers_if_waiting();
    }

    pub(crate) fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.config.metrics_enabled())
    }

    fn wake_producers_if_waiting(&self) {
        if self.producer_waiters.swap(0, Ordering::AcqRel) != 0 {
            crate::park::wake_all(&self.producer_waiters);
        }
    }

    fn wake_consumers_if_waiting(&self) {
        if self.consumer_waiters.swap(0, Ordering::AcqRel) != 0 {
            crate::park::wake_all(&self.consumer_waiters);
        }
    }

    /// Generic blocking loop shared by every blocking send/receive variant:
    /// spin-backoff first, then register as a waiter and park, retrying
    /// `attempt` until it returns [`Attempt::Got`] or [`Attempt::Done`]
    /// (channel closed and nothing left to do).
    fn block_until<R>(
        &self,
        waiters: &AtomicU32,
        on_park: impl Fn(),
        mut attempt: impl FnMut() -> Attempt<R>,
    ) -> Option<R> {
        let mut backoff = crate::Backoff::new();
        loop {
            match attempt() {
                Attempt::Got(r) => return Some(r),
                Attempt::Done => return None,
                Attempt::Retry => {}
            }
            if !backoff.should_park() {
                backoff.spin();
                continue;
            }
            let word = waiters.fetch_add(1, Ordering::AcqRel) + 1;
            match attempt() {
                Attempt::Got(r) => {
                    waiters.fetch_sub(1, Ordering::AcqRel);
                    return Some(r);
                }
                Attempt::Done => {
                    waiters.fetch_sub(1, Ordering::AcqRel);
                    return None;
                }
                Attempt::Retry => {}
            }
            on_park();
            crate::park::wait(waiters, word);
            waiters.fetch_sub(1, Ordering::AcqRel);
            backoff.reset();
        }
    }

    // ---- Spsc / Spmc: single shared ring -------------------------------

    pub(crate) fn reserve_batch_shared(
        &self,
        n: usize,
    ) -> Option<(CommitTarget<'_, T>, u64, usize)> {
        let ring = self.storage.shared();
        let (start, count) = ring.reserve_batch(n)?;
        Some((CommitTarget::Shared(ring, start), start, count))
    }

    pub(crate) fn slot_ptr_shared(&self, seq: u64) -> *mut MaybeUninit<T> {
        self.storage.shared().slot(seq)
    }

    pub(crate) fn try_send_shared(&self, item: T) -> Result<(), T> {
        if self.is_closed() {
            return Err(item);
        }
        let ring = self.storage.shared();
        match ring.reserve_batch(1) {
            Some((start, _)) => {
                unsafe {
                    (*ring.slot(start)).write(item);
                }
                ring.commit(start, 1, 1);
                self.metrics.on_send(self.config.metrics_enabled(), 1);
                self.wake_consumers_if_waiting();
                Ok(())
            }
            None => Err(item),
        }
    }

    pub(crate) fn send_shared(&self, item: T) -> bool {
        let mut slot = Some(item);
        let sent = self.block_until(
            &self.producer_waiters,
            || self.metrics.on_producer_park(self.config.metrics_enabled()),
            || {
                if self.is_closed() {
                    return Attempt::Done;
                }
                let value = slot.take().expect("send retries exactly once per loop");
                match self.try_send_shared(value) {
                    Ok(()) => Attempt::Got(()),
                    Err(rejected) => {
                        slot = Some(rejected);
                        Attempt::Retry
                    }
                }
            },
        );
        sent.is_some()
    }

    pub(crate) fn try_send_batch_shared(&self, items: &mut dyn Iterator<Item = T>) -> usize {
        if self.is_closed() {
            return 0;
        }
        let ring = self.storage.shared();
        let mut sent = 0;
        loop {
            let Some((start, count)) = ring.reserve_batch(usize::MAX) else {
                break;
            };
            let mut written = 0;
            for i in 0..count {
                match items.next() {
                    Some(item) => {
                        unsafe {
                            (*ring.slot(start + i as u64)).write(item);
                        }
                        written += 1;
                    }
                    None => break,
                }
            }
            ring.commit(start, written, count);
            sent += written;
            if written < count {
                break;
            }
        }
        if sent > 0 {
            self.metrics
                .on_send_batch(self.config.metrics_enabled(), sent as u64);
            self.wake_consumers_if_waiting();
        }
        sent
    }

    pub(crate) fn try_receive_shared(&self) -> Option<T> {
        let ring = self.storage.shared();
        let item = match self.config.mode() {
            Mode::Spmc => ring.try_receive_spmc(),
            _ => ring.try_receive_spsc(),
        };
        if item.is_some() {
            self.metrics.on_receive(self.config.metrics_enabled(), 1);
            self.wake_producers_if_waiting();
        }
        item
    }

    pub(crate) fn receive_shared(&self) -> Option<T> {
        self.block_until(
            &self.consumer_waiters,
            || self.metrics.on_consumer_park(self.config.metrics_enabled()),
            || match self.try_receive_shared() {
                Some(item) => Attempt::Got(item),
                None if self.is_closed() => Attempt::Done,
                None => Attempt::Retry,
            },
        )
    }

    pub(crate) fn try_receive_batch_shared(&self, max: usize) -> Vec<T> {
        let ring = self.storage.shared();
        let mut out = Vec::with_capacity(max.min(self.capacity()));
        let n = match self.config.mode() {
            Mode::Spmc => {
                let mut taken = 0;
                while taken < max {
                    match ring.try_receive_spmc() {
                        Some(item) => {
                            out.push(item);
                            taken += 1;
                        }
                        None => break,
                    }
                }
                taken
            }
            _ => ring.try_receive_batch_spsc(&mut out, max),
        };
        if n > 0 {
            self.metrics
                .on_receive_batch(self.config.metrics_enabled(), n as u64);
            self.wake_producers_if_waiting();
        }
        out
    }

    // ---- Mpsc: sharded rings --------------------------------------------

    pub(crate) fn register_producer(&self) -> Option<usize> {
        self.storage.sharded().register()
    }

    pub(crate) fn unregister_producer(&self, id: usize) {
        self.storage.sharded().unregister(id);
        self.wake_consumers_if_waiting();
    }

    pub(crate) fn reserve_batch_mpsc(
        &self,
        producer_id: usize,
        n: usize,
    ) -> Option<(CommitTarget<'_, T>, u64, usize)> {
        let slot = &self.storage.sharded().slots[producer_id];
        let (start, count) = slot.reserve_batch(n)?;
        Some((CommitTarget::Producer(slot, start), start, count))
    }

    pub(crate) fn slot_ptr_mpsc(&self, producer_id: usize, seq: u64) -> *mut MaybeUninit<T> {
        self.storage.sharded().slots[producer_id].slot(seq)
    }

    pub(crate) fn try_send_mpsc(&self, producer_id: usize, item: T) -> Result<(), T> {
        if self.is_closed() {
            return Err(item);
        }
        let slot = &self.storage.sharded().slots[producer_id];
        match slot.reserve_batch(1) {
            Some((start, _)) => {
                unsafe {
                    (*slot.slot(start)).write(item);
                }
                slot.commit(start, 1, 1);
                self.metrics.on_send(self.config.metrics_enabled(), 1);
                self.wake_consumers_if_waiting();
                Ok(())
            }
            None => Err(item),
        }
    }

    pub(crate) fn send_mpsc(&self, producer_id: usize, item: T) -> bool {
        let mut slot_item = Some(item);
        let sent = self.block_until(
            &self.producer_waiters,
            || self.metrics.on_producer_park(self.config.metrics_enabled()),
            || {
                if self.is_closed() {
                    return Attempt::Done;
                }
                let value = slot_item
                    .take()
                    .expect("send retries exactly once per loop");
                match self.try_send_mpsc(producer_id, value) {
                    Ok(()) => Attempt::Got(()),
                    Err(rejected) => {
                        slot_item = Some(rejected);
                        Attempt::Retry
                    }
                }
            },
        );
        sent.is_some()
    }

    pub(crate) fn try_send_batch_mpsc(
        &self,
        producer_id: usize,
        items: &mut dyn Iterator<Item = T>,
    ) -> usize {
        if self.is_closed() {
            return 0;
        }
        let slot = &self.storage.sharded().slots[producer_id];
        let mut sent = 0;
        loop {
            let Some((start, count)) = slot.reserve_batch(usize::MAX) else {
                break;
            };
            let mut written = 0;
            for i in 0..count {
                match items.next() {
                    Some(item) => {
                        unsafe {
                            (*slot.slot(start + i as u64)).write(item);
                        }
                        written += 1;
                    }
                    None => break,
                }
            }
            slot.commit(start, written, count);
            sent += written;
            if written < count {
                break;
            }
        }
        if sent > 0 {
            self.metrics
                .on_send_batch(self.config.metrics_enabled(), sent as u64);
            self.wake_consumers_if_waiting();
        }
        sent
    }

    pub(crate) fn try_receive_mpsc(&self) -> Option<T> {
        let item = self.storage.sharded().try_receive();
        if item.is_some() {
            self.metrics.on_receive(self.config.metrics_enabled(), 1);
            self.wake_producers_if_waiting();
        }
        item
    }

    pub(crate) fn receive_mpsc(&self) -> Option<T> {
        self.block_until(
            &self.consumer_waiters,
            || self.metrics.on_consumer_park(self.config.metrics_enabled()),
            || match self.try_receive_mpsc() {
                Some(item) => Attempt::Got(item),
                // Authoritative termination (spec.md §8): once every
                // producer has unregistered, a second fan-in pass can't
                // observe anything new arriving, so an empty result here is
                // final — no need to also wait for `close`.
                None if self
                    .storage
                    .sharded()
                    .active_producers
                    .load(Ordering::Acquire)
                    == 0 =>
                {
                    Attempt::Done
                }
                None => Attempt::Retry,
            },
        )
    }

    pub(crate) fn try_receive_batch_mpsc(&self, max: usize) -> Vec<T> {
        let mut out = Vec::with_capacity(max.min(self.capacity()));
        let n = self.storage.sharded().try_receive_batch(&mut out, max);
        if n > 0 {
            self.metrics
                .on_receive_batch(self.config.metrics_enabled(), n as u64);
            self.wake_producers_if_waiting();
        }
        out
    }
}

impl<T> Drop for Core<T> {
    fn drop(&mut self) {
        match &mut self.storage {
            Storage::Shared(ring) => ring.drain_remaining(),
            Storage::Sharded(sharded) => sharded.drain_remaining(),
        }
    }
}
