use crate::error::ChannelError;
use crate::ring::Core;
use crate::{Config, Mode, MetricsSnapshot, Reservation};
use std::sync::Arc;

/// A bounded, lock-free, in-process message channel.
///
/// `Channel` is the single-consumer handle: for `Mode::Spsc` and
/// `Mode::Spmc` it also sends directly; for `Mode::Mpsc` sending goes
/// through a registered [`Producer`] instead, obtained with
/// [`Channel::register_producer`].
pub struct Channel<T> {
    core: Arc<Core<T>>,
}

impl<T> Channel<T> {
    /// Creates a new channel from `config`.
    pub fn new(config: Config) -> Self {
        Self {
            core: Arc::new(Core::new(config)),
        }
    }

    /// Returns the channel's ring capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    /// Returns the channel's topology.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.core.mode()
    }

    /// Marks the channel closed: every blocked and future `send`/`receive`
    /// returns immediately once drained. Does not drop items already queued.
    pub fn close(&self) {
        self.core.close();
    }

    /// Returns true if [`Channel::close`] has been called.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// Returns a snapshot of this channel's counters (zeroed if the channel
    /// was created with metrics disabled).
    pub fn metrics(&self) -> MetricsSnapshot {
        self.core.metrics_snapshot()
    }

    /// Registers a new MPSC producer, returning a handle that sends through
    /// its own private slot.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::NotMpsc`] if this channel's mode is not `Mpsc`.
    /// - [`ChannelError::TooManyProducers`] if every slot up to
    ///   `max_producers` is already occupied by a live producer.
    /// - [`ChannelError::Closed`] if the channel has been closed.
    pub fn register_producer(&self) -> Result<Producer<T>, ChannelError> {
        let Mode::Mpsc { max_producers } = self.core.mode() else {
            return Err(ChannelError::NotMpsc);
        };
        if self.core.is_closed() {
            return Err(ChannelError::Closed);
        }
        match self.core.register_producer() {
            Some(id) => Ok(Producer {
                core: Arc::clone(&self.core),
                id,
            }),
            None => Err(ChannelError::TooManyProducers { max: max_producers }),
        }
    }

    /// Reserves up to `n` contiguous slots for zero-copy writes.
    ///
    /// Only valid on `Spsc`/`Spmc` channels; returns `None` if the ring is
    /// full. The returned reservation may hold fewer than `n` slots if the
    /// claim would wrap past the end of the buffer.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if called on an `Mpsc` channel — use
    /// [`Producer::reserve_batch`] instead.
    pub fn reserve_batch(&self, n: usize) -> Option<Reservation<'_, T>> {
        debug_assert!(
            !matches!(self.core.mode(), Mode::Mpsc { .. }),
            "reserve_batch is not valid on an Mpsc channel; use Producer::reserve_batch"
        );
        let (target, start, count) = self.core.reserve_batch_shared(n)?;
        let slice =
            unsafe { std::slice::from_raw_parts_mut(self.core.slot_ptr_shared(start), count) };
        Some(Reservation::new(slice, target))
    }

    /// Sends a single item without blocking. Returns `Err(item)` if the ring
    /// is full (the item is handed back, not dropped).
    pub fn try_send(&self, item: T) -> Result<(), T> {
        debug_assert!(
            !matches!(self.core.mode(), Mode::Mpsc { .. }),
            "try_send is not valid on an Mpsc channel; use Producer::try_send"
        );
        self.core.try_send_shared(item)
    }

    /// Sends a single item, blocking (spin, then park) until there is room
    /// or the channel closes. Returns `false` if the channel closed first.
    pub fn send(&self, item: T) -> bool {
        debug_assert!(
            !matches!(self.core.mode(), Mode::Mpsc { .. }),
            "send is not valid on an Mpsc channel; use Producer::send"
        );
        self.core.send_shared(item)
    }

    /// Sends as many of `items` as fit without blocking, returning the
    /// number actually enqueued.
    pub fn try_send_batch(&self, items: impl IntoIterator<Item = T>) -> usize {
        debug_assert!(
            !matches!(self.core.mode(), Mode::Mpsc { .. }),
            "try_send_batch is not valid on an Mpsc channel; use Producer::try_send_batch"
        );
        self.core
            .try_send_batch_shared(&mut items.into_iter())
    }

    /// Sends all of `items`, blocking between chunks as needed. Returns the
    /// number actually enqueued (fewer than `items.len()` only if the
    /// channel closed partway through).
    pub fn send_batch(&self, items: impl IntoIterator<Item = T>) -> usize {
        debug_assert!(
            !matches!(self.core.mode(), Mode::Mpsc { .. }),
            "send_batch is not valid on an Mpsc channel; use Producer::send_batch"
        );
        let mut sent = 0;
        for item in items {
            if !self.core.send_shared(item) {
                break;
            }
            sent += 1;
        }
        sent
    }

    /// Receives a single item without blocking.
    pub fn try_receive(&self) -> Option<T> {
        match self.core.mode() {
            Mode::Mpsc { .. } => self.core.try_receive_mpsc(),
            _ => self.core.try_receive_shared(),
        }
    }

    /// Receives a single item, blocking (spin, then park) until one is
    /// available. Returns `None` once the channel is closed and fully
    /// drained.
    pub fn receive(&self) -> Option<T> {
        match self.core.mode() {
            Mode::Mpsc { .. } => self.core.receive_mpsc(),
            _ => self.core.receive_shared(),
        }
    }

    /// Receives up to `max` items without blocking.
    pub fn try_receive_batch(&self, max: usize) -> Vec<T> {
        match self.core.mode() {
            Mode::Mpsc { .. } => self.core.try_receive_batch_mpsc(max),
            _ => self.core.try_receive_batch_shared(max),
        }
    }

    /// Receives up to `max` items, blocking until at least one is available
    /// (or the channel closes).
    pub fn receive_batch(&self, max: usize) -> Vec<T> {
        if max == 0 {
            return Vec::new();
        }
        let is_mpsc = matches!(self.core.mode(), Mode::Mpsc { .. });
        let Some(first) = (if is_mpsc {
            self.core.receive_mpsc()
        } else {
            self.core.receive_shared()
        }) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(max);
        out.push(first);
        if max > 1 {
            let rest = if is_mpsc {
                self.core.try_receive_batch_mpsc(max - 1)
            } else {
                self.core.try_receive_batch_shared(max - 1)
            };
            out.extend(rest);
        }
        out
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

unsafe impl<T: Send> Send for Channel<T> {}
unsafe impl<T: Send> Sync for Channel<T> {}

/// An MPSC producer handle, obtained from [`Channel::register_producer`].
///
/// Each producer owns a private ring slot, so producers never contend with
/// each other; they only ever contend with the single fan-in consumer.
/// Dropping a `Producer` unregisters it, waking the consumer so it stops
/// waiting on a slot that will never fill again.
pub struct Producer<T> {
    core: Arc<Core<T>>,
    id: usize,
}

impl<T> Producer<T> {
    /// Returns this producer's slot id.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Reserves up to `n` contiguous slots in this producer's own ring for
    /// zero-copy writes.
    pub fn reserve_batch(&self, n: usize) -> Option<Reservation<'_, T>> {
        let (target, start, count) = self.core.reserve_batch_mpsc(self.id, n)?;
        let slice = unsafe {
            std::slice::from_raw_parts_mut(self.core.slot_ptr_mpsc(self.id, start), count)
        };
        Some(Reservation::new(slice, target))
    }

    /// Sends a single item without blocking.
    pub fn try_send(&self, item: T) -> Result<(), T> {
        self.core.try_send_mpsc(self.id, item)
    }

    /// Sends a single item, blocking until there is room or the channel
    /// closes.
    pub fn send(&self, item: T) -> bool {
        self.core.send_mpsc(self.id, item)
    }

    /// Sends as many of `items` as fit without blocking.
    pub fn try_send_batch(&self, items: impl IntoIterator<Item = T>) -> usize {
        self.core
            .try_send_batch_mpsc(self.id, &mut items.into_iter())
    }

    /// Sends all of `items`, blocking between chunks as needed.
    pub fn send_batch(&self, items: impl IntoIterator<Item = T>) -> usize {
        let mut sent = 0;
        for item in items {
            if !self.core.send_mpsc(self.id, item) {
                break;
            }
            sent += 1;
        }
        sent
    }
}

impl<T> Drop for Producer<T> {
    fn drop(&mut self) {
        self.core.unregister_producer(self.id);
    }
}

unsafe impl<T: Send> Send for Producer<T> {}
unsafe impl<T: Send> Sync for Producer<T> {}
