//! A bounded, lock-free, in-process message channel with three topologies:
//! single-producer/single-consumer, multi-producer/single-consumer, and
//! single-producer/multi-consumer.
//!
//! Every topology shares the same ring mechanics: a power-of-two capacity
//! indexed with a bitmask, acquire/release-ordered head and tail counters,
//! 64-byte cache-line padding to keep producer-side and consumer-side
//! counters from false-sharing, and a spin-then-park blocking discipline
//! backed by an address-based futex wait. Mpsc additionally gives each
//! registered producer its own private ring, so producers never contend
//! with each other — only with the single fan-in consumer, which uses a
//! generation-cached scan to skip slots that provably haven't changed.
//!
//! # Example
//!
//! ```
//! use ringchannel::{Channel, Config, Mode};
//!
//! let channel = Channel::<u64>::new(Config::new(1024, Mode::Spsc, false).unwrap());
//!
//! channel.send(42);
//! assert_eq!(channel.try_receive(), Some(42));
//!
//! // Zero-copy reserve/commit for the hot path.
//! if let Some(mut reservation) = channel.reserve_batch(4) {
//!     for (i, slot) in reservation.as_mut_slice().iter_mut().enumerate() {
//!         slot.write(i as u64);
//!     }
//!     reservation.commit();
//! }
//! ```
//!
//! # Mpsc example
//!
//! ```
//! use ringchannel::{Channel, Config, Mode};
//!
//! let channel = Channel::<u64>::new(
//!     Config::new(1024, Mode::Mpsc { max_producers: 4 }, false).unwrap(),
//! );
//! let producer = channel.register_producer().unwrap();
//! producer.send(7);
//! assert_eq!(channel.try_receive(), Some(7));
//! ```

mod backoff;
mod channel;
mod config;
mod error;
mod invariants;
mod metrics;
mod park;
mod reservation;
mod ring;

pub use backoff::Backoff;
pub use channel::{Channel, Producer};
pub use config::{high_throughput_mpsc, low_latency_mpsc, Config, Mode};
pub use error::{ChannelError, CreationError};
pub use metrics::MetricsSnapshot;
pub use reservation::Reservation;
