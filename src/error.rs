use thiserror::Error;

/// Errors surfaced synchronously at channel creation (spec.md §7
/// "Configuration errors").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CreationError {
    /// The requested capacity was 0, or rounding it up to a power of two
    /// would overflow.
    #[error("invalid capacity: {requested}")]
    InvalidCapacity {
        /// The capacity the caller asked for.
        requested: usize,
    },
    /// `Mode::Mpsc` was given with `max_producers == 0`.
    #[error("MPSC channels require max_producers > 0")]
    MpscRequiresMaxProducers,
    /// The backing allocation failed.
    #[error("allocation failed")]
    AllocationFailed,
}

/// Errors surfaced by runtime channel operations (spec.md §7 "Mode errors",
/// "Capacity errors at runtime").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// `register_producer` was called on a non-MPSC channel.
    #[error("register_producer is only valid on an MPSC channel")]
    NotMpsc,
    /// All `max_producers` slots are already occupied by live producers.
    #[error("too many producers registered (max: {max})")]
    TooManyProducers {
        /// The channel's configured producer limit.
        max: usize,
    },
    /// The channel has been closed.
    #[error("channel is closed")]
    Closed,
}
