use crate::ring::CommitTarget;
use std::mem::MaybeUninit;

/// A zero-copy handle on a contiguous run of uninitialized slots, obtained
/// from [`crate::Channel::reserve_batch`] or
/// [`crate::Producer::reserve_batch`].
///
/// Write into [`Reservation::as_mut_slice`], then call [`Reservation::commit`]
/// (or [`Reservation::commit_n`] to publish fewer than were reserved).
/// Committing fewer than `len()` — including committing 0, or simply
/// dropping the reservation without committing at all — abandons the
/// remainder: the tail never advances past the committed slots, and the
/// producer's own claim cursor rewinds to match, so the unused slots are
/// available to the next reservation rather than stranded (spec.md §4.4.3
/// "Abandoning a reservation... returns the slots to the pool implicitly").
///
/// A reservation never straddles the ring's wrap point, so `len()` may be
/// smaller than what was asked for even when the ring has more free space
/// overall — call `reserve_batch` again afterwards to pick up the rest.
pub struct Reservation<'a, T> {
    slice: &'a mut [MaybeUninit<T>],
    target: CommitTarget<'a, T>,
    len: usize,
    committed: bool,
}

impl<'a, T> Reservation<'a, T> {
    pub(crate) fn new(slice: &'a mut [MaybeUninit<T>], target: CommitTarget<'a, T>) -> Self {
        let len = slice.len();
        Self {
            slice,
            target,
            len,
            committed: false,
        }
    }

    /// Returns a mutable slice for writing data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [MaybeUninit<T>] {
        self.slice
    }

    /// Returns the number of reserved slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the reservation is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Commits every reserved slot, making the data visible to the consumer.
    ///
    /// # Safety (caller obligation)
    ///
    /// Every slot in `as_mut_slice()` must have been initialized before this
    /// is called; uninitialized slots committed this way are read by the
    /// consumer as though they held a valid `T`.
    pub fn commit(mut self) {
        let len = self.len;
        self.commit_n_inner(len);
    }

    /// Commits only the first `n` initialized slots (`n <= len()`); the rest
    /// of the reservation is abandoned.
    ///
    /// # Panics
    ///
    /// Panics if `n` is greater than the number of reserved slots.
    pub fn commit_n(mut self, n: usize) {
        self.commit_n_inner(n);
    }

    fn commit_n_inner(&mut self, n: usize) {
        assert!(n <= self.len, "cannot commit more than reserved");
        self.target.commit(n, self.len);
        self.committed = true;
    }
}

impl<'a, T> Drop for Reservation<'a, T> {
    fn drop(&mut self) {
        if !self.committed {
            self.target.commit(0, self.len);
        }
    }
}
