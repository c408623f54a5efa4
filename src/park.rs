//! Address-based park/wake primitive.
//!
//! This is the external collaborator named in spec.md §1(b): "a park/wake
//! primitive keyed on a 32-bit memory word (address-based wait that wakes
//! when the word differs from an expected value)". On Linux it is backed by
//! the `futex` syscall directly (the same technique as the pack's MPMC
//! futex helper); elsewhere there is no portable address-wait syscall, so a
//! waiting thread falls back to yielding and re-checking the word itself —
//! correctness never depends on a prompt wake, only on the word eventually
//! differing, so this degrades to a spin-yield loop rather than a true park.

use std::sync::atomic::AtomicU32;

/// Parks the calling thread on `word`, as long as `word` still holds
/// `expected`. Returns as soon as a concurrent [`wake_all`] runs, or
/// (permitted by the address-wait contract) spuriously.
#[cfg(target_os = "linux")]
pub fn wait(word: &AtomicU32, expected: u32) {
    use std::sync::atomic::Ordering;

    if word.load(Ordering::Acquire) != expected {
        return;
    }
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word as *const AtomicU32 as *const u32,
            libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
            expected,
            std::ptr::null::<libc::timespec>(),
            std::ptr::null::<u32>(),
            0u32,
        );
    }
}

/// Wakes every thread parked on `word`.
#[cfg(target_os = "linux")]
pub fn wake_all(word: &AtomicU32) {
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word as *const AtomicU32 as *const u32,
            libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
            i32::MAX,
            std::ptr::null::<libc::timespec>(),
            std::ptr::null::<u32>(),
            0u32,
        );
    }
}

#[cfg(not(target_os = "linux"))]
pub fn wait(word: &AtomicU32, expected: u32) {
    use std::sync::atomic::Ordering;

    if word.load(Ordering::Acquire) == expected {
        std::thread::yield_now();
    }
}

#[cfg(not(target_os = "linux"))]
pub fn wake_all(_word: &AtomicU32) {}
