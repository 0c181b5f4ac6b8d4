//! Fast thread-local random numbers.
//!
//! Victim selection and dispatch placement only need statistical spread,
//! not cryptographic quality, so a bare xorshift32 is enough. Each thread
//! seeds its generator lazily from the OS entropy pool.

use std::cell::Cell;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};

/// Marsaglia's 32-bit xorshift generator.
#[derive(Clone, Copy)]
pub(crate) struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    /// A zero state is a fixed point of the shift sequence, so it is
    /// replaced with 1.
    pub(crate) fn new(seed: u32) -> Self {
        XorShift32 {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    pub(crate) fn next(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

thread_local! {
    static THREAD_RNG: Cell<XorShift32> = Cell::new(XorShift32::new(os_seed()));
}

/// One-shot OS entropy draw; `RandomState` pulls from the system source
/// once per instance.
fn os_seed() -> u32 {
    RandomState::new().build_hasher().finish() as u32
}

/// Returns the next value from the calling thread's generator.
pub(crate) fn fast_random() -> u32 {
    THREAD_RNG.with(|cell| {
        let mut rng = cell.get();
        let value = rng.next();
        cell.set(rng);
        value
    })
}
