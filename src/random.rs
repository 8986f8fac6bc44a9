use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use rand::{distributions::Alphanumeric, rngs::StdRng, Rng, SeedableRng};

// Spreads consecutive counter values across the seed space.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Process-wide source of per-request generators.
///
/// Seeded once at startup; each call to [`SeedSource::next_rng`] derives a
/// fresh generator from the base seed and an atomic counter, so concurrent
/// requests never contend on a shared generator.
#[derive(Debug)]
pub struct SeedSource {
    base: u64,
    counter: AtomicU64,
}

impl SeedSource {
    pub fn new(base: u64) -> Self {
        Self {
            base,
            counter: AtomicU64::new(0),
        }
    }

    /// Seeds from the current wall clock in nanoseconds.
    pub fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();
        Self::new(nanos)
    }

    pub fn next_rng(&self) -> StdRng {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        StdRng::seed_from_u64(self.base ^ n.wrapping_mul(SEED_STRIDE))
    }
}

/// `n` bytes drawn uniformly from `[A-Za-z0-9]`.
pub fn alphanumeric<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Bytes {
    let mut buf = Vec::with_capacity(n);
    buf.extend(rng.sample_iter(&Alphanumeric).take(n));
    Bytes::from(buf)
}
