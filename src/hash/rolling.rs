// Incremental sample hash.
//
// The hash of the sample ending at the current byte is
//
//   h = ((a[0] + e[0]) * 2^(n-1) + ... + (a[n-1] + e[n-1])) mod 2^n
//
// with n = SAMPLE_SIZE, maintained one byte at a time as
// h' = (h << 1) + c + e. The equal-tail counter e counts the run of
// identical bytes ending at the current position (clamped to n).
// Without the +e term a run of one repeated byte collapses to a fixed
// hash after n bytes; with it, positions inside a run stay
// distinguishable for up to 2n bytes.

use super::{HashKey, SAMPLE_SIZE};

/// Rolling hash state: running hash, previous byte, equal-tail length.
#[derive(Debug, Clone)]
pub struct RollingHash {
    hash: HashKey,
    prev: Option<u8>,
    eql: i64,
}

impl Default for RollingHash {
    fn default() -> Self {
        Self::new()
    }
}

impl RollingHash {
    pub fn new() -> Self {
        Self {
            hash: 0,
            prev: None,
            eql: 0,
        }
    }

    /// Forget all state, as if no byte had been seen.
    pub fn reset(&mut self) {
        self.hash = 0;
        self.prev = None;
        self.eql = 0;
    }

    /// Absorb one byte and return the updated hash.
    #[inline]
    pub fn roll(&mut self, c: u8) -> HashKey {
        if self.prev == Some(c) {
            if self.eql < SAMPLE_SIZE {
                self.eql += 1;
            }
        } else {
            self.prev = Some(c);
            if self.eql != 0 {
                self.eql = 0;
            }
        }
        self.hash = self
            .hash
            .wrapping_shl(1)
            .wrapping_add(c as HashKey)
            .wrapping_add(self.eql as HashKey);
        self.hash
    }

    /// The current hash word.
    #[inline]
    pub fn value(&self) -> HashKey {
        self.hash
    }

    /// Length of the run of identical bytes ending at the current
    /// position, clamped to `SAMPLE_SIZE`. Doubles as a sample-quality
    /// measure: long tails make weak index samples.
    #[inline]
    pub fn equal_tail(&self) -> i64 {
        self.eql
    }

    /// Replay length needed to initialize the hash at position `q`.
    /// At the start of a stream `SAMPLE_SIZE - 1` bytes suffice; within
    /// a stream the equal-tail counter must stabilize first, which in
    /// the worst case takes another `SAMPLE_SIZE` bytes. Callers may
    /// shorten the replay once `equal_tail` diverges from the replay
    /// index (the first run break), after which `SAMPLE_SIZE - 1` more
    /// bytes are enough.
    pub fn warmup(q: i64) -> i64 {
        if q == 0 {
            SAMPLE_SIZE - 1
        } else {
            2 * SAMPLE_SIZE - 1
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
