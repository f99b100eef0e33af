// Lossy sample index: source positions keyed by sample hash.
//
// One slot per hash residue, no probing, last writer wins under the
// collision policy below. The table is a Bloom-like sample of the
// source, not a dictionary: misses are expected and the match table
// compensates by verifying candidates with byte compares.
//
// Collision / overload policy: the goal is a roughly uniform spatial
// distribution of retained positions as the indexed region outgrows the
// table. Every add decrements a countdown; a store only happens when it
// reaches zero, after which it is reset to `col_max`. Each time the
// number of adds wraps the table size, `col_max` grows (stores become
// rarer) and the reliability distance grows with it. High-quality
// samples (short equal tails) drain the countdown four times faster
// than low-quality ones.

use tracing::debug;

use super::{HashKey, SAMPLE_SIZE};
use crate::config::lower_prime;

const COLLISION_THRESHOLD: i64 = 4;
const COLLISION_HIGH: i64 = 4;
const COLLISION_LOW: i64 = 1;

/// Offset added to stored positions so that 0 means an empty slot and
/// source position 0 stays indexable.
const POS_OFFSET: i64 = 1;

/// Prime-sized table of `(hash, position)` samples over the source.
pub struct SourceIndex {
    positions: Vec<i64>,
    hashes: Vec<HashKey>,
    prime: usize,
    col_max: i64,
    col_cnt: i64,
    reliability: i64,
    load_cnt: i64,
    hits: u64,
}

impl SourceIndex {
    /// Build an index with at most `budget_mb` MiB of slots. The slot
    /// count is the largest prime below the element budget, e.g. an
    /// 8192-element budget yields 8191 slots.
    pub fn new(budget_mb: usize) -> Self {
        let entry = std::mem::size_of::<HashKey>() + std::mem::size_of::<i64>();
        let budget = budget_mb.max(1) * 1024 * 1024 / entry;
        let prime = lower_prime(budget);
        debug!(slots = prime, bytes = prime * entry, "index allocated");
        Self {
            positions: vec![0; prime],
            hashes: vec![0; prime],
            prime,
            col_max: COLLISION_THRESHOLD,
            col_cnt: COLLISION_THRESHOLD,
            reliability: SAMPLE_SIZE + SAMPLE_SIZE / 2,
            load_cnt: prime as i64,
            hits: 0,
        }
    }

    /// Offer a `(hash, position)` sample with quality `eq` (the current
    /// equal-tail length). The collision policy decides whether it is
    /// stored.
    pub fn add(&mut self, hash: HashKey, pos: i64, eq: i64) {
        // Each wrap of the load counter means the table has seen
        // another full table-size worth of adds: store less, verify
        // more.
        if self.load_cnt > 0 {
            self.load_cnt -= 1;
        } else {
            self.load_cnt = self.prime as i64;
            self.col_max += COLLISION_THRESHOLD;
            self.reliability += 4;
        }

        self.col_cnt -= if eq <= 2 * SAMPLE_SIZE {
            COLLISION_HIGH
        } else {
            COLLISION_LOW
        };

        if self.col_cnt <= 0 {
            let idx = (hash % self.prime as HashKey) as usize;
            self.hashes[idx] = hash;
            self.positions[idx] = pos + POS_OFFSET;
            self.col_cnt = self.col_max;
        }
    }

    /// Look up a sample hash. Requires an exact match on the full hash
    /// word; returns the stored source position.
    #[inline]
    pub fn get(&mut self, hash: HashKey) -> Option<i64> {
        let idx = (hash % self.prime as HashKey) as usize;
        if self.positions[idx] != 0 && self.hashes[idx] == hash {
            self.hits += 1;
            Some(self.positions[idx] - POS_OFFSET)
        } else {
            None
        }
    }

    /// Consider the table empty again. Contents are not touched; stale
    /// entries will simply be overwritten as new samples arrive.
    pub fn reset(&mut self) {
        self.load_cnt = self.prime as i64;
        self.col_max = COLLISION_THRESHOLD;
        self.col_cnt = COLLISION_THRESHOLD;
        self.reliability = SAMPLE_SIZE + SAMPLE_SIZE / 2;
    }

    /// Reliability distance: an estimate of how many bytes a search
    /// must examine before it can be confident any equal region would
    /// have been indexed. Grows with table overload, never shrinks.
    #[inline]
    pub fn reliability(&self) -> i64 {
        self.reliability
    }

    /// Slot count (prime).
    pub fn slots(&self) -> usize {
        self.prime
    }

    /// Collision-override threshold; `col_max / 4 - 1` is the overload
    /// factor.
    pub fn overload(&self) -> i64 {
        self.col_max / COLLISION_THRESHOLD - 1
    }

    /// Number of successful lookups so far.
    pub fn hits(&self) -> u64 {
        self.hits
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_index() -> SourceIndex {
        // 1 MiB budget is the constructor floor; small enough for tests.
        SourceIndex::new(1)
    }

    #[test]
    fn add_then_get() {
        let mut t = tiny_index();
        t.add(0x1234_5678 as HashKey, 100, 0);
        assert_eq!(t.get(0x1234_5678 as HashKey), Some(100));
        assert_eq!(t.get(0x1234_0000 as HashKey), None);
    }

    #[test]
    fn position_zero_is_indexable() {
        let mut t = tiny_index();
        t.add(42 as HashKey, 0, 0);
        assert_eq!(t.get(42 as HashKey), Some(0));
    }

    #[test]
    fn hash_zero_on_empty_slot_misses() {
        let mut t = tiny_index();
        assert_eq!(t.get(0), None);
        t.add(0, 7, 0);
        assert_eq!(t.get(0), Some(7));
    }

    #[test]
    fn residue_collision_requires_full_hash_match() {
        let mut t = tiny_index();
        let p = t.slots() as HashKey;
        t.add(5, 50, 0);
        // Same slot, different hash word: must miss.
        assert_eq!(t.get(5 + p), None);
    }

    #[test]
    fn overload_grows_monotonically() {
        let mut t = tiny_index();
        let slots = t.slots() as i64;
        let mut last_rlb = t.reliability();
        let mut last_col = t.col_max;
        // The load counter wraps every slots + 1 adds.
        for i in 0..(slots + 1) * 3 {
            t.add(i as HashKey, i + 1, 0);
            assert!(t.reliability() >= last_rlb);
            assert!(t.col_max >= last_col);
            last_rlb = t.reliability();
            last_col = t.col_max;
        }
        // Three wraps: both must have grown by 4 each wrap.
        assert_eq!(t.reliability(), SAMPLE_SIZE + SAMPLE_SIZE / 2 + 12);
        assert_eq!(t.overload(), 3);
    }

    #[test]
    fn low_quality_samples_store_less_often() {
        // With eq > 2 * SAMPLE_SIZE the countdown drains at 1/4 speed,
        // so the first low-quality adds never reach a store.
        let mut t = tiny_index();
        t.add(9, 33, 2 * SAMPLE_SIZE + 1);
        assert_eq!(t.get(9), None);
        t.add(9, 33, 0);
        assert_eq!(t.get(9), Some(33));
    }

    #[test]
    fn reset_restores_counters() {
        let mut t = tiny_index();
        let slots = t.slots() as i64;
        for i in 0..slots + 1 {
            t.add(i as HashKey, i + 1, 0);
        }
        assert!(t.reliability() > SAMPLE_SIZE + SAMPLE_SIZE / 2);
        t.reset();
        assert_eq!(t.reliability(), SAMPLE_SIZE + SAMPLE_SIZE / 2);
        assert_eq!(t.overload(), 0);
    }
}
