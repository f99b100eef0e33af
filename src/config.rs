// Engine configuration and table sizing helpers.
//
// Defaults follow the behavior of classic insert/delete differencers on
// rotating and solid-state storage: 32 MiB index, 1 MiB stream buffers,
// 32 KiB read blocks, full source prescan.

// ---------------------------------------------------------------------------
// Scan mode
// ---------------------------------------------------------------------------

/// How the source index is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Index the whole source on the first search (default).
    Full,
    /// Feed the index lazily while streaming, extending it ahead of the
    /// read position during searches.
    Incremental,
    /// Feed the index only from the main streaming loop; searches never
    /// extend it beyond data already buffered.
    Off,
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Tuning parameters for a diff run.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Source index budget in MiB (lowered to a prime slot count).
    pub index_mb: usize,
    /// Maximum number of candidate matches per search; also sizes the
    /// match table.
    pub match_max: usize,
    /// Minimum number of candidates before searches turn soft (stop
    /// forcing reads past the buffered window).
    pub match_min: usize,
    /// Lookahead window in bytes. 0 = derive from the destination
    /// buffer size.
    pub ahead_max: i64,
    /// Source read-ahead buffer in bytes.
    pub buf_src: usize,
    /// Destination read-ahead buffer in bytes.
    pub buf_dst: usize,
    /// Read block size in bytes.
    pub block_size: usize,
    /// Allow backward skips on the source (BKT operators).
    pub backtrack: bool,
    /// Verify every candidate by compare, reading past the buffered
    /// window when necessary.
    pub compare_all: bool,
    /// Source index population strategy.
    pub scan: ScanMode,
    /// Treat the source as a sequential (non-seekable) stream.
    pub sequential_src: bool,
    /// Treat the destination as a sequential stream.
    pub sequential_dst: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            index_mb: 32,
            match_max: 128,
            match_min: 2,
            ahead_max: 0,
            buf_src: 1 << 20,
            buf_dst: 1 << 20,
            block_size: 32 * 1024,
            backtrack: true,
            compare_all: true,
            scan: ScanMode::Full,
            sequential_src: false,
            sequential_dst: false,
        }
    }
}

impl DiffOptions {
    /// Spend more memory for better matches: larger index, larger
    /// buffers, more candidates per search.
    pub fn better(mut self) -> Self {
        self.index_mb *= 4;
        self.match_min *= 2;
        self.match_max *= 4;
        self.buf_src *= 4;
        self.buf_dst *= 4;
        self
    }

    /// Stay within the buffers: no out-of-buffer compares.
    pub fn lazy(mut self) -> Self {
        self.compare_all = false;
        self
    }

    /// Lazier still: no full prescan, fewer candidates, half the index.
    pub fn lazier(mut self) -> Self {
        self.compare_all = false;
        self.scan = ScanMode::Incremental;
        self.match_min /= 2;
        self.match_max = (self.match_max / 2).max(1);
        self.index_mb = (self.index_mb / 2).max(1);
        self
    }

    /// Apply floors, alignments and the sequential-stream downgrades.
    /// Called once before a run.
    pub fn normalized(mut self) -> Self {
        if self.block_size < 4096 {
            self.block_size = 4096;
        }
        self.buf_src = align_buffer(self.buf_src, self.block_size);
        self.buf_dst = align_buffer(self.buf_dst, self.block_size);
        if self.ahead_max <= 0 {
            self.ahead_max = (self.buf_dst - self.block_size) as i64;
        }
        if self.ahead_max < 4096 {
            self.ahead_max = 4096;
        }
        if self.match_min >= self.match_max {
            self.match_min = self.match_max.saturating_sub(1);
        }
        // A sequential source cannot be prescanned or backtracked over,
        // and out-of-buffer compares would force backward seeks.
        if self.sequential_src {
            self.scan = ScanMode::Incremental;
            self.backtrack = false;
            self.compare_all = false;
        }
        if self.sequential_dst {
            self.match_min = 0;
        }
        self
    }
}

fn align_buffer(buf: usize, blk: usize) -> usize {
    let aligned = buf - buf % blk;
    if aligned == 0 {
        blk
    } else {
        aligned
    }
}

// ---------------------------------------------------------------------------
// Prime table sizing
// ---------------------------------------------------------------------------

/// Largest prime below the highest power of two not exceeding `n`,
/// e.g. `lower_prime(8192) == 8191`.
pub(crate) fn lower_prime(n: usize) -> usize {
    // One prime just below each power of two up to 2^31.
    const PRIMES: &[usize] = &[
        2,
        3,
        7,
        13,
        31,
        61,
        127,
        251,
        509,
        1021,
        2039,
        4093,
        8191,
        16381,
        32749,
        65521,
        131071,
        262139,
        524287,
        1048573,
        2097143,
        4194301,
        8388593,
        16777213,
        33554393,
        67108859,
        134217689,
        268435399,
        536870909,
        1073741789,
        2147483647,
    ];
    let mut best = PRIMES[0];
    for &p in PRIMES {
        if p <= n {
            best = p;
        } else {
            break;
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_prime_powers_of_two() {
        assert_eq!(lower_prime(8192), 8191);
        assert_eq!(lower_prime(8191), 4093);
        assert_eq!(lower_prime(1024), 1021);
        assert_eq!(lower_prime(26), 13);
        assert_eq!(lower_prime(1), 2); // floor of the table
    }

    #[test]
    fn normalized_applies_floors() {
        let opts = DiffOptions {
            block_size: 1,
            buf_src: 5000,
            buf_dst: 5000,
            ahead_max: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(opts.block_size, 4096);
        assert_eq!(opts.buf_src % opts.block_size, 0);
        assert!(opts.ahead_max >= 4096);
    }

    #[test]
    fn normalized_sequential_source_downgrades() {
        let opts = DiffOptions {
            sequential_src: true,
            ..Default::default()
        }
        .normalized();
        assert_eq!(opts.scan, ScanMode::Incremental);
        assert!(!opts.backtrack);
        assert!(!opts.compare_all);
    }

    #[test]
    fn match_min_stays_below_match_max() {
        let opts = DiffOptions {
            match_min: 500,
            match_max: 16,
            ..Default::default()
        }
        .normalized();
        assert!(opts.match_min < opts.match_max);
    }
}
