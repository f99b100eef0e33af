// Differencing driver: streaming compare with lookahead search.
//
// The driver reads both inputs byte by byte. While they agree it
// accumulates an EQL run. On divergence it runs a lookahead search:
// the destination is scanned forward, hashing every position and
// looking the hashes up in the source index; hits feed the match
// table, which elects the nearest verified equal region. The region is
// then translated into DEL/BKT/INS skips plus a stretch of MOD bytes,
// and streaming resumes.

use std::io;

use tracing::debug;

use crate::config::{DiffOptions, ScanMode};
use crate::hash::{MatchTable, RollingHash, SourceIndex, Verdict, SAMPLE_SIZE};
use crate::input::{AheadReader, Fetch, Input, InputError, ReadMode};
use crate::patch::{BinarySink, Op, PatchSink};

// ---------------------------------------------------------------------------
// Errors and reports
// ---------------------------------------------------------------------------

/// Failures during a diff run.
#[derive(Debug)]
pub enum DiffError {
    /// One of the inputs failed.
    Input(InputError),
    /// The output sink failed.
    Output(io::Error),
}

impl std::fmt::Display for DiffError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input(e) => write!(f, "input error: {e}"),
            Self::Output(e) => write!(f, "output error: {e}"),
        }
    }
}

impl std::error::Error for DiffError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Input(e) => Some(e),
            Self::Output(e) => Some(e),
        }
    }
}

impl From<InputError> for DiffError {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

impl From<io::Error> for DiffError {
    fn from(e: io::Error) -> Self {
        Self::Output(e)
    }
}

/// Engine-side statistics of a completed run.
#[derive(Debug, Clone, Default)]
pub struct DiffReport {
    /// Final source position.
    pub pos_src: i64,
    /// Final destination position (= destination length).
    pub pos_dst: i64,
    /// Successful index lookups.
    pub index_hits: u64,
    /// Index hits disproved by byte compare.
    pub repairs: u64,
    /// Final reliability distance.
    pub reliability: i64,
    /// Index overload factor.
    pub overload: i64,
    /// Searches whose chosen region turned out not to be equal.
    pub inaccurate: u64,
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Incremental,
    FullPending,
    FullDone,
    Off,
}

struct SearchResult {
    skip_org: i64,
    skip_new: i64,
    ahead: i64,
    found: i32,
}

/// The differencing engine. Owns the index and the match table;
/// borrows the readers and the sink for the duration of [`run`].
///
/// [`run`]: Differ::run
pub struct Differ {
    opts: DiffOptions,
    index: SourceIndex,
    table: MatchTable,
    scan: ScanState,
    /// Source-side incremental hashing cursor and state.
    hash_org: RollingHash,
    ahd_org: i64,
    /// Destination-side lookahead hashing cursor and state.
    hash_new: RollingHash,
    ahd_new: i64,
    rlb: i64,
    inaccurate: u64,
}

impl Differ {
    pub fn new(opts: DiffOptions) -> Self {
        let opts = opts.normalized();
        let index = SourceIndex::new(opts.index_mb);
        let table = MatchTable::new(opts.match_max, opts.compare_all);
        let scan = match opts.scan {
            ScanMode::Full => ScanState::FullPending,
            ScanMode::Incremental => ScanState::Incremental,
            ScanMode::Off => ScanState::Off,
        };
        Self {
            opts,
            index,
            table,
            scan,
            hash_org: RollingHash::new(),
            ahd_org: 0,
            hash_new: RollingHash::new(),
            ahd_new: 0,
            rlb: SAMPLE_SIZE + SAMPLE_SIZE / 2,
            inaccurate: 0,
        }
    }

    /// Whether the main loop feeds the index as the source streams by.
    fn lazy_feed(&self) -> bool {
        matches!(self.scan, ScanState::Incremental | ScanState::Off)
    }

    /// Diff `src` against `dst`, emitting operators into `out`.
    pub fn run<S, D, O>(
        &mut self,
        src: &mut S,
        dst: &mut D,
        out: &mut O,
    ) -> Result<DiffReport, DiffError>
    where
        S: Input,
        D: Input,
        O: PatchSink,
    {
        let mut pos_org: i64 = 0;
        let mut pos_new: i64 = 0;
        let mut eql: i64 = 0;
        let mut counting = false;
        let mut found: i32 = 0;
        let mut ahead: i64 = 0;

        let mut c_org = src.get(pos_org, ReadMode::Read)?;
        let mut c_new = dst.get(pos_new, ReadMode::Read)?;

        while let Fetch::Byte(bn) = c_new {
            // Lazy index feed: hash the source byte just read if the
            // scan cursor is here.
            if self.lazy_feed() && pos_org == self.ahd_org {
                if let Fetch::Byte(bo) = c_org {
                    let h = self.hash_org.roll(bo);
                    self.index.add(h, self.ahd_org, self.hash_org.equal_tail());
                    self.ahd_org += 1;
                }
            }

            let bo_eq = match c_org {
                Fetch::Byte(bo) => bo == bn,
                _ => false,
            };

            if bo_eq {
                if !counting {
                    // Sink may hold the first equal bytes in reserve;
                    // switch to counting as soon as it says so.
                    counting = out.put(Op::Eql, 1, bn, bn, pos_org, pos_new)?;
                    ahead -= 1;
                    pos_org += 1;
                    c_org = src.get(pos_org, ReadMode::Read)?;
                    pos_new += 1;
                    c_new = dst.get(pos_new, ReadMode::Read)?;
                } else {
                    // Fast path: consume the whole agreeing stretch.
                    let mut cnt: i64 = 0;
                    loop {
                        match (c_org, c_new) {
                            (Fetch::Byte(a), Fetch::Byte(b)) if a == b => {
                                cnt += 1;
                                if self.lazy_feed() && pos_org == self.ahd_org {
                                    let h = self.hash_org.roll(a);
                                    self.index.add(
                                        h,
                                        self.ahd_org,
                                        self.hash_org.equal_tail(),
                                    );
                                    self.ahd_org += 1;
                                }
                                pos_org += 1;
                                c_org = src.get(pos_org, ReadMode::Read)?;
                                pos_new += 1;
                                c_new = dst.get(pos_new, ReadMode::Read)?;
                            }
                            _ => break,
                        }
                    }
                    eql += cnt;
                    ahead -= cnt;
                }
            } else if ahead > 0 {
                flush_eql(out, &mut eql, &mut counting, pos_org, pos_new)?;
                if c_org.is_byte() {
                    // Replace bytes until they agree or the budget ends.
                    loop {
                        match (c_org, c_new) {
                            (Fetch::Byte(o), Fetch::Byte(n)) if o != n && ahead > 0 => {
                                out.put(Op::Mod, 1, o, n, pos_org, pos_new)?;
                                ahead -= 1;
                                pos_org += 1;
                                c_org = src.get(pos_org, ReadMode::Read)?;
                                pos_new += 1;
                                c_new = dst.get(pos_new, ReadMode::Read)?;
                            }
                            _ => break,
                        }
                    }
                } else {
                    // Source exhausted: the rest of this stretch is
                    // insertion.
                    out.put(Op::Ins, 1, 0, bn, pos_org, pos_new)?;
                    ahead -= 1;
                    pos_new += 1;
                    c_new = dst.get(pos_new, ReadMode::Read)?;
                }
            } else if found == 1 && ahead == 0 {
                // The chosen region did not pan out. Skip half a
                // reliability range before searching again.
                found = 0;
                self.inaccurate += 1;
                ahead = self.index.reliability() / 2;
                debug!(pos_org, pos_new, "inaccurate solution");
            } else {
                flush_eql(out, &mut eql, &mut counting, pos_org, pos_new)?;
                let s = self.search(src, dst, pos_org, pos_new)?;
                debug!(
                    pos_org,
                    pos_new,
                    skip_org = s.skip_org,
                    skip_new = s.skip_new,
                    ahead = s.ahead,
                    found = s.found,
                    "search"
                );
                found = s.found;
                ahead = s.ahead;
                if s.skip_org > 0 {
                    out.put(Op::Del, s.skip_org as u64, 0, 0, pos_org, pos_new)?;
                    pos_org += s.skip_org;
                    c_org = src.get(pos_org, ReadMode::Read)?;
                } else if s.skip_org < 0 {
                    out.put(Op::Bkt, (-s.skip_org) as u64, 0, 0, pos_org, pos_new)?;
                    pos_org += s.skip_org;
                    c_org = src.get(pos_org, ReadMode::Read)?;
                }
                if s.skip_new > 0 {
                    let mut skip = s.skip_new;
                    while skip > 0 {
                        match c_new {
                            Fetch::Byte(b) => {
                                out.put(Op::Ins, 1, 0, b, pos_org, pos_new)?;
                                skip -= 1;
                                pos_new += 1;
                                c_new = dst.get(pos_new, ReadMode::Read)?;
                            }
                            _ => break,
                        }
                    }
                }
            }
        }

        flush_eql(out, &mut eql, &mut counting, pos_org, pos_new)?;

        // Account for the unconsumed source tail, so the patch records
        // the full source consumption.
        if pos_new > 0 {
            if let Some(len) = src.known_len() {
                let rest = len - pos_org;
                if rest > 0 {
                    out.put(Op::Del, rest as u64, 0, 0, pos_org, pos_new)?;
                    pos_org += rest;
                }
            }
        }

        out.put(Op::Esc, 0, 0, 0, pos_org, pos_new)?;

        Ok(DiffReport {
            pos_src: pos_org,
            pos_dst: pos_new,
            index_hits: self.index.hits(),
            repairs: self.table.repairs(),
            reliability: self.index.reliability(),
            overload: self.index.overload(),
            inaccurate: self.inaccurate,
        })
    }

    /// Lookahead search: returns the skips to the nearest equal region
    /// and the distance over which the inputs should then agree.
    fn search<S, D>(
        &mut self,
        src: &mut S,
        dst: &mut D,
        red_org: i64,
        red_new: i64,
    ) -> Result<SearchResult, DiffError>
    where
        S: Input,
        D: Input,
    {
        // Extend or build the index first.
        match self.scan {
            ScanState::FullPending => {
                self.full_index(src)?;
                self.scan = ScanState::FullDone;
            }
            ScanState::Incremental => {
                src.set_lookahead_base(red_org);
                let mut lim = if self.opts.backtrack {
                    self.opts.ahead_max
                } else if self.ahd_org < self.opts.ahead_max / 2 {
                    // Near the stream start the whole window fits.
                    self.opts.ahead_max - self.ahd_org
                } else {
                    // Keep the scan cursor centered on the read
                    // position.
                    self.opts.ahead_max / 2 - (self.ahd_org - red_org)
                };
                while lim > 0 {
                    match src.get(self.ahd_org, ReadMode::SoftAhead)? {
                        Fetch::Byte(b) => {
                            let h = self.hash_org.roll(b);
                            self.index.add(h, self.ahd_org, self.hash_org.equal_tail());
                            self.ahd_org += 1;
                        }
                        _ => break,
                    }
                    lim -= 1;
                }
            }
            ScanState::FullDone | ScanState::Off => {}
        }
        self.rlb = self.index.reliability();

        // Size the lookahead window. Searching past it makes no sense
        // in theory, but using the whole buffer is free; once enough
        // candidates exist the window shrinks back to the reliability
        // range.
        let mut max = if self.ahd_new > red_new {
            self.opts.ahead_max - (self.ahd_new - red_new)
        } else {
            self.opts.ahead_max
        };
        if max < self.rlb {
            max = self.rlb;
        }

        // Look back a little: it keeps the match table warm and often
        // saves a hash re-initialization.
        let mut back = red_new - self.ahd_new;
        if back < 0 {
            back = 0;
        } else if back > self.rlb + 2 * SAMPLE_SIZE - 1 {
            back = self.rlb + 2 * SAMPLE_SIZE - 1;
        }

        let base_org = if self.opts.backtrack { 0 } else { src.buf_pos() };

        let mut found: i32 = 0;
        match self
            .table
            .cleanup(src, dst, base_org, red_new, self.index.reliability())?
        {
            Verdict::Full => found = self.opts.match_max as i32,
            Verdict::Good | Verdict::Best => {
                if max > self.rlb * 2 {
                    max = self.rlb * 2;
                }
            }
            _ => {}
        }

        if found < self.opts.match_max as i32 {
            dst.set_lookahead_base(red_new);
            let mut mode = if found >= self.opts.match_min as i32 {
                ReadMode::SoftAhead
            } else {
                ReadMode::HardAhead
            };

            // Re-initialize the destination hash when the ahead cursor
            // was reset or fell too far behind.
            if self.ahd_new == 0 || self.ahd_new + back < red_new {
                self.ahd_new = dst.buf_pos();
                if red_new > self.ahd_new + back {
                    self.ahd_new = red_new - back;
                    if self.ahd_new < 0 {
                        self.ahd_new = 0;
                    }
                }
                let mut warm = RollingHash::warmup(self.ahd_new);
                self.ahd_new -= 1;
                self.hash_new.reset();
                let mut i: i64 = 0;
                while i < warm {
                    match dst.get(self.ahd_new + 1, mode)? {
                        Fetch::Byte(b) => {
                            self.ahd_new += 1;
                            self.hash_new.roll(b);
                            // The equal tail becomes trustworthy at the
                            // first run break; after that only a sample
                            // width is needed.
                            if i != self.hash_new.equal_tail() && warm > i + (SAMPLE_SIZE - 1) {
                                warm = i + (SAMPLE_SIZE - 1);
                            }
                        }
                        _ => break,
                    }
                    i += 1;
                }
            }

            // The look-back adds to the distance to cover.
            if self.ahd_new < red_new {
                max += red_new - self.ahd_new;
            }

            // Accumulate candidates.
            while max > 0 {
                let b = match dst.get(self.ahd_new + 1, mode)? {
                    Fetch::Byte(b) => {
                        self.ahd_new += 1;
                        b
                    }
                    _ => break,
                };
                let h = self.hash_new.roll(b);
                max -= 1;

                if let Some(org) = self.index.get(h) {
                    if org > base_org {
                        match self.table.add(src, dst, org, self.ahd_new, red_new)? {
                            Verdict::Full => break,
                            Verdict::Enlarged | Verdict::Invalid => {}
                            v => {
                                if matches!(v, Verdict::Good | Verdict::Best) && max > self.rlb {
                                    // A good candidate within the
                                    // reliability range is as good as
                                    // it gets.
                                    max = self.rlb;
                                }
                                found += 1;
                                if self.ahd_new > red_new {
                                    if found >= self.opts.match_min as i32 {
                                        mode = ReadMode::SoftAhead;
                                    }
                                    if found >= self.opts.match_max as i32 {
                                        break;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        // Translate the elected region into skips.
        match self.table.getbest(red_new) {
            None => {
                // Nothing found; force progress past this window.
                let ahead = (self.ahd_new - red_new).max(SAMPLE_SIZE);
                Ok(SearchResult {
                    skip_org: 0,
                    skip_new: 0,
                    ahead,
                    found: 0,
                })
            }
            Some((fnd_org, fnd_new)) => {
                let r = if fnd_org >= red_org {
                    if fnd_org - red_org >= fnd_new - red_new {
                        SearchResult {
                            skip_org: (fnd_org - red_org) - (fnd_new - red_new),
                            skip_new: 0,
                            ahead: fnd_new - red_new,
                            found: 1,
                        }
                    } else {
                        SearchResult {
                            skip_org: 0,
                            skip_new: (fnd_new - red_new) - (fnd_org - red_org),
                            ahead: fnd_org - red_org,
                            found: 1,
                        }
                    }
                } else {
                    let bkt = (red_org - fnd_org) + (fnd_new - red_new);
                    if bkt <= red_org - base_org {
                        SearchResult {
                            skip_org: -bkt,
                            skip_new: 0,
                            ahead: fnd_new - red_new,
                            found: 1,
                        }
                    } else {
                        // Clamp the backtrack at the window base.
                        let skip_new = bkt - (red_org - base_org);
                        SearchResult {
                            skip_org: base_org - red_org,
                            skip_new,
                            ahead: (fnd_new - red_new) - skip_new,
                            found: 1,
                        }
                    }
                };
                Ok(r)
            }
        }
    }

    /// Scan the whole source, building the index.
    fn full_index<S: Input>(&mut self, src: &mut S) -> Result<(), DiffError> {
        let mut hash = RollingHash::new();
        let mut pos: i64 = 0;
        let mut i: i64 = 0;
        // Warm up over the first sample.
        while i < SAMPLE_SIZE - 1 {
            match src.get(pos, ReadMode::HardAhead)? {
                Fetch::Byte(b) => {
                    hash.roll(b);
                    pos += 1;
                }
                _ => return Ok(()),
            }
            i += 1;
        }
        loop {
            match src.get(pos, ReadMode::HardAhead)? {
                Fetch::Byte(b) => {
                    let h = hash.roll(b);
                    self.index.add(h, pos, hash.equal_tail());
                    pos += 1;
                }
                _ => break,
            }
        }
        debug!(bytes = pos, slots = self.index.slots(), "source indexed");
        Ok(())
    }
}

fn flush_eql<O: PatchSink>(
    out: &mut O,
    eql: &mut i64,
    counting: &mut bool,
    pos_org: i64,
    pos_new: i64,
) -> io::Result<()> {
    if *eql > 0 {
        out.put(Op::Eql, *eql as u64, 0, 0, pos_org - *eql, pos_new - *eql)?;
        *eql = 0;
    }
    *counting = false;
    Ok(())
}

// ---------------------------------------------------------------------------
// Convenience entry point
// ---------------------------------------------------------------------------

/// Diff two in-memory buffers into a patch.
pub fn diff_bytes(source: &[u8], dest: &[u8], opts: &DiffOptions) -> Result<Vec<u8>, DiffError> {
    let opts = opts.clone().normalized();
    let mut src = AheadReader::new(
        io::Cursor::new(source),
        opts.buf_src,
        opts.block_size,
        opts.sequential_src,
    )?;
    let mut dst = AheadReader::new(
        io::Cursor::new(dest),
        opts.buf_dst,
        opts.block_size,
        opts.sequential_dst,
    )?;
    let mut sink = BinarySink::new(Vec::new());
    Differ::new(opts).run(&mut src, &mut dst, &mut sink)?;
    Ok(sink.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::apply_bytes;

    fn roundtrip(source: &[u8], dest: &[u8]) -> Vec<u8> {
        let patch = diff_bytes(source, dest, &DiffOptions::default()).expect("diff failed");
        let rebuilt = apply_bytes(source, &patch).expect("apply failed");
        assert_eq!(
            rebuilt,
            dest,
            "roundtrip mismatch (source={}, dest={}, patch={})",
            source.len(),
            dest.len(),
            patch.len()
        );
        patch
    }

    fn noise(len: usize, mut seed: u64) -> Vec<u8> {
        // Small xorshift; deterministic test data.
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            out.push((seed >> 24) as u8);
        }
        out
    }

    #[test]
    fn roundtrip_identical() {
        let data = noise(8192, 1);
        let patch = roundtrip(&data, &data);
        // One EQL record plus terminator.
        assert!(patch.len() <= 7, "patch too large: {}", patch.len());
    }

    #[test]
    fn roundtrip_small_edit() {
        let source = noise(16 * 1024, 2);
        let mut dest = source.clone();
        dest[8000] ^= 0xFF;
        let patch = roundtrip(&source, &dest);
        assert!(patch.len() < 256, "patch too large: {}", patch.len());
    }

    #[test]
    fn roundtrip_scattered_edits() {
        let source = noise(64 * 1024, 3);
        let mut dest = source.clone();
        for i in (0..dest.len()).step_by(4096) {
            dest[i] = dest[i].wrapping_add(1);
        }
        let patch = roundtrip(&source, &dest);
        assert!(patch.len() < dest.len() / 4);
    }

    #[test]
    fn roundtrip_insertion() {
        let source = noise(32 * 1024, 4);
        let mut dest = source[..10_000].to_vec();
        dest.extend_from_slice(b"INSERTED-CHUNK-OF-FRESH-DATA");
        dest.extend_from_slice(&source[10_000..]);
        let patch = roundtrip(&source, &dest);
        assert!(patch.len() < 2048, "patch too large: {}", patch.len());
    }

    #[test]
    fn roundtrip_deletion() {
        let source = noise(32 * 1024, 5);
        let mut dest = source[..10_000].to_vec();
        dest.extend_from_slice(&source[14_000..]);
        roundtrip(&source, &dest);
    }

    #[test]
    fn roundtrip_prefix_strip_leads_with_del() {
        let source = noise(32 * 1024, 6);
        let dest = source[4096..].to_vec();
        let patch = roundtrip(&source, &dest);
        // A stripped prefix reduces to one DEL and one EQL.
        assert!(patch.len() < 64, "patch too large: {}", patch.len());
    }

    #[test]
    fn roundtrip_empty_source_is_all_insert() {
        let dest = noise(4096, 7);
        let patch = roundtrip(b"", &dest);
        // INS data dominates; overhead is a handful of bytes.
        assert!(patch.len() >= dest.len());
        assert!(patch.len() < dest.len() + 64);
    }

    #[test]
    fn roundtrip_empty_dest_has_no_data_ops() {
        let source = noise(4096, 8);
        let patch = diff_bytes(&source, b"", &DiffOptions::default()).unwrap();
        assert_eq!(patch, [crate::patch::ESC, 0x00]);
        assert_eq!(apply_bytes(&source, &patch).unwrap(), b"");
    }

    #[test]
    fn roundtrip_both_empty() {
        roundtrip(b"", b"");
    }

    #[test]
    fn roundtrip_unrelated_inputs() {
        let source = noise(8192, 9);
        let dest = noise(8192, 10);
        roundtrip(&source, &dest);
    }

    #[test]
    fn roundtrip_block_move_uses_backtrack() {
        // Swap two halves: reaching the first half again needs BKT.
        let a = noise(20 * 1024, 11);
        let b = noise(20 * 1024, 12);
        let source: Vec<u8> = [a.clone(), b.clone()].concat();
        let dest: Vec<u8> = [b, a].concat();
        let patch = roundtrip(&source, &dest);
        assert!(patch.len() < source.len() / 8, "patch: {}", patch.len());
    }

    #[test]
    fn roundtrip_incremental_scan() {
        let source = noise(64 * 1024, 13);
        let mut dest = source.clone();
        dest.truncate(60_000);
        dest[30_000] ^= 1;
        let opts = DiffOptions {
            scan: ScanMode::Incremental,
            ..Default::default()
        };
        let patch = diff_bytes(&source, &dest, &opts).unwrap();
        assert_eq!(apply_bytes(&source, &patch).unwrap(), dest);
    }

    #[test]
    fn roundtrip_without_backtrack() {
        let a = noise(16 * 1024, 14);
        let b = noise(16 * 1024, 15);
        let source: Vec<u8> = [a.clone(), b.clone()].concat();
        let dest: Vec<u8> = [b, a].concat();
        let opts = DiffOptions {
            backtrack: false,
            ..Default::default()
        };
        let patch = diff_bytes(&source, &dest, &opts).unwrap();
        assert_eq!(apply_bytes(&source, &patch).unwrap(), dest);
    }

    #[test]
    fn roundtrip_soft_compares_only() {
        let source = noise(64 * 1024, 16);
        let mut dest = source.clone();
        dest[1000] ^= 3;
        dest[50_000] ^= 5;
        let opts = DiffOptions::default().lazy();
        let patch = diff_bytes(&source, &dest, &opts).unwrap();
        assert_eq!(apply_bytes(&source, &patch).unwrap(), dest);
    }

    #[test]
    fn roundtrip_runs_of_equal_bytes() {
        // Long runs exercise the gliding-match machinery.
        let mut source = vec![0u8; 30_000];
        source.extend_from_slice(&noise(1000, 17));
        let mut dest = vec![0u8; 29_000];
        dest.extend_from_slice(&source[30_000..]);
        roundtrip(&source, &dest);
    }

    #[test]
    fn report_counts_make_sense() {
        let source = noise(32 * 1024, 18);
        let mut dest = source.clone();
        dest[16_000] ^= 0xAA;
        let opts = DiffOptions::default().normalized();
        let mut src = AheadReader::new(
            io::Cursor::new(&source[..]),
            opts.buf_src,
            opts.block_size,
            false,
        )
        .unwrap();
        let mut dst = AheadReader::new(
            io::Cursor::new(&dest[..]),
            opts.buf_dst,
            opts.block_size,
            false,
        )
        .unwrap();
        let mut sink = BinarySink::new(Vec::new());
        let report = Differ::new(opts).run(&mut src, &mut dst, &mut sink).unwrap();
        assert_eq!(report.pos_dst, dest.len() as i64);
        assert_eq!(report.pos_src, source.len() as i64);
        assert!(report.index_hits > 0);
        assert!(report.reliability >= SAMPLE_SIZE);
        assert!(sink.differences());
    }
}
